use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use log::info;

use gridlight::{
    init_logging, CpuRenderer, DepthConvention, Framebuffer, LoggingConfig, Scene,
    SharedTextures, SpecularModel, CLEAR_COLOR,
};

fn main() {
    init_logging(LoggingConfig::default());
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let mut scene = Scene::load(&options.path)?;

    println!(
        "Loaded scene with {} objects ({} point lights)",
        scene.objects.len(),
        scene.active_point_lights()
    );
    for object in &scene.objects {
        println!(
            " - {} ({})",
            object.name,
            object.mesh.as_deref().unwrap_or("cube")
        );
    }

    if options.summary_only {
        return Ok(());
    }

    let specular_model = if options.phong {
        SpecularModel::Phong
    } else {
        SpecularModel::BlinnPhong
    };
    let convention = DepthConvention::OPENGL;
    let renderer = CpuRenderer::new(convention, specular_model, SharedTextures::default());

    let loaded = scene
        .load_textures(renderer.textures())
        .context("failed to load textures")?;
    info!("loaded {loaded} texture(s)");

    let (width, height) = scene.viewport;
    let mut target = Framebuffer::new(width, height)?;
    target.clear(CLEAR_COLOR, 1.0);

    let rig = scene.frame_rig();
    let meshes = scene.load_meshes();
    for (object, mesh) in scene.objects.iter().zip(&meshes) {
        let transforms = scene.object_transforms(object, convention);
        let eye = scene.camera.position;
        let drawn = if object.wireframe {
            renderer.draw_wireframe(&mut target, mesh, &transforms, &object.material, &rig, eye)
        } else {
            renderer.draw_mesh(&mut target, mesh, &transforms, &object.material, &rig, eye)
        };
        drawn.with_context(|| format!("failed to draw {}", object.name))?;
    }

    if scene.grid.enabled && !options.no_grid {
        renderer
            .draw_grid(
                &mut target,
                &scene.camera_transforms(convention),
                &scene.grid.params,
            )
            .context("failed to draw grid")?;
    }

    let output = options
        .output
        .unwrap_or_else(|| options.path.with_extension("png"));
    target.save_png(&output)?;
    println!("Wrote {}", output.display());
    Ok(())
}

struct CliOptions {
    path: PathBuf,
    output: Option<PathBuf>,
    summary_only: bool,
    phong: bool,
    no_grid: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(
                "Usage: gridlight <scene.xml> [--output <image.png>] [--summary-only] [--phong] [--no-grid]"
            ));
        };
        let mut options = Self {
            path: PathBuf::from(path),
            output: None,
            summary_only: false,
            phong: false,
            no_grid: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--output" | "-o" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--output expects a file path"))?;
                    options.output = Some(PathBuf::from(value));
                }
                "--summary-only" => options.summary_only = true,
                "--phong" => options.phong = true,
                "--no-grid" => options.no_grid = true,
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --output, --summary-only, --phong or --no-grid"
                    ));
                }
            }
        }
        Ok(options)
    }
}
