use glam::{Vec2, Vec3, Vec4};
use log::{debug, warn};

use crate::depth::DepthConvention;
use crate::error::ShadingError;
use crate::grid::{grid_vertex, shade_grid, GridCamera, GridVaryings, GroundHit, GRID_QUAD};
use crate::lighting::{LightingAccumulator, SpecularModel};
use crate::obj::Mesh;
use crate::params::{GridParams, LightRig, Material, Transforms};
use crate::render::raster::{
    coarse_fwidth, ClipVertex, DrawStats, Fragment, FragmentStage, Interpolate, PolygonMode,
    Rasterizer,
};
use crate::render::Framebuffer;
use crate::texture::{SharedTextures, TextureTable};
use crate::vertex::{transform_vertex, SurfaceVaryings};

impl Interpolate for SurfaceVaryings {
    fn mix(a: &Self, b: &Self, c: &Self, weights: Vec3) -> Self {
        Self {
            world_position: <Vec3 as Interpolate>::mix(&a.world_position, &b.world_position, &c.world_position, weights),
            normal: <Vec3 as Interpolate>::mix(&a.normal, &b.normal, &c.normal, weights),
            tex_coords: <Vec2 as Interpolate>::mix(&a.tex_coords, &b.tex_coords, &c.tex_coords, weights),
            tbn: a.tbn * weights.x + b.tbn * weights.y + c.tbn * weights.z,
        }
    }
}

impl Interpolate for GridVaryings {
    fn mix(a: &Self, b: &Self, c: &Self, weights: Vec3) -> Self {
        Self {
            near_point: <Vec3 as Interpolate>::mix(&a.near_point, &b.near_point, &c.near_point, weights),
            far_point: <Vec3 as Interpolate>::mix(&a.far_point, &b.far_point, &c.far_point, weights),
        }
    }
}

/// Lighting accumulator bound to one draw's parameters.
pub struct LightingStage<'a> {
    pub accumulator: LightingAccumulator,
    pub material: &'a Material,
    pub rig: &'a LightRig,
    pub view_position: Vec3,
    pub textures: &'a TextureTable,
}

impl FragmentStage for LightingStage<'_> {
    type Varyings = SurfaceVaryings;

    fn shade_quad(&self, lanes: &[SurfaceVaryings; 4]) -> [Fragment; 4] {
        lanes.map(|varyings| {
            Fragment::color(self.accumulator.shade(
                &varyings,
                self.material,
                self.rig,
                self.view_position,
                self.textures,
            ))
        })
    }
}

/// Grid shading stage; derives `fwidth` of the hit point from its quad.
pub struct GridStage<'a> {
    pub camera: &'a GridCamera,
    pub params: &'a GridParams,
}

impl FragmentStage for GridStage<'_> {
    type Varyings = GridVaryings;

    fn shade_quad(&self, lanes: &[GridVaryings; 4]) -> [Fragment; 4] {
        let hits = lanes.map(|varyings| GroundHit::from_ray(&varyings));
        let footprint = coarse_fwidth(hits.map(|hit| Vec2::new(hit.position.x, hit.position.z)));
        hits.map(|hit| {
            let fragment = shade_grid(&hit, footprint, self.camera, self.params);
            Fragment {
                color: fragment.color,
                depth: Some(fragment.depth),
            }
        })
    }
}

/// Software renderer running the vertex, lighting and grid kernels.
#[derive(Debug, Clone)]
pub struct CpuRenderer {
    rasterizer: Rasterizer,
    accumulator: LightingAccumulator,
    textures: SharedTextures,
}

impl CpuRenderer {
    pub fn new(convention: DepthConvention, specular_model: SpecularModel, textures: SharedTextures) -> Self {
        Self {
            rasterizer: Rasterizer::new(convention),
            accumulator: LightingAccumulator::new(specular_model),
            textures,
        }
    }

    pub fn convention(&self) -> DepthConvention {
        self.rasterizer.convention
    }

    pub fn textures(&self) -> &SharedTextures {
        &self.textures
    }

    /// Draws a lit mesh. The texture table stays read-locked for the
    /// whole draw.
    pub fn draw_mesh(
        &self,
        target: &mut Framebuffer,
        mesh: &Mesh,
        transforms: &Transforms,
        material: &Material,
        rig: &LightRig,
        view_position: Vec3,
    ) -> Result<DrawStats, ShadingError> {
        self.draw_surface(target, mesh, transforms, material, rig, view_position, PolygonMode::Fill)
    }

    /// Draws only the triangle edges of a mesh, lit with the wireframe
    /// colors of `material`.
    pub fn draw_wireframe(
        &self,
        target: &mut Framebuffer,
        mesh: &Mesh,
        transforms: &Transforms,
        material: &Material,
        rig: &LightRig,
        view_position: Vec3,
    ) -> Result<DrawStats, ShadingError> {
        let material = material.wireframe_override();
        self.draw_surface(target, mesh, transforms, &material, rig, view_position, PolygonMode::Line)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_surface(
        &self,
        target: &mut Framebuffer,
        mesh: &Mesh,
        transforms: &Transforms,
        material: &Material,
        rig: &LightRig,
        view_position: Vec3,
        mode: PolygonMode,
    ) -> Result<DrawStats, ShadingError> {
        rig.validate()?;
        let textures = self.textures.read();
        material.validate(&textures)?;

        let vertices: Vec<_> = mesh
            .vertices
            .iter()
            .map(|vertex| {
                let out = transform_vertex(vertex, transforms);
                ClipVertex {
                    position: out.clip_position,
                    varyings: out.varyings,
                }
            })
            .collect();
        let stage = LightingStage {
            accumulator: self.accumulator,
            material,
            rig,
            view_position,
            textures: &textures,
        };
        let stats = self
            .rasterizer
            .draw_with_mode(target, &vertices, &mesh.indices, &stage, mode);
        if stats.invalid > 0 {
            warn!("mesh draw skipped {} triangles with dangling indices", stats.invalid);
        }
        debug!(
            "mesh draw ({mode:?}): {} triangles, {} culled, {} fragments written of {} covered",
            stats.triangles, stats.culled, stats.written, stats.covered
        );
        Ok(stats)
    }

    /// Draws the infinite grid over whatever the target already holds.
    pub fn draw_grid(
        &self,
        target: &mut Framebuffer,
        transforms: &Transforms,
        params: &GridParams,
    ) -> Result<DrawStats, ShadingError> {
        transforms.validate_invertible()?;
        let mut params = *params;
        if params.depth != self.convention() {
            warn!("grid depth convention differs from the target's, using the target's");
            params.depth = self.convention();
        }

        let camera = GridCamera::new(transforms.view, transforms.projection);
        let vertices = GRID_QUAD.map(|corner| {
            let out = grid_vertex(&camera, corner);
            ClipVertex {
                position: out.clip_position,
                varyings: out.varyings,
            }
        });
        let stage = GridStage {
            camera: &camera,
            params: &params,
        };
        let stats = self
            .rasterizer
            .draw(target, &vertices, &[0, 1, 2, 3, 4, 5], &stage);
        debug!("grid draw: {} fragments written", stats.written);
        Ok(stats)
    }
}

impl Default for CpuRenderer {
    fn default() -> Self {
        Self::new(DepthConvention::OPENGL, SpecularModel::default(), SharedTextures::default())
    }
}

/// Background the CLI clears to before drawing.
pub const CLEAR_COLOR: Vec4 = Vec4::new(0.1, 0.1, 0.1, 1.0);
