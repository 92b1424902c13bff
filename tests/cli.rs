use assert_cmd::prelude::*;
use predicates::str::contains;
use std::process::Command;
use tempfile::TempDir;

fn write_scene(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("scene.xml");
    std::fs::write(&path, format!("<scene>{body}</scene>")).expect("write scene");
    path
}

const BASIC: &str = r#"
  <camera>
    <position>0 2 5</position>
    <target>0 0 0</target>
  </camera>
  <viewport><width>64</width><height>48</height></viewport>
  <lights>
    <point><position>1 2 2</position></point>
  </lights>
  <object>
    <name>Cube</name>
    <color>0.8 0.3 0.2</color>
  </object>
"#;

#[test]
fn cli_prints_summary_only() {
    let dir = TempDir::new().expect("temp dir");
    let scene = write_scene(&dir, BASIC);
    let mut cmd = Command::cargo_bin("gridlight").expect("binary exists");
    cmd.arg(&scene).arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 1 objects (1 point lights)"))
        .stdout(contains(" - Cube (cube)"));
    assert!(!scene.with_extension("png").exists());
}

#[test]
fn cli_renders_png() {
    let dir = TempDir::new().expect("temp dir");
    let scene = write_scene(&dir, BASIC);
    let output = dir.path().join("out.png");
    let mut cmd = Command::cargo_bin("gridlight").expect("binary exists");
    cmd.arg(&scene).arg("--output").arg(&output);
    cmd.assert().success().stdout(contains("Wrote"));

    let image = image::open(&output).expect("png written").to_rgba8();
    assert_eq!(image.dimensions(), (64, 48));
    // the cube sits in the middle of the frame, lit over the clear color
    let center = image.get_pixel(32, 24);
    assert!(center[0] > 26, "center pixel {center:?}");
}

fn rendered_pixels(dir: &TempDir, wireframe: bool) -> usize {
    let body = format!(
        r#"<camera><position>0 2 5</position><target>0 0 0</target></camera>
        <viewport><width>256</width><height>192</height></viewport>
        <object><name>Cube</name><wireframe>{wireframe}</wireframe></object>"#
    );
    let scene = write_scene(dir, &body);
    let output = dir.path().join(format!("wireframe-{wireframe}.png"));
    Command::cargo_bin("gridlight")
        .expect("binary exists")
        .arg(&scene)
        .arg("--no-grid")
        .arg("--output")
        .arg(&output)
        .assert()
        .success();
    let image = image::open(&output).expect("png written").to_rgba8();
    let clear = *image.get_pixel(0, 0);
    image.pixels().filter(|pixel| **pixel != clear).count()
}

#[test]
fn cli_draws_wireframe_objects_as_edges() {
    let dir = TempDir::new().expect("temp dir");
    let filled = rendered_pixels(&dir, false);
    let edges = rendered_pixels(&dir, true);
    assert!(edges > 0);
    assert!(edges * 2 < filled, "edges {edges} vs filled {filled}");
}

#[test]
fn cli_rejects_five_point_lights() {
    let dir = TempDir::new().expect("temp dir");
    let points = "<point><position>0 1 0</position></point>".repeat(5);
    let scene = write_scene(&dir, &format!("<lights>{points}</lights>"));
    let mut cmd = Command::cargo_bin("gridlight").expect("binary exists");
    cmd.arg(&scene).arg("--summary-only");
    cmd.assert()
        .failure()
        .stderr(contains("at most 4 point lights are supported, got 5"));
}

#[test]
fn cli_requires_a_scene_path() {
    let mut cmd = Command::cargo_bin("gridlight").expect("binary exists");
    cmd.assert().failure().stderr(contains("Usage: gridlight"));
}
