use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use glam::{Mat4, Vec3};
use log::{debug, error};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::depth::{ClipDepth, DepthConvention};
use crate::obj::{load_obj, Mesh};
use crate::params::{
    Attenuation, DirectionalLight, GridParams, LightColors, LightRig, Material, PointLight,
    SpotLight, Transforms,
};
use crate::texture::{SharedTextures, Texture2D, TextureHandle};

/// Scene description loaded from XML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub camera: CameraSettings,
    pub viewport: (u32, u32),
    pub rig: LightRig,
    /// Keeps the spot light on the eye, pointing along the view.
    pub spot_follows_camera: bool,
    pub grid: GridSettings,
    pub objects: Vec<SceneObject>,
    /// Directory relative mesh and texture paths are resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            viewport: (800, 600),
            rig: LightRig::default(),
            spot_follows_camera: true,
            grid: GridSettings::default(),
            objects: Vec::new(),
            base_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 6.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 45.0,
            near: 0.01,
            far: 200.0,
        }
    }
}

impl CameraSettings {
    pub fn front(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Projection whose clip depth matches `convention`.
    pub fn projection(&self, aspect: f32, convention: DepthConvention) -> Mat4 {
        let fov = self.fov.to_radians();
        let aspect = aspect.max(0.01);
        match convention.clip {
            ClipDepth::NegOneToOne => Mat4::perspective_rh_gl(fov, aspect, self.near, self.far),
            ClipDepth::ZeroToOne => Mat4::perspective_rh(fov, aspect, self.near, self.far),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub enabled: bool,
    pub params: GridParams,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            params: GridParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureKind {
    Diffuse,
    Specular,
    Ambient,
    Emission,
    Normal,
}

impl TextureKind {
    fn parse(value: &str) -> Result<Self> {
        Ok(match value {
            "diffuse" => Self::Diffuse,
            "specular" => Self::Specular,
            "ambient" => Self::Ambient,
            "emission" | "emissive" => Self::Emission,
            "normal" => Self::Normal,
            other => bail!("unknown texture kind {other:?}"),
        })
    }
}

/// Texture file referenced by a material, not yet loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRef {
    pub kind: TextureKind,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    /// OBJ file; the unit cube is drawn when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
    #[serde(default)]
    pub position: Vec3,
    /// Euler angles in degrees, applied x, then y, then z.
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    pub material: Material,
    #[serde(default)]
    pub textures: Vec<TextureRef>,
    #[serde(default)]
    pub wireframe: bool,
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            mesh: None,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: default_scale(),
            material: Material::default(),
            textures: Vec::new(),
            wireframe: false,
        }
    }
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

impl SceneObject {
    pub fn model_matrix(&self) -> Mat4 {
        object_model_matrix(self)
    }
}

fn object_model_matrix(object: &SceneObject) -> Mat4 {
    let translation = Mat4::from_translation(object.position);
    let rotation = Mat4::from_rotation_z(object.rotation.z.to_radians())
        * Mat4::from_rotation_y(object.rotation.y.to_radians())
        * Mat4::from_rotation_x(object.rotation.x.to_radians());
    let scale = Mat4::from_scale(object.scale);
    translation * rotation * scale
}

impl Scene {
    /// Reads a scene file; relative asset paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read scene {}", path.display()))?;
        let mut scene = Self::from_xml(&xml)
            .with_context(|| format!("failed to parse scene {}", path.display()))?;
        scene.base_dir = path.parent().map(Path::to_path_buf);
        Ok(scene)
    }

    /// Parses a scene document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        let mut scene = Scene::default();

        if let Some(node) = child(&root, "camera") {
            scene.camera = parse_camera(&node).context("invalid <camera>")?;
        }
        if let Some(node) = child(&root, "viewport") {
            let width = parse_u32(optional_text(&node, "width"), scene.viewport.0)?;
            let height = parse_u32(optional_text(&node, "height"), scene.viewport.1)?;
            if width == 0 || height == 0 {
                bail!("viewport must have a non-zero area");
            }
            scene.viewport = (width, height);
        }

        let lights = child(&root, "lights").unwrap_or(root);
        if let Some(node) = child(&lights, "directional") {
            scene.rig.directional = parse_directional(&node).context("invalid <directional>")?;
        }
        let points = lights
            .children()
            .filter(|n| n.has_tag_name("point"))
            .map(|node| parse_point(&node).context("invalid <point>"))
            .collect::<Result<Vec<_>>>()?;
        if !points.is_empty() {
            scene.rig = scene.rig.with_point_lights(&points)?;
        }
        if let Some(node) = child(&lights, "spot") {
            let (spot, follows_camera) = parse_spot(&node).context("invalid <spot>")?;
            scene.rig.spot = spot;
            scene.spot_follows_camera = follows_camera;
        }
        scene.rig.validate()?;

        if let Some(node) = child(&root, "grid") {
            scene.grid = parse_grid(&node).context("invalid <grid>")?;
        }
        // the grid fades against the camera's clip planes
        scene.grid.params.near = scene.camera.near;
        scene.grid.params.far = scene.camera.far;

        for node in root.descendants().filter(|n| n.has_tag_name("object")) {
            let object = parse_object(&node)?;
            scene.objects.push(object);
        }

        debug!(
            "parsed scene: {} objects, {} point lights",
            scene.objects.len(),
            scene.active_point_lights()
        );
        Ok(scene)
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.0 as f32 / self.viewport.1 as f32
    }

    /// Point lights with a non-black color.
    pub fn active_point_lights(&self) -> usize {
        self.rig
            .points
            .iter()
            .filter(|light| light.colors != LightColors::BLACK)
            .count()
    }

    /// Light rig as drawn this frame.
    pub fn frame_rig(&self) -> LightRig {
        let mut rig = self.rig;
        if self.spot_follows_camera {
            rig.attach_spot_to_camera(self.camera.position, self.camera.front());
        }
        rig
    }

    /// Camera-only transforms, as used by the grid pass.
    pub fn camera_transforms(&self, convention: DepthConvention) -> Transforms {
        Transforms::new(
            Mat4::IDENTITY,
            self.camera.view(),
            self.camera.projection(self.aspect(), convention),
        )
    }

    pub fn object_transforms(&self, object: &SceneObject, convention: DepthConvention) -> Transforms {
        Transforms {
            model: object.model_matrix(),
            ..self.camera_transforms(convention)
        }
        .with_normal_matrix()
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(dir) if Path::new(path).is_relative() => dir.join(path),
            _ => PathBuf::from(path),
        }
    }

    /// Loads every referenced texture into `textures` and points the
    /// materials at them. Files shared by several materials load once.
    pub fn load_textures(&mut self, textures: &SharedTextures) -> Result<usize> {
        let mut loaded: HashMap<PathBuf, TextureHandle> = HashMap::new();
        let resolved: Vec<Vec<(TextureKind, PathBuf)>> = self
            .objects
            .iter()
            .map(|object| {
                object
                    .textures
                    .iter()
                    .map(|texture| (texture.kind, self.resolve(&texture.path)))
                    .collect()
            })
            .collect();

        for (object, refs) in self.objects.iter_mut().zip(resolved) {
            for (kind, path) in refs {
                let handle = match loaded.get(&path) {
                    Some(handle) => *handle,
                    None => {
                        let texture = Texture2D::load(&path)
                            .with_context(|| format!("material of {}", object.name))?;
                        let handle = textures.insert(texture);
                        loaded.insert(path, handle);
                        handle
                    }
                };
                let maps = &mut object.material.textures;
                let slot = match kind {
                    TextureKind::Diffuse => &mut maps.diffuse,
                    TextureKind::Specular => &mut maps.specular,
                    TextureKind::Ambient => &mut maps.ambient,
                    TextureKind::Emission => &mut maps.emission,
                    TextureKind::Normal => &mut maps.normal,
                };
                *slot = Some(handle);
                object.material.use_textures = true;
            }
        }
        Ok(loaded.len())
    }

    /// Loads the mesh of every object. Meshes that fail to load are
    /// reported and replaced by the unit cube.
    pub fn load_meshes(&self) -> Vec<Mesh> {
        let mut cache: HashMap<PathBuf, Mesh> = HashMap::new();
        let cube = Mesh::cube();
        self.objects
            .iter()
            .map(|object| {
                let Some(name) = object.mesh.as_deref() else {
                    return cube.clone();
                };
                let path = self.resolve(name);
                if let Some(mesh) = cache.get(&path) {
                    return mesh.clone();
                }
                match load_obj(&path) {
                    Ok(mesh) => {
                        cache.insert(path, mesh.clone());
                        mesh
                    }
                    Err(err) => {
                        error!("failed to load mesh {name}: {err:?}");
                        cube.clone()
                    }
                }
            })
            .collect()
    }
}

fn parse_camera(node: &Node<'_, '_>) -> Result<CameraSettings> {
    let defaults = CameraSettings::default();
    let camera = CameraSettings {
        position: parse_vec3(optional_text(node, "position"), defaults.position)?,
        target: parse_vec3(optional_text(node, "target"), defaults.target)?,
        up: parse_vec3(optional_text(node, "up"), defaults.up)?,
        fov: parse_f32(optional_text(node, "fov"), defaults.fov)?,
        near: parse_f32(optional_text(node, "near"), defaults.near)?,
        far: parse_f32(optional_text(node, "far"), defaults.far)?,
    };
    if !(camera.near > 0.0 && camera.far > camera.near) {
        bail!("clip planes must satisfy 0 < near < far");
    }
    if camera.position == camera.target {
        bail!("camera position and target coincide");
    }
    Ok(camera)
}

fn parse_colors(node: &Node<'_, '_>, defaults: LightColors) -> Result<LightColors> {
    Ok(LightColors {
        ambient: parse_vec3(optional_text(node, "ambient"), defaults.ambient)?,
        diffuse: parse_vec3(optional_text(node, "diffuse"), defaults.diffuse)?,
        specular: parse_vec3(optional_text(node, "specular"), defaults.specular)?,
    })
}

fn parse_attenuation(node: &Node<'_, '_>, defaults: Attenuation) -> Result<Attenuation> {
    Ok(Attenuation {
        constant: parse_f32(optional_text(node, "constant"), defaults.constant)?,
        linear: parse_f32(optional_text(node, "linear"), defaults.linear)?,
        quadratic: parse_f32(optional_text(node, "quadratic"), defaults.quadratic)?,
    })
}

fn parse_directional(node: &Node<'_, '_>) -> Result<DirectionalLight> {
    let defaults = DirectionalLight::default();
    Ok(DirectionalLight {
        direction: parse_vec3(optional_text(node, "direction"), defaults.direction)?,
        colors: parse_colors(node, defaults.colors)?,
    })
}

fn parse_point(node: &Node<'_, '_>) -> Result<PointLight> {
    let defaults = PointLight::new(Vec3::ZERO);
    Ok(PointLight {
        position: parse_vec3(Some(required_text(node, "position")?), Vec3::ZERO)?,
        colors: parse_colors(node, defaults.colors)?,
        attenuation: parse_attenuation(node, defaults.attenuation)?,
    })
}

/// Returns the spot light and whether it follows the camera.
fn parse_spot(node: &Node<'_, '_>) -> Result<(SpotLight, bool)> {
    let defaults = SpotLight::default();
    let position = optional_text(node, "position");
    let direction = optional_text(node, "direction");
    let follows_camera = position.is_none() && direction.is_none();
    let inner = parse_f32(optional_text(node, "inner"), 12.5)?;
    let outer = parse_f32(optional_text(node, "outer"), 15.0)?;
    let mut spot = SpotLight::from_degrees(
        parse_vec3(position, defaults.position)?,
        parse_vec3(direction, defaults.direction)?,
        inner,
        outer,
    );
    spot.colors = parse_colors(node, defaults.colors)?;
    spot.attenuation = parse_attenuation(node, defaults.attenuation)?;
    Ok((spot, follows_camera))
}

fn parse_grid(node: &Node<'_, '_>) -> Result<GridSettings> {
    let defaults = GridSettings::default();
    let mut style = defaults.params.style;
    style.line_width = parse_f32(optional_text(node, "line-width"), style.line_width)?;
    style.line_opacity = parse_f32(optional_text(node, "opacity"), style.line_opacity)?;
    style.line_color = parse_vec3(optional_text(node, "color"), style.line_color)?;
    Ok(GridSettings {
        enabled: parse_bool(optional_text(node, "enabled"), defaults.enabled)?,
        params: GridParams {
            style,
            ..defaults.params
        },
    })
}

fn parse_material(node: &Node<'_, '_>) -> Result<(Material, Vec<TextureRef>)> {
    let defaults = Material::default();
    let material = Material {
        ambient: parse_vec3(optional_text(node, "ambient"), defaults.ambient)?,
        diffuse: parse_vec3(optional_text(node, "diffuse"), defaults.diffuse)?,
        specular: parse_vec3(optional_text(node, "specular"), defaults.specular)?,
        shininess: parse_f32(optional_text(node, "shininess"), defaults.shininess)?,
        opacity: parse_f32(optional_text(node, "opacity"), defaults.opacity)?,
        ..defaults
    };
    let textures = node
        .children()
        .filter(|n| n.has_tag_name("texture"))
        .map(|texture| {
            let kind = texture
                .attribute("kind")
                .ok_or_else(|| anyhow!("<texture> needs a kind attribute"))?;
            let path = texture
                .text()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .ok_or_else(|| anyhow!("<texture> needs a path"))?;
            Ok(TextureRef {
                kind: TextureKind::parse(kind)?,
                path: path.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((material, textures))
}

fn parse_object(node: &Node<'_, '_>) -> Result<SceneObject> {
    let name = required_text(node, "name")?;
    let context = || format!("invalid object {name}");
    let defaults = SceneObject::default();

    let mut material = defaults.material;
    let mut textures = Vec::new();
    if let Some(color) = optional_text(node, "color") {
        material = Material::flat(parse_vec3(Some(color), Vec3::ONE).with_context(context)?);
    }
    if let Some(node) = child(node, "material") {
        (material, textures) = parse_material(&node).with_context(context)?;
    }

    Ok(SceneObject {
        mesh: optional_text(node, "mesh"),
        position: parse_vec3(optional_text(node, "position"), defaults.position)
            .with_context(context)?,
        rotation: parse_vec3(optional_text(node, "rotation"), defaults.rotation)
            .with_context(context)?,
        scale: parse_vec3(optional_text(node, "scale"), defaults.scale).with_context(context)?,
        wireframe: parse_bool(optional_text(node, "wireframe"), false).with_context(context)?,
        material,
        textures,
        name,
    })
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let components = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("invalid vector component {component:?}: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    match components.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!("expected 3 vector components, got {}", components.len())),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

fn parse_u32(value: Option<String>, default: u32) -> Result<u32> {
    match value {
        Some(value) => value
            .parse::<u32>()
            .map_err(|err| anyhow!("failed to parse integer: {err}")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref() {
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(anyhow!("expected a boolean, got {other:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShadingError;
    use crate::params::POINT_LIGHT_COUNT;
    use glam::Vec4;

    const SAMPLE: &str = r#"
    <scene>
        <camera>
            <position>0 3 8</position>
            <target>0 0 0</target>
            <fov>60</fov>
        </camera>
        <viewport><width>320</width><height>240</height></viewport>
        <lights>
            <directional>
                <direction>0 -1 0</direction>
                <diffuse>0.4 0.4 0.4</diffuse>
            </directional>
            <point>
                <position>1 2 3</position>
                <linear>0.5</linear>
            </point>
            <point>
                <position>-1 2 3</position>
            </point>
            <spot>
                <inner>10</inner>
                <outer>20</outer>
            </spot>
        </lights>
        <grid>
            <line-width>0.2</line-width>
            <opacity>0.5</opacity>
        </grid>
        <object>
            <name>Crate</name>
            <position>0 0.5 0</position>
            <rotation>0 45 0</rotation>
            <material>
                <shininess>64</shininess>
                <texture kind="diffuse">crate.png</texture>
            </material>
        </object>
        <object>
            <name>Marker</name>
            <color>1 0 0</color>
            <wireframe>true</wireframe>
        </object>
    </scene>
    "#;

    #[test]
    fn parse_scene_populates_camera_lights_and_objects() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        assert_eq!(scene.camera.position, Vec3::new(0.0, 3.0, 8.0));
        assert_eq!(scene.camera.fov, 60.0);
        assert_eq!(scene.viewport, (320, 240));
        assert_eq!(scene.rig.directional.colors.diffuse, Vec3::splat(0.4));
        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.objects[0].material.shininess, 64.0);
        assert_eq!(
            scene.objects[0].textures,
            vec![TextureRef {
                kind: TextureKind::Diffuse,
                path: "crate.png".to_string()
            }]
        );
        assert_eq!(scene.grid.params.style.line_opacity, 0.5);
    }

    #[test]
    fn unused_point_light_slots_are_dark() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        assert_eq!(scene.active_point_lights(), 2);
        assert_eq!(scene.rig.points[0].attenuation.linear, 0.5);
        for light in &scene.rig.points[2..] {
            assert_eq!(light.colors, LightColors::BLACK);
        }
    }

    #[test]
    fn five_point_lights_are_rejected() {
        let points = "<point><position>0 0 0</position></point>".repeat(POINT_LIGHT_COUNT + 1);
        let xml = format!("<scene><lights>{points}</lights></scene>");
        let err = Scene::from_xml(&xml).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShadingError>(),
            Some(ShadingError::TooManyPointLights { count: 5, max: 4 })
        ));
    }

    #[test]
    fn inverted_spot_cone_is_rejected() {
        let xml = "<scene><spot><inner>20</inner><outer>10</outer></spot></scene>";
        let err = Scene::from_xml(xml).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShadingError>(),
            Some(ShadingError::InvalidSpotCone { .. })
        ));
    }

    #[test]
    fn spot_without_placement_follows_the_camera() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        assert!(scene.spot_follows_camera);
        let rig = scene.frame_rig();
        assert_eq!(rig.spot.position, scene.camera.position);
        assert!((rig.spot.direction - scene.camera.front()).length() < 1e-6);
        assert!((rig.spot.inner_cutoff - 10f32.to_radians().cos()).abs() < 1e-6);
    }

    #[test]
    fn empty_scene_uses_the_default_rig() {
        let scene = Scene::from_xml("<scene/>").unwrap();
        assert_eq!(scene.rig, LightRig::default());
        assert!(scene.grid.enabled);
        assert!(scene.objects.is_empty());
    }

    #[test]
    fn wireframe_flag_keeps_the_authored_material() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        let marker = &scene.objects[1];
        assert!(marker.wireframe);
        assert!(!scene.objects[0].wireframe);
        assert_eq!(marker.material, Material::flat(Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<scene><object><mesh>cube.obj</mesh></object></scene>";
        assert!(Scene::from_xml(bad).is_err());
    }

    #[test]
    fn short_vectors_are_an_error() {
        let bad = "<scene><camera><position>1 2</position></camera></scene>";
        assert!(Scene::from_xml(bad).is_err());
    }

    #[test]
    fn object_transforms_place_the_object() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        let transforms = scene.object_transforms(&scene.objects[0], DepthConvention::OPENGL);
        let origin = transforms.model * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(origin.truncate(), Vec3::new(0.0, 0.5, 0.0));
        assert!(transforms.normal_matrix.is_some());
    }

    #[test]
    fn textures_load_once_and_bind_to_materials() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))
            .save(dir.path().join("crate.png"))
            .unwrap();
        let xml = r#"<scene>
            <object><name>A</name><material><texture kind="diffuse">crate.png</texture></material></object>
            <object><name>B</name><material><texture kind="specular">crate.png</texture></material></object>
        </scene>"#;
        let scene_path = dir.path().join("scene.xml");
        std::fs::write(&scene_path, xml).unwrap();

        let mut scene = Scene::load(&scene_path).unwrap();
        let textures = SharedTextures::default();
        assert_eq!(scene.load_textures(&textures).unwrap(), 1);
        assert_eq!(textures.read().len(), 1);
        assert!(scene.objects[0].material.use_textures);
        assert_eq!(scene.objects[1].material.textures.specular, Some(TextureHandle(0)));
    }

    #[test]
    fn missing_meshes_fall_back_to_the_cube() {
        let scene = Scene::from_xml("<scene><object><name>A</name><mesh>nope.obj</mesh></object></scene>")
            .unwrap();
        let meshes = scene.load_meshes();
        assert_eq!(meshes[0], Mesh::cube());
    }
}
