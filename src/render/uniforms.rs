use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::depth::ClipDepth;
use crate::grid::GridCamera;
use crate::lighting::SpecularModel;
use crate::params::{
    Attenuation, DirectionalLight, GridParams, LightColors, LightRig, Material, PointLight,
    SpotLight, Transforms, POINT_LIGHT_COUNT,
};

/// Bits of [`ObjectUniform::flags`]`[2]`, one per bound material map.
pub const MAP_DIFFUSE: u32 = 1;
pub const MAP_SPECULAR: u32 = 2;
pub const MAP_AMBIENT: u32 = 4;
pub const MAP_EMISSION: u32 = 8;
pub const MAP_NORMAL: u32 = 16;

// Blocks follow WGSL uniform address-space layout: every vec3 is padded
// to 16 bytes and mat3x3 columns are stored as vec4.
fn vec4(v: Vec3, w: f32) -> [f32; 4] {
    v.extend(w).to_array()
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightColorsBlock {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
}

impl From<&LightColors> for LightColorsBlock {
    fn from(colors: &LightColors) -> Self {
        Self {
            ambient: vec4(colors.ambient, 0.0),
            diffuse: vec4(colors.diffuse, 0.0),
            specular: vec4(colors.specular, 0.0),
        }
    }
}

fn attenuation_block(attenuation: &Attenuation) -> [f32; 4] {
    [attenuation.constant, attenuation.linear, attenuation.quadratic, 0.0]
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DirectionalBlock {
    pub direction: [f32; 4],
    pub colors: LightColorsBlock,
}

impl From<&DirectionalLight> for DirectionalBlock {
    fn from(light: &DirectionalLight) -> Self {
        Self {
            direction: vec4(light.direction, 0.0),
            colors: (&light.colors).into(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PointBlock {
    pub position: [f32; 4],
    pub attenuation: [f32; 4],
    pub colors: LightColorsBlock,
}

impl From<&PointLight> for PointBlock {
    fn from(light: &PointLight) -> Self {
        Self {
            position: vec4(light.position, 1.0),
            attenuation: attenuation_block(&light.attenuation),
            colors: (&light.colors).into(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SpotBlock {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub cutoff: [f32; 4],
    pub attenuation: [f32; 4],
    pub colors: LightColorsBlock,
}

impl From<&SpotLight> for SpotBlock {
    fn from(light: &SpotLight) -> Self {
        Self {
            position: vec4(light.position, 1.0),
            direction: vec4(light.direction, 0.0),
            cutoff: [light.inner_cutoff, light.outer_cutoff, 0.0, 0.0],
            attenuation: attenuation_block(&light.attenuation),
            colors: (&light.colors).into(),
        }
    }
}

/// Per-frame block: camera and the whole light rig.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightingGlobals {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_position: [f32; 4],
    pub directional: DirectionalBlock,
    pub points: [PointBlock; POINT_LIGHT_COUNT],
    pub spot: SpotBlock,
    pub options: [u32; 4],
}

impl LightingGlobals {
    pub fn new(
        view: Mat4,
        projection: Mat4,
        view_position: Vec3,
        rig: &LightRig,
        specular_model: SpecularModel,
    ) -> Self {
        let model = match specular_model {
            SpecularModel::BlinnPhong => 0,
            SpecularModel::Phong => 1,
        };
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            view_position: vec4(view_position, 1.0),
            directional: (&rig.directional).into(),
            points: rig.points.each_ref().map(PointBlock::from),
            spot: (&rig.spot).into(),
            options: [model, 0, 0, 0],
        }
    }
}

/// Per-draw block: model matrix and material.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 3],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub params: [f32; 4],
    pub flags: [u32; 4],
}

impl ObjectUniform {
    pub fn new(transforms: &Transforms, material: &Material) -> Self {
        let maps = &material.textures;
        let mask = [
            (maps.diffuse, MAP_DIFFUSE),
            (maps.specular, MAP_SPECULAR),
            (maps.ambient, MAP_AMBIENT),
            (maps.emission, MAP_EMISSION),
            (maps.normal, MAP_NORMAL),
        ]
        .into_iter()
        .filter(|(handle, _)| handle.is_some())
        .fold(0, |mask, (_, bit)| mask | bit);

        Self {
            model: transforms.model.to_cols_array_2d(),
            normal_matrix: mat3_to_3x4(transforms.normal_matrix.unwrap_or(Mat3::IDENTITY)),
            ambient: vec4(material.ambient, 0.0),
            diffuse: vec4(material.diffuse, 0.0),
            specular: vec4(material.specular, material.shininess),
            params: [material.opacity, 0.0, 0.0, 0.0],
            flags: [
                material.use_textures as u32,
                transforms.normal_matrix.is_some() as u32,
                mask,
                0,
            ],
        }
    }
}

/// Grid pass block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GridUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub inverse_view: [[f32; 4]; 4],
    pub inverse_projection: [[f32; 4]; 4],
    pub line_color: [f32; 4],
    pub x_axis_color: [f32; 4],
    pub z_axis_color: [f32; 4],
    pub planes: [f32; 4],
    pub depth_range: [f32; 4],
    pub flags: [u32; 4],
}

impl GridUniform {
    pub fn new(camera: &GridCamera, params: &GridParams) -> Self {
        let style = &params.style;
        let zero_to_one = matches!(params.depth.clip, ClipDepth::ZeroToOne);
        Self {
            view: camera.view.to_cols_array_2d(),
            projection: camera.projection.to_cols_array_2d(),
            inverse_view: camera.inverse_view.to_cols_array_2d(),
            inverse_projection: camera.inverse_projection.to_cols_array_2d(),
            line_color: vec4(style.line_color, style.line_opacity),
            x_axis_color: vec4(style.x_axis_color, style.line_width),
            z_axis_color: vec4(style.z_axis_color, 0.0),
            planes: [params.near, params.far, style.scales[0], style.scales[1]],
            depth_range: [params.depth.range.near, params.depth.range.far, 0.0, 0.0],
            flags: [zero_to_one as u32, 0, 0, 0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::DepthConvention;
    use crate::texture::TextureHandle;

    #[test]
    fn block_sizes_match_the_wgsl_layouts() {
        assert_eq!(std::mem::size_of::<LightColorsBlock>(), 48);
        assert_eq!(std::mem::size_of::<PointBlock>(), 80);
        assert_eq!(std::mem::size_of::<SpotBlock>(), 112);
        assert_eq!(std::mem::size_of::<LightingGlobals>(), 656);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 192);
        assert_eq!(std::mem::size_of::<GridUniform>(), 352);
    }

    #[test]
    fn texture_mask_tracks_bound_maps() {
        let mut material = Material::default();
        material.use_textures = true;
        material.textures.diffuse = Some(TextureHandle(0));
        material.textures.normal = Some(TextureHandle(1));
        let block = ObjectUniform::new(&Transforms::default(), &material);
        assert_eq!(block.flags, [1, 0, MAP_DIFFUSE | MAP_NORMAL, 0]);
    }

    #[test]
    fn precomputed_normal_matrix_sets_its_flag() {
        let transforms = Transforms::new(Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)), Mat4::IDENTITY, Mat4::IDENTITY)
            .with_normal_matrix();
        let block = ObjectUniform::new(&transforms, &Material::default());
        assert_eq!(block.flags[1], 1);
        assert_eq!(block.normal_matrix[0][0], 0.5);
    }

    #[test]
    fn grid_block_carries_the_depth_convention() {
        let camera = GridCamera::new(Mat4::IDENTITY, Mat4::IDENTITY);
        let params = GridParams {
            depth: DepthConvention::WGPU,
            ..GridParams::default()
        };
        let block = GridUniform::new(&camera, &params);
        assert_eq!(block.flags[0], 1);
        assert_eq!(block.planes, [0.01, 200.0, 5.0, 0.5]);
    }
}
