use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::depth::DepthConvention;
use crate::error::ShadingError;
use crate::texture::{TextureHandle, TextureTable};

/// Number of point-light slots evaluated for every fragment.
pub const POINT_LIGHT_COUNT: usize = 4;

/// Ambient, diffuse and specular colors of a light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightColors {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl LightColors {
    pub const BLACK: LightColors = LightColors {
        ambient: Vec3::ZERO,
        diffuse: Vec3::ZERO,
        specular: Vec3::ZERO,
    };

    pub fn gray(ambient: f32, diffuse: f32, specular: f32) -> Self {
        Self {
            ambient: Vec3::splat(ambient),
            diffuse: Vec3::splat(diffuse),
            specular: Vec3::splat(specular),
        }
    }
}

/// Distance falloff coefficients of point and spot lights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    pub const NONE: Attenuation = Attenuation {
        constant: 1.0,
        linear: 0.0,
        quadratic: 0.0,
    };

    /// `1 / (constant + linear * d + quadratic * 2 * d)`.
    pub fn factor(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * 2.0 * distance)
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Direction the light travels in; negated before shading.
    pub direction: Vec3,
    pub colors: LightColors,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.2, -1.0, -0.3),
            colors: LightColors::gray(0.1, 0.5, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub colors: LightColors,
    pub attenuation: Attenuation,
}

impl PointLight {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            colors: LightColors::gray(0.1, 0.7, 1.0),
            attenuation: Attenuation::default(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            position: Vec3::ZERO,
            colors: LightColors::BLACK,
            attenuation: Attenuation::NONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    /// Cosine of the inner cone angle; must exceed `outer_cutoff`.
    pub inner_cutoff: f32,
    /// Cosine of the outer cone angle.
    pub outer_cutoff: f32,
    pub colors: LightColors,
    pub attenuation: Attenuation,
}

impl SpotLight {
    pub fn from_degrees(position: Vec3, direction: Vec3, inner: f32, outer: f32) -> Self {
        Self {
            position,
            direction,
            inner_cutoff: inner.to_radians().cos(),
            outer_cutoff: outer.to_radians().cos(),
            colors: LightColors::gray(0.2, 0.5, 1.0),
            attenuation: Attenuation::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ShadingError> {
        if self.inner_cutoff > self.outer_cutoff {
            Ok(())
        } else {
            Err(ShadingError::InvalidSpotCone {
                inner: self.inner_cutoff,
                outer: self.outer_cutoff,
            })
        }
    }
}

impl Default for SpotLight {
    fn default() -> Self {
        Self::from_degrees(Vec3::new(0.0, 3.0, 3.0), Vec3::NEG_Z, 12.5, 15.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightRig {
    pub directional: DirectionalLight,
    pub points: [PointLight; POINT_LIGHT_COUNT],
    pub spot: SpotLight,
}

impl LightRig {
    pub fn dark() -> Self {
        Self {
            directional: DirectionalLight {
                direction: Vec3::NEG_Y,
                colors: LightColors::BLACK,
            },
            points: [PointLight::disabled(); POINT_LIGHT_COUNT],
            spot: SpotLight {
                colors: LightColors::BLACK,
                ..SpotLight::default()
            },
        }
    }

    pub fn with_point_lights(mut self, lights: &[PointLight]) -> Result<Self, ShadingError> {
        if lights.len() > POINT_LIGHT_COUNT {
            return Err(ShadingError::TooManyPointLights {
                count: lights.len(),
                max: POINT_LIGHT_COUNT,
            });
        }
        self.points = [PointLight::disabled(); POINT_LIGHT_COUNT];
        self.points[..lights.len()].copy_from_slice(lights);
        Ok(self)
    }

    /// Moves the spot light onto the eye, flashlight style.
    pub fn attach_spot_to_camera(&mut self, position: Vec3, front: Vec3) {
        self.spot.position = position;
        self.spot.direction = front;
    }

    pub fn validate(&self) -> Result<(), ShadingError> {
        self.spot.validate()
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            directional: DirectionalLight::default(),
            points: [
                PointLight::new(Vec3::new(0.7, 0.2, 2.0)),
                PointLight::new(Vec3::new(2.3, -3.3, -4.0)),
                PointLight::new(Vec3::new(-4.0, 2.0, -12.0)),
                PointLight::new(Vec3::new(0.0, 0.0, -3.0)),
            ],
            spot: SpotLight::default(),
        }
    }
}

/// Texture references of a texture-modulated material.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialTextures {
    pub diffuse: Option<TextureHandle>,
    pub specular: Option<TextureHandle>,
    /// Falls back to the diffuse texture when unset.
    pub ambient: Option<TextureHandle>,
    pub emission: Option<TextureHandle>,
    /// Tangent-space normal map, encoded as `n * 0.5 + 0.5`.
    pub normal: Option<TextureHandle>,
}

impl MaterialTextures {
    fn handles(&self) -> impl Iterator<Item = TextureHandle> {
        [
            self.diffuse,
            self.specular,
            self.ambient,
            self.emission,
            self.normal,
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub opacity: f32,
    /// Selects texture-modulated evaluation over flat colors.
    pub use_textures: bool,
    pub textures: MaterialTextures,
}

impl Material {
    pub fn flat(color: Vec3) -> Self {
        Self {
            ambient: color,
            diffuse: color,
            specular: Vec3::splat(0.5),
            ..Self::default()
        }
    }

    /// Colors used when the mesh is drawn as wireframe.
    pub fn wireframe_override(&self) -> Self {
        Self {
            ambient: Vec3::ZERO,
            diffuse: Vec3::ZERO,
            ..*self
        }
    }

    /// Checks that every referenced texture exists in `table`.
    pub fn validate(&self, table: &TextureTable) -> Result<(), ShadingError> {
        if !self.use_textures {
            return Ok(());
        }
        match self.textures.handles().find(|handle| !table.contains(*handle)) {
            Some(missing) => Err(ShadingError::MissingTexture(missing.0)),
            None => Ok(()),
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec3::ONE,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            shininess: 32.0,
            opacity: 1.0,
            use_textures: false,
            textures: MaterialTextures::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transforms {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    /// Precomputed `transpose(inverse(mat3(model)))`; derived per vertex
    /// when unset.
    pub normal_matrix: Option<Mat3>,
}

impl Transforms {
    pub fn new(model: Mat4, view: Mat4, projection: Mat4) -> Self {
        Self {
            model,
            view,
            projection,
            normal_matrix: None,
        }
    }

    pub fn with_normal_matrix(mut self) -> Self {
        self.normal_matrix = if self.model.determinant().abs() > f32::EPSILON {
            Some(normal_matrix(self.model))
        } else {
            None
        };
        self
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Grid unprojection needs both camera matrices to be invertible.
    pub fn validate_invertible(&self) -> Result<(), ShadingError> {
        if self.view.determinant() == 0.0 {
            return Err(ShadingError::SingularMatrix("view"));
        }
        if self.projection.determinant() == 0.0 {
            return Err(ShadingError::SingularMatrix("projection"));
        }
        Ok(())
    }
}

impl Default for Transforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// `mat3(transpose(inverse(model)))`.
pub fn normal_matrix(model: Mat4) -> Mat3 {
    Mat3::from_mat4(model.inverse().transpose())
}

/// Look of the procedural grid lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridStyle {
    /// Half-width of the highlighted axes, in world units.
    pub line_width: f32,
    pub line_opacity: f32,
    pub line_color: Vec3,
    /// Tint of the line along the x axis (where `z == 0`).
    pub x_axis_color: Vec3,
    /// Tint of the line along the z axis (where `x == 0`).
    pub z_axis_color: Vec3,
    /// Scales of the blended grid levels; each level draws one line per
    /// `1 / scale` world units.
    pub scales: [f32; 2],
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            line_width: 0.1,
            line_opacity: 1.0,
            line_color: Vec3::splat(0.2),
            x_axis_color: Vec3::X,
            z_axis_color: Vec3::Z,
            scales: [5.0, 0.5],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    pub near: f32,
    pub far: f32,
    pub style: GridStyle,
    pub depth: DepthConvention,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            near: 0.01,
            far: 200.0,
            style: GridStyle::default(),
            depth: DepthConvention::OPENGL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::Texture2D;
    use glam::Vec4;

    #[test]
    fn unit_constant_attenuation_is_exactly_one() {
        for distance in [0.0, 0.5, 3.0, 1000.0] {
            assert_eq!(Attenuation::NONE.factor(distance), 1.0);
        }
    }

    #[test]
    fn quadratic_term_scales_twice_the_distance() {
        let attenuation = Attenuation {
            constant: 0.0,
            linear: 0.0,
            quadratic: 1.0,
        };
        assert!((attenuation.factor(4.0) - 1.0 / 8.0).abs() < 1e-7);
    }

    #[test]
    fn default_rig_has_four_lit_points_and_valid_spot() {
        let rig = LightRig::default();
        assert!(rig.points.iter().all(|p| p.colors.diffuse == Vec3::splat(0.7)));
        assert!(rig.validate().is_ok());
    }

    #[test]
    fn point_lights_are_padded_with_sentinels() {
        let rig = LightRig::default()
            .with_point_lights(&[PointLight::new(Vec3::ONE)])
            .unwrap();
        assert_eq!(rig.points[0].position, Vec3::ONE);
        assert_eq!(rig.points[3], PointLight::disabled());
    }

    #[test]
    fn fifth_point_light_is_rejected() {
        let lights = [PointLight::new(Vec3::ZERO); 5];
        assert_eq!(
            LightRig::default().with_point_lights(&lights).unwrap_err(),
            ShadingError::TooManyPointLights { count: 5, max: 4 }
        );
    }

    #[test]
    fn equal_cutoffs_are_rejected() {
        let spot = SpotLight::from_degrees(Vec3::ZERO, Vec3::NEG_Z, 15.0, 15.0);
        assert!(matches!(
            spot.validate(),
            Err(ShadingError::InvalidSpotCone { .. })
        ));
    }

    #[test]
    fn normal_matrix_is_skipped_for_singular_models() {
        let transforms =
            Transforms::new(Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0)), Mat4::IDENTITY, Mat4::IDENTITY)
                .with_normal_matrix();
        assert!(transforms.normal_matrix.is_none());
        let transforms = Transforms::default().with_normal_matrix();
        assert_eq!(transforms.normal_matrix, Some(Mat3::IDENTITY));
    }

    #[test]
    fn material_reports_dangling_textures() {
        let mut table = TextureTable::new();
        let diffuse = table.insert(Texture2D::solid(Vec4::ONE));
        let mut material = Material {
            use_textures: true,
            ..Material::default()
        };
        material.textures.diffuse = Some(diffuse);
        assert!(material.validate(&table).is_ok());
        material.textures.specular = Some(TextureHandle(7));
        assert_eq!(
            material.validate(&table).unwrap_err(),
            ShadingError::MissingTexture(7)
        );
    }

    #[test]
    fn wireframe_keeps_specular() {
        let material = Material::flat(Vec3::ONE).wireframe_override();
        assert_eq!(material.diffuse, Vec3::ZERO);
        assert_eq!(material.specular, Vec3::splat(0.5));
    }
}
