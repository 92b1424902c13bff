use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::params::{LightColors, LightRig, Material, PointLight, SpotLight};
use crate::texture::{TextureHandle, TextureTable};
use crate::vertex::SurfaceVaryings;

/// Highlight model used for the specular term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpecularModel {
    /// Half-vector highlights.
    #[default]
    BlinnPhong,
    /// Reflection-vector highlights.
    Phong,
}

/// Ambient, diffuse and specular parts of one light's contribution.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightContribution {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl LightContribution {
    pub fn total(&self) -> Vec3 {
        self.ambient + self.diffuse + self.specular
    }

    fn scaled(self, factor: f32) -> Self {
        Self {
            ambient: self.ambient * factor,
            diffuse: self.diffuse * factor,
            specular: self.specular * factor,
        }
    }
}

/// Material channels resolved for one fragment: the material colors,
/// multiplied by their texture samples when the material is textured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceChannels {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub emission: Vec3,
    pub shininess: f32,
}

impl SurfaceChannels {
    pub fn resolve(material: &Material, textures: &TextureTable, uv: Vec2) -> Self {
        if !material.use_textures {
            return Self {
                ambient: material.ambient,
                diffuse: material.diffuse,
                specular: material.specular,
                emission: Vec3::ZERO,
                shininess: material.shininess,
            };
        }

        let maps = &material.textures;
        let sample = |handle: Option<TextureHandle>| {
            handle
                .map(|handle| textures.sample(handle, uv).truncate())
                .unwrap_or(Vec3::ONE)
        };
        let diffuse = sample(maps.diffuse);
        let ambient = match maps.ambient {
            Some(_) => sample(maps.ambient),
            None => diffuse,
        };
        let emission = match maps.emission {
            Some(_) => sample(maps.emission),
            None => Vec3::ZERO,
        };
        Self {
            ambient: ambient * material.ambient,
            diffuse: diffuse * material.diffuse,
            specular: sample(maps.specular) * material.specular,
            emission,
            shininess: material.shininess,
        }
    }
}

/// Unit shading normal and view direction of a fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingFrame {
    pub position: Vec3,
    pub normal: Vec3,
    pub view_dir: Vec3,
}

impl ShadingFrame {
    /// Normalizes the interpolated normal, applies the material's normal
    /// map if any, and derives the view direction.
    pub fn new(
        varyings: &SurfaceVaryings,
        material: &Material,
        textures: &TextureTable,
        view_pos: Vec3,
    ) -> Self {
        let mut normal = varyings.normal.normalize_or_zero();
        if let (true, Some(map)) = (material.use_textures, material.textures.normal) {
            let encoded = textures.sample(map, varyings.tex_coords).truncate();
            let tangent_space = encoded * 2.0 - Vec3::ONE;
            let perturbed = (varyings.tbn * tangent_space).normalize_or_zero();
            if perturbed != Vec3::ZERO {
                normal = perturbed;
            }
        }
        Self {
            position: varyings.world_position,
            normal,
            view_dir: (view_pos - varyings.world_position).normalize_or_zero(),
        }
    }
}

fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

/// Specular geometric term for a unit light direction.
pub fn specular_term(model: SpecularModel, frame: &ShadingFrame, light_dir: Vec3, shininess: f32) -> f32 {
    match model {
        SpecularModel::BlinnPhong => {
            let halfway = (light_dir + frame.view_dir).normalize_or_zero();
            frame.normal.dot(halfway).max(0.0).powf(shininess)
        }
        SpecularModel::Phong => {
            let reflected = reflect(-light_dir, frame.normal);
            frame.view_dir.dot(reflected).max(0.0).powf(shininess)
        }
    }
}

/// Shared per-light evaluation for a unit light direction.
pub fn evaluate(
    model: SpecularModel,
    colors: &LightColors,
    light_dir: Vec3,
    frame: &ShadingFrame,
    surface: &SurfaceChannels,
) -> LightContribution {
    let diff = light_dir.dot(frame.normal).max(0.0);
    let highlight = specular_term(model, frame, light_dir, surface.shininess);
    LightContribution {
        ambient: colors.ambient * surface.ambient,
        diffuse: colors.diffuse * diff * surface.diffuse,
        specular: colors.specular * highlight * surface.specular,
    }
}

/// Smooth spot-cone falloff for `theta = cos(angle to the cone axis)`.
///
/// `inner_cutoff` must be greater than `outer_cutoff`; see [`LightRig::validate`].
pub fn spot_cone_intensity(theta: f32, inner_cutoff: f32, outer_cutoff: f32) -> f32 {
    let epsilon = inner_cutoff - outer_cutoff;
    ((theta - outer_cutoff) / epsilon).clamp(0.0, 1.0)
}

/// Evaluates a [`LightRig`] for surface fragments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightingAccumulator {
    pub specular_model: SpecularModel,
}

impl LightingAccumulator {
    pub fn new(specular_model: SpecularModel) -> Self {
        Self { specular_model }
    }

    pub fn directional(
        &self,
        rig: &LightRig,
        frame: &ShadingFrame,
        surface: &SurfaceChannels,
    ) -> LightContribution {
        let light = &rig.directional;
        let light_dir = (-light.direction).normalize_or_zero();
        evaluate(self.specular_model, &light.colors, light_dir, frame, surface)
    }

    pub fn point(
        &self,
        light: &PointLight,
        frame: &ShadingFrame,
        surface: &SurfaceChannels,
    ) -> LightContribution {
        let to_light = light.position - frame.position;
        let light_dir = to_light.normalize_or_zero();
        let attenuation = light.attenuation.factor(to_light.length());
        evaluate(self.specular_model, &light.colors, light_dir, frame, surface).scaled(attenuation)
    }

    pub fn spot(
        &self,
        light: &SpotLight,
        frame: &ShadingFrame,
        surface: &SurfaceChannels,
    ) -> LightContribution {
        let to_light = light.position - frame.position;
        let light_dir = to_light.normalize_or_zero();
        let attenuation = light.attenuation.factor(to_light.length());
        let theta = light_dir.dot((-light.direction).normalize_or_zero());
        let intensity = spot_cone_intensity(theta, light.inner_cutoff, light.outer_cutoff);

        let mut contribution =
            evaluate(self.specular_model, &light.colors, light_dir, frame, surface).scaled(attenuation);
        contribution.diffuse *= intensity;
        contribution.specular *= intensity;
        contribution
    }

    /// Sum of every light in the rig, before emission.
    pub fn accumulate(
        &self,
        rig: &LightRig,
        frame: &ShadingFrame,
        surface: &SurfaceChannels,
    ) -> Vec3 {
        let mut color = self.directional(rig, frame, surface).total();
        for light in &rig.points {
            color += self.point(light, frame, surface).total();
        }
        color + self.spot(&rig.spot, frame, surface).total()
    }

    /// Full fragment kernel: RGB from the rig plus emission, alpha from
    /// the material opacity.
    pub fn shade(
        &self,
        varyings: &SurfaceVaryings,
        material: &Material,
        rig: &LightRig,
        view_pos: Vec3,
        textures: &TextureTable,
    ) -> Vec4 {
        let frame = ShadingFrame::new(varyings, material, textures, view_pos);
        let surface = SurfaceChannels::resolve(material, textures, varyings.tex_coords);
        let color = self.accumulate(rig, &frame, &surface) + surface.emission;
        color.extend(material.opacity)
    }
}
