use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::depth::{distance_fade, linearize_depth};
use crate::params::{GridParams, GridStyle};

/// Two triangles covering the whole clip-space square.
pub const GRID_QUAD: [Vec3; 6] = [
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(-1.0, -1.0, 0.0),
    Vec3::new(-1.0, 1.0, 0.0),
    Vec3::new(-1.0, -1.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(1.0, -1.0, 0.0),
];

/// Camera matrices of the grid pass together with their inverses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCamera {
    pub view: Mat4,
    pub projection: Mat4,
    pub inverse_view: Mat4,
    pub inverse_projection: Mat4,
}

impl GridCamera {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self {
            view,
            projection,
            inverse_view: view.inverse(),
            inverse_projection: projection.inverse(),
        }
    }

    /// World-space point at clip-space position `(x, y, z)`.
    pub fn unproject(&self, point: Vec3) -> Vec3 {
        let unprojected = self.inverse_view * self.inverse_projection * point.extend(1.0);
        unprojected.truncate() / unprojected.w
    }

    /// Clip-space position of a world-space point.
    pub fn project(&self, point: Vec3) -> Vec4 {
        self.projection * self.view * point.extend(1.0)
    }
}

/// Ray endpoints interpolated across the grid quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridVaryings {
    pub near_point: Vec3,
    pub far_point: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridVertexOutput {
    pub clip_position: Vec4,
    pub varyings: GridVaryings,
}

/// Grid unprojection stage for one quad corner.
pub fn grid_vertex(camera: &GridCamera, corner: Vec3) -> GridVertexOutput {
    GridVertexOutput {
        // depth is irrelevant here: the fragment stage writes its own
        clip_position: Vec4::new(corner.x, corner.y, 0.0, 1.0),
        varyings: GridVaryings {
            near_point: camera.unproject(Vec3::new(corner.x, corner.y, 0.0)),
            far_point: camera.unproject(Vec3::new(corner.x, corner.y, 1.0)),
        },
    }
}

/// Intersection of a fragment's ray with the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    /// Ray parameter; the plane is in front of the camera when positive.
    pub t: f32,
    pub position: Vec3,
}

impl GroundHit {
    pub fn from_ray(varyings: &GridVaryings) -> Self {
        let GridVaryings {
            near_point,
            far_point,
        } = *varyings;
        let t = -near_point.y / (far_point.y - near_point.y);
        Self {
            t,
            position: near_point + t * (far_point - near_point),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.t > 0.0
    }
}

fn fract(value: Vec2) -> Vec2 {
    value - value.floor()
}

/// One level of the procedural line pattern.
///
/// `footprint` is `fwidth(position.xz)`, the screen-space change of the
/// hit point across one pixel.
pub fn grid_pattern(position: Vec3, scale: f32, footprint: Vec2, style: &GridStyle) -> Vec4 {
    let coord = Vec2::new(position.x, position.z) * scale;
    let derivative = footprint * scale.abs();
    let cell = (fract(coord - 0.5) - 0.5).abs() / derivative.max(Vec2::splat(f32::MIN_POSITIVE));
    let line = cell.x.min(cell.y);

    let mut color = style.line_color;
    if position.x.abs() < style.line_width * derivative.x.min(1.0) {
        color = color.max(style.z_axis_color);
    }
    if position.z.abs() < style.line_width * derivative.y.min(1.0) {
        color = color.max(style.x_axis_color);
    }
    color.extend(style.line_opacity * (1.0 - line.min(1.0)))
}

/// Color and explicit depth of a grid fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridFragment {
    pub color: Vec4,
    pub depth: f32,
    /// Linear depth in `[near / far, 1]` used for the fade.
    pub linear_depth: f32,
}

/// Grid fragment kernel.
pub fn shade_grid(
    hit: &GroundHit,
    footprint: Vec2,
    camera: &GridCamera,
    params: &GridParams,
) -> GridFragment {
    let clip = camera.project(hit.position);
    let ndc_depth = clip.z / clip.w;
    let depth = params.depth.window_depth(ndc_depth);
    let linear_depth = linearize_depth(params.depth.symmetric_ndc(ndc_depth), params.near, params.far);

    let mut color = params
        .style
        .scales
        .iter()
        .map(|&scale| grid_pattern(hit.position, scale, footprint, &params.style))
        .fold(Vec4::ZERO, |sum, level| sum + level);

    let mask = if hit.is_visible() { 1.0 } else { 0.0 };
    color *= mask;
    color.w *= distance_fade(linear_depth);

    GridFragment {
        color,
        depth,
        linear_depth,
    }
}
