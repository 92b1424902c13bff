use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::params::{normal_matrix, Transforms};

/// Model-space vertex attributes, in attribute-slot order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, tex_coords: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coords,
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
        }
    }
}

/// Values interpolated across a triangle and consumed by the lighting
/// accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceVaryings {
    pub world_position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
    /// Tangent-to-world basis: columns are tangent, bitangent, normal.
    pub tbn: Mat3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexOutput {
    pub clip_position: Vec4,
    pub varyings: SurfaceVaryings,
}

/// Runs the vertex stage for one vertex.
pub fn transform_vertex(vertex: &Vertex, transforms: &Transforms) -> VertexOutput {
    let world = transforms.model * vertex.position.extend(1.0);
    let clip_position = transforms.projection * transforms.view * world;

    let normal_matrix = transforms
        .normal_matrix
        .unwrap_or_else(|| normal_matrix(transforms.model));
    let normal = normal_matrix * vertex.normal;

    let model3 = Mat3::from_mat4(transforms.model);
    let tangent = (model3 * vertex.tangent).normalize_or_zero();
    let bitangent = (model3 * vertex.bitangent).normalize_or_zero();
    let tbn = Mat3::from_cols(tangent, bitangent, normal.normalize_or_zero());

    VertexOutput {
        clip_position,
        varyings: SurfaceVaryings {
            world_position: world.truncate(),
            normal,
            tex_coords: vertex.tex_coords,
            tbn,
        },
    }
}

/// Fills tangents and bitangents of an indexed triangle list from its
/// texture coordinates.
pub fn compute_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    let mut tangents = vec![Vec3::ZERO; vertices.len()];
    let mut bitangents = vec![Vec3::ZERO; vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let (v0, v1, v2) = (&vertices[i0], &vertices[i1], &vertices[i2]);
        let edge1 = v1.position - v0.position;
        let edge2 = v2.position - v0.position;
        let duv1 = v1.tex_coords - v0.tex_coords;
        let duv2 = v2.tex_coords - v0.tex_coords;

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
        let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;
        for i in [i0, i1, i2] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
        }
    }

    for (i, vertex) in vertices.iter_mut().enumerate() {
        let normal = vertex.normal.normalize_or_zero();
        // Gram-Schmidt against the shading normal
        let mut tangent = (tangents[i] - normal * normal.dot(tangents[i])).normalize_or_zero();
        if tangent == Vec3::ZERO {
            tangent = normal.any_orthonormal_vector();
        }
        let mut bitangent = normal.cross(tangent);
        if bitangent.dot(bitangents[i]) < 0.0 {
            bitangent = -bitangent;
        }
        vertex.tangent = tangent;
        vertex.bitangent = bitangent;
    }
}
