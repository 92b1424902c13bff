use serde::{Deserialize, Serialize};

/// Range of normalized device depth produced by the projection matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipDepth {
    /// OpenGL: near plane at -1, far plane at +1.
    NegOneToOne,
    /// Vulkan, Metal, D3D and wgpu: near plane at 0, far plane at 1.
    ZeroToOne,
}

/// Depth-range registers of the viewport (`glDepthRange`, `minDepth`/`maxDepth`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthRange {
    pub near: f32,
    pub far: f32,
}

impl DepthRange {
    pub const UNIT: DepthRange = DepthRange {
        near: 0.0,
        far: 1.0,
    };

    pub fn diff(&self) -> f32 {
        self.far - self.near
    }

    /// Clamps a window-space depth into the range, as fixed-function
    /// hardware does for shader-written depth.
    pub fn clamp(&self, depth: f32) -> f32 {
        depth.clamp(self.near.min(self.far), self.near.max(self.far))
    }
}

impl Default for DepthRange {
    fn default() -> Self {
        Self::UNIT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthConvention {
    pub clip: ClipDepth,
    pub range: DepthRange,
}

impl DepthConvention {
    pub const OPENGL: DepthConvention = DepthConvention {
        clip: ClipDepth::NegOneToOne,
        range: DepthRange::UNIT,
    };

    pub const WGPU: DepthConvention = DepthConvention {
        clip: ClipDepth::ZeroToOne,
        range: DepthRange::UNIT,
    };

    /// Converts normalized device depth into the depth-buffer encoding.
    pub fn window_depth(&self, ndc_depth: f32) -> f32 {
        match self.clip {
            ClipDepth::NegOneToOne => {
                (self.range.diff() * ndc_depth + self.range.near + self.range.far) / 2.0
            }
            ClipDepth::ZeroToOne => self.range.near + self.range.diff() * ndc_depth,
        }
    }

    pub fn symmetric_ndc(&self, ndc_depth: f32) -> f32 {
        match self.clip {
            ClipDepth::NegOneToOne => ndc_depth,
            ClipDepth::ZeroToOne => ndc_depth * 2.0 - 1.0,
        }
    }

    /// Signed distance of a clip-space point to the near clipping plane;
    /// the point is inside when this is non-negative.
    pub fn near_plane_distance(&self, z: f32, w: f32) -> f32 {
        match self.clip {
            ClipDepth::NegOneToOne => z + w,
            ClipDepth::ZeroToOne => z,
        }
    }
}

impl Default for DepthConvention {
    fn default() -> Self {
        Self::OPENGL
    }
}

/// Linear eye distance, divided by `far`, for a symmetric NDC depth.
///
/// Returns `near / far` on the near plane and `1.0` on the far plane.
pub fn linearize_depth(symmetric_ndc: f32, near: f32, far: f32) -> f32 {
    let linear = (2.0 * near * far) / (far + near - symmetric_ndc * (far - near));
    linear / far
}

/// Alpha multiplier that fades the grid out before half the depth range.
pub fn distance_fade(linear_depth: f32) -> f32 {
    (0.5 - linear_depth).max(0.0)
}
