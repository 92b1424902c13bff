use thiserror::Error;

/// Contract violations detected at the host boundary, before a draw is
/// submitted. The kernels themselves never report errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShadingError {
    #[error("spot light inner cutoff ({inner}) must be greater than its outer cutoff ({outer})")]
    InvalidSpotCone { inner: f32, outer: f32 },
    #[error("at most {max} point lights are supported, got {count}")]
    TooManyPointLights { count: usize, max: usize },
    #[error("texture handle {0} is not present in the texture table")]
    MissingTexture(u32),
    #[error("texture layer is {found:?} but the channel is {expected:?}")]
    LayerSizeMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("at most {max} texture layers per channel, got {count}")]
    TooManyLayers { count: usize, max: usize },
    #[error("cannot accumulate an empty list of texture layers")]
    NoLayers,
    #[error("texture data holds {found} bytes, expected {expected}")]
    TextureDataSize { expected: usize, found: usize },
    #[error("framebuffer must have a non-zero area")]
    EmptyFramebuffer,
    #[error("{0} matrix is not invertible")]
    SingularMatrix(&'static str),
}
