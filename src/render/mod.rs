pub mod cpu;
pub mod framebuffer;
pub mod gpu;
pub mod raster;
pub mod shaders;
pub mod uniforms;

pub use cpu::{CpuRenderer, GridStage, LightingStage, CLEAR_COLOR};
pub use framebuffer::Framebuffer;
pub use gpu::{request_headless_device, DepthBuffer, GpuMesh, GpuPipelines, GpuTexture, UniformBinding};
pub use raster::{
    coarse_fwidth, ClipVertex, DrawStats, Fragment, FragmentStage, Interpolate, PolygonMode, Rasterizer,
};
pub use uniforms::{GridUniform, LightingGlobals, ObjectUniform};
