//! Multi-light Blinn-Phong shading and an infinite anti-aliased reference
//! grid.
//!
//! The shading kernels are plain functions over per-draw parameter
//! blocks, so they run unchanged inside the CPU rasterizer in
//! [`render::cpu`] and mirror the WGSL programs driven by
//! [`render::gpu`]. Scenes are described in XML and loaded by
//! [`scene::Scene`].

pub mod depth;
pub mod error;
pub mod grid;
pub mod lighting;
pub mod logging;
pub mod obj;
pub mod params;
pub mod render;
pub mod scene;
pub mod texture;
pub mod vertex;

pub use depth::{ClipDepth, DepthConvention, DepthRange};
pub use error::ShadingError;
pub use grid::{shade_grid, GridCamera, GridFragment, GroundHit};
pub use lighting::{LightingAccumulator, SpecularModel};
pub use logging::{init_logging, LoggingConfig};
pub use obj::{load_obj, load_obj_from_str, Mesh};
pub use params::{
    DirectionalLight, GridParams, GridStyle, LightColors, LightRig, Material, PointLight,
    SpotLight, Transforms, POINT_LIGHT_COUNT,
};
pub use render::{CpuRenderer, Framebuffer, CLEAR_COLOR};
pub use scene::{Scene, SceneObject};
pub use texture::{SharedTextures, Texture2D, TextureHandle, TextureTable};
pub use vertex::{transform_vertex, Vertex};
