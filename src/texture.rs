use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Vec2, Vec4};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

use crate::error::ShadingError;

/// Upper bound on the layers a host may fold into one material channel.
pub const MAX_LAYERS_PER_CHANNEL: usize = 16;

/// Index of a texture inside a [`TextureTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u32);

/// Two-dimensional RGBA image sampled with bilinear filtering and
/// repeat wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2D {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

impl Texture2D {
    /// Creates a single-texel texture.
    pub fn solid(color: Vec4) -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![color],
        }
    }

    /// Builds a texture from tightly packed 8-bit RGBA rows, top row first.
    pub fn from_rgba8(width: u32, height: u32, data: &[u8]) -> Result<Self, ShadingError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected || expected == 0 {
            return Err(ShadingError::TextureDataSize {
                expected,
                found: data.len(),
            });
        }
        let texels = data
            .chunks_exact(4)
            .map(|px| {
                Vec4::new(
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                    px[3] as f32 / 255.0,
                )
            })
            .collect();
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    pub fn from_image(image: &image::DynamicImage) -> Result<Self, ShadingError> {
        let rgba = image.to_rgba8();
        Self::from_rgba8(rgba.width(), rgba.height(), rgba.as_raw())
    }

    /// Decodes an image file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("failed to decode texture {}", path.display()))?;
        Ok(Self::from_image(&image)?)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Texel data converted back to 8-bit RGBA.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.texels
            .iter()
            .flat_map(|texel| {
                texel
                    .clamp(Vec4::ZERO, Vec4::ONE)
                    .to_array()
                    .map(|c| (c * 255.0).round() as u8)
            })
            .collect()
    }

    fn texel(&self, x: i64, y: i64) -> Vec4 {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        self.texels[y * self.width as usize + x]
    }

    /// Bilinear sample with repeat wrapping. `uv = (0, 0)` addresses the
    /// first texel row.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let x = wrap_coordinate(uv.x) * self.width as f32 - 0.5;
        let y = wrap_coordinate(uv.y) * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), fx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }
}

// Non-finite coordinates address texel (0, 0).
fn wrap_coordinate(value: f32) -> f32 {
    if value.is_finite() {
        value.rem_euclid(1.0)
    } else {
        0.0
    }
}

/// Folds up to [`MAX_LAYERS_PER_CHANNEL`] equally sized layers into one
/// texture by clamped addition.
pub fn accumulate_layers(layers: &[Texture2D]) -> Result<Texture2D, ShadingError> {
    let Some(first) = layers.first() else {
        return Err(ShadingError::NoLayers);
    };
    if layers.len() > MAX_LAYERS_PER_CHANNEL {
        return Err(ShadingError::TooManyLayers {
            count: layers.len(),
            max: MAX_LAYERS_PER_CHANNEL,
        });
    }
    let expected = (first.width, first.height);
    let mut texels = vec![Vec4::ZERO; first.texels.len()];
    for layer in layers {
        let found = (layer.width, layer.height);
        if found != expected {
            return Err(ShadingError::LayerSizeMismatch { expected, found });
        }
        for (sum, texel) in texels.iter_mut().zip(&layer.texels) {
            *sum += *texel;
        }
    }
    for texel in &mut texels {
        *texel = texel.clamp(Vec4::ZERO, Vec4::ONE);
    }
    Ok(Texture2D {
        width: expected.0,
        height: expected.1,
        texels,
    })
}

/// Indexable, growable set of textures referenced by materials.
#[derive(Debug, Clone, Default)]
pub struct TextureTable {
    textures: Vec<Texture2D>,
}

impl TextureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, texture: Texture2D) -> TextureHandle {
        self.textures.push(texture);
        TextureHandle((self.textures.len() - 1) as u32)
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&Texture2D> {
        self.textures.get(handle.0 as usize)
    }

    pub fn contains(&self, handle: TextureHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Samples the referenced texture; unknown handles read as white so
    /// the kernel stays branch-light.
    pub fn sample(&self, handle: TextureHandle, uv: Vec2) -> Vec4 {
        self.get(handle)
            .map(|texture| texture.sample(uv))
            .unwrap_or(Vec4::ONE)
    }
}

/// Texture table shared between the host and in-flight draws.
///
/// The host mutates it between submissions; every draw holds a read guard
/// for its whole duration.
#[derive(Debug, Default)]
pub struct SharedTextures {
    table: Arc<RwLock<TextureTable>>,
}

impl Clone for SharedTextures {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl SharedTextures {
    pub fn new(table: TextureTable) -> Self {
        Self {
            table: Arc::new(RwLock::new(table)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, TextureTable> {
        self.table.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, TextureTable> {
        self.table.write()
    }

    pub fn insert(&self, texture: Texture2D) -> TextureHandle {
        self.table.write().insert(texture)
    }
}
