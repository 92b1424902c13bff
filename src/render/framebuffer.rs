use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec4;
use image::RgbaImage;

use crate::error::ShadingError;

/// Color and depth planes written by the CPU rasterizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<Vec4>,
    depth: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Result<Self, ShadingError> {
        if width == 0 || height == 0 {
            return Err(ShadingError::EmptyFramebuffer);
        }
        let len = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            color: vec![Vec4::ZERO; len],
            depth: vec![1.0; len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: Vec4, depth: f32) {
        self.color.fill(color);
        self.depth.fill(depth);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn color_at(&self, x: u32, y: u32) -> Vec4 {
        self.color[self.index(x, y)]
    }

    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.depth[self.index(x, y)]
    }

    pub(crate) fn set_color(&mut self, x: u32, y: u32, color: Vec4) {
        let index = self.index(x, y);
        self.color[index] = color;
    }

    pub(crate) fn set_depth(&mut self, x: u32, y: u32, depth: f32) {
        let index = self.index(x, y);
        self.depth[index] = depth;
    }

    pub fn colors(&self) -> &[Vec4] {
        &self.color
    }

    /// Color plane clamped to `[0, 1]` and quantized to 8 bits.
    pub fn to_rgba8(&self) -> RgbaImage {
        let bytes = self
            .color
            .iter()
            .flat_map(|color| {
                color
                    .clamp(Vec4::ZERO, Vec4::ONE)
                    .to_array()
                    .map(|c| (c * 255.0).round() as u8)
            })
            .collect();
        // dimensions always match the plane length
        RgbaImage::from_raw(self.width, self.height, bytes).unwrap_or_default()
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.to_rgba8()
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}
