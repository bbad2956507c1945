use std::sync::Arc;

use crate::foundation::core::Dimensions;
use crate::foundation::error::{CompositorError, CompositorResult};

pub mod decode;
pub mod loader;

/// Decoded raster image, immutable once built.
///
/// Pixels are premultiplied RGBA8, row-major and tightly packed. Clones share the pixel storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    rgba8_premul: Arc<Vec<u8>>,
}

impl Bitmap {
    /// Build from premultiplied RGBA8 bytes.
    pub fn from_premul_rgba8(
        width: u32,
        height: u32,
        rgba8_premul: Vec<u8>,
    ) -> CompositorResult<Self> {
        let expected = Dimensions::new(width, height)
            .rgba8_len()
            .ok_or_else(|| CompositorError::invalid_source("bitmap size overflow"))?;
        if width == 0 || height == 0 {
            return Err(CompositorError::invalid_source(
                "bitmap width/height must be non-zero",
            ));
        }
        if rgba8_premul.len() != expected {
            return Err(CompositorError::invalid_source(format!(
                "bitmap expects {expected} bytes for {width}x{height}, got {}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Build from straight-alpha RGBA8 bytes (the layout produced by image decoders).
    pub fn from_straight_rgba8(
        width: u32,
        height: u32,
        mut rgba: Vec<u8>,
    ) -> CompositorResult<Self> {
        decode::premultiply_rgba8_in_place(&mut rgba);
        Self::from_premul_rgba8(width, height, rgba)
    }

    pub fn from_rgba_image(img: image::RgbaImage) -> CompositorResult<Self> {
        let (width, height) = img.dimensions();
        Self::from_straight_rgba8(width, height, img.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn premul_bytes(&self) -> &[u8] {
        &self.rgba8_premul
    }

    /// Premultiplied pixel at `(x, y)`. Callers keep coordinates in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let p = &self.rgba8_premul[i..i + 4];
        [p[0], p[1], p[2], p[3]]
    }

    /// Horizontally flipped copy, as shown by a selfie camera preview.
    pub fn mirrored(&self) -> Self {
        let row_len = (self.width as usize) * 4;
        let mut out = Vec::with_capacity(self.rgba8_premul.len());
        for row in self.rgba8_premul.chunks_exact(row_len) {
            for px in row.chunks_exact(4).rev() {
                out.extend_from_slice(px);
            }
        }
        Self {
            width: self.width,
            height: self.height,
            rgba8_premul: Arc::new(out),
        }
    }

    /// Straight-alpha copy suitable for encoders.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut raw = self.rgba8_premul.as_ref().clone();
        decode::unpremultiply_rgba8_in_place(&mut raw);
        image::RgbaImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }
}
