use crate::assets::Bitmap;
use crate::foundation::core::{Dimensions, Region};
use crate::foundation::error::CompositorResult;
use crate::render::composite::{over, sample_bilinear};

/// Destination rectangle of a draw, in canvas pixels. May extend past the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer clip rectangle `[x, x + width) x [y, y + height)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ClipRect {
    /// Clip box of a region, matching `rect(min_x, min_y, max_x - min_x, max_y - min_y)`.
    pub fn from_region(r: Region) -> Self {
        Self {
            x: r.min_x,
            y: r.min_y,
            width: r.width(),
            height: r.height(),
        }
    }
}

/// Premultiplied RGBA8 raster that images are drawn onto.
///
/// Plays the role of a 2D canvas: resizing clears it, draws composite with source-over, and
/// every draw can be clipped to a rectangle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    rgba8_premul: Vec<u8>,
}

impl Surface {
    pub fn new(dims: Dimensions) -> Self {
        let mut s = Self {
            width: 0,
            height: 0,
            rgba8_premul: Vec::new(),
        };
        s.resize(dims);
        s
    }

    /// Resize to `dims`. Contents are cleared to transparent, even when the size is unchanged.
    pub fn resize(&mut self, dims: Dimensions) {
        self.width = dims.width;
        self.height = dims.height;
        let len = dims.rgba8_len().unwrap_or(0);
        self.rgba8_premul.clear();
        self.rgba8_premul.resize(len, 0);
    }

    pub fn clear(&mut self) {
        self.rgba8_premul.fill(0);
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        let p = &self.rgba8_premul[i..i + 4];
        [p[0], p[1], p[2], p[3]]
    }

    pub fn premul_bytes(&self) -> &[u8] {
        &self.rgba8_premul
    }

    /// Give up the pixel storage, e.g. to move it into a worker request.
    pub fn into_pixel_buffer(self) -> Vec<u8> {
        self.rgba8_premul
    }

    /// Immutable snapshot of the current contents.
    pub fn snapshot(&self) -> CompositorResult<Bitmap> {
        Bitmap::from_premul_rgba8(self.width, self.height, self.rgba8_premul.clone())
    }

    /// Stretch `src` over `dest`, optionally clipped, compositing source-over.
    ///
    /// A canvas pixel is covered when its center lies inside `dest`; its color is sampled
    /// bilinearly from the matching source position.
    pub fn draw_image(&mut self, src: &Bitmap, dest: DrawRect, clip: Option<ClipRect>) {
        if self.is_empty() || !(dest.width > 0.0 && dest.height > 0.0) {
            return;
        }

        let (mut x0, mut y0, mut x1, mut y1) = (0u32, 0u32, self.width, self.height);
        if let Some(c) = clip {
            x0 = x0.max(c.x);
            y0 = y0.max(c.y);
            x1 = x1.min(c.x.saturating_add(c.width));
            y1 = y1.min(c.y.saturating_add(c.height));
        }
        x0 = x0.max(to_pixel_floor(dest.x));
        y0 = y0.max(to_pixel_floor(dest.y));
        x1 = x1.min(to_pixel_ceil(dest.x + dest.width));
        y1 = y1.min(to_pixel_ceil(dest.y + dest.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let scale_x = f64::from(src.width()) / dest.width;
        let scale_y = f64::from(src.height()) / dest.height;

        for py in y0..y1 {
            let cy = f64::from(py) + 0.5;
            if cy < dest.y || cy >= dest.y + dest.height {
                continue;
            }
            let v = (cy - dest.y) * scale_y - 0.5;
            for px in x0..x1 {
                let cx = f64::from(px) + 0.5;
                if cx < dest.x || cx >= dest.x + dest.width {
                    continue;
                }
                let u = (cx - dest.x) * scale_x - 0.5;
                let s = sample_bilinear(src, u, v);
                let i = self.index(px, py);
                let d = &mut self.rgba8_premul[i..i + 4];
                let out = over([d[0], d[1], d[2], d[3]], s);
                d.copy_from_slice(&out);
            }
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }
}

fn to_pixel_floor(v: f64) -> u32 {
    v.floor().max(0.0).min(f64::from(u32::MAX)) as u32
}

fn to_pixel_ceil(v: f64) -> u32 {
    v.ceil().max(0.0).min(f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> Bitmap {
        Bitmap::from_premul_rgba8(w, h, px.repeat((w * h) as usize)).unwrap()
    }

    #[test]
    fn resize_clears_contents() {
        let mut s = Surface::new(Dimensions::new(4, 4));
        s.draw_image(
            &solid(1, 1, [255, 0, 0, 255]),
            DrawRect {
                x: 0.0,
                y: 0.0,
                width: 4.0,
                height: 4.0,
            },
            None,
        );
        assert_eq!(s.pixel(2, 2), [255, 0, 0, 255]);
        s.resize(Dimensions::new(4, 4));
        assert!(s.premul_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn unscaled_draw_copies_pixels() {
        let src = Bitmap::from_premul_rgba8(
            2,
            2,
            vec![
                1, 2, 3, 255, 4, 5, 6, 255, //
                7, 8, 9, 255, 10, 11, 12, 255,
            ],
        )
        .unwrap();
        let mut s = Surface::new(Dimensions::new(2, 2));
        s.draw_image(
            &src,
            DrawRect {
                x: 0.0,
                y: 0.0,
                width: 2.0,
                height: 2.0,
            },
            None,
        );
        assert_eq!(s.snapshot().unwrap(), src);
    }

    #[test]
    fn clip_limits_the_draw() {
        let mut s = Surface::new(Dimensions::new(10, 10));
        s.draw_image(
            &solid(4, 4, [0, 255, 0, 255]),
            DrawRect {
                x: -5.0,
                y: -5.0,
                width: 20.0,
                height: 20.0,
            },
            Some(ClipRect {
                x: 2,
                y: 3,
                width: 4,
                height: 5,
            }),
        );
        for y in 0..10 {
            for x in 0..10 {
                let inside = (2..6).contains(&x) && (3..8).contains(&y);
                let a = s.pixel(x, y)[3];
                assert_eq!(a == 255, inside, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn draw_outside_canvas_is_ignored() {
        let mut s = Surface::new(Dimensions::new(4, 4));
        s.draw_image(
            &solid(1, 1, [9, 9, 9, 255]),
            DrawRect {
                x: 10.0,
                y: 10.0,
                width: 5.0,
                height: 5.0,
            },
            None,
        );
        assert!(s.premul_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn into_pixel_buffer_moves_storage() {
        let s = Surface::new(Dimensions::new(3, 2));
        assert_eq!(s.into_pixel_buffer().len(), 3 * 2 * 4);
    }
}
