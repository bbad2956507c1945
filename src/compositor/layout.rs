use crate::foundation::core::{Dimensions, Region};
use crate::render::surface::DrawRect;

/// Where to draw an image of size `img` so it covers `region`.
///
/// The image is scaled uniformly by `max(rw / iw, rh / ih)`, centered horizontally and anchored to
/// the region's top edge. Overflow is left to the caller's clip.
pub fn cover_placement(region: Region, img: Dimensions) -> DrawRect {
    let rw = f64::from(region.width());
    let rh = f64::from(region.height());
    let iw = f64::from(img.width);
    let ih = f64::from(img.height);

    let scale = (rw / iw).max(rh / ih);
    let width = iw * scale;
    let height = ih * scale;

    DrawRect {
        x: f64::from(region.min_x) + (rw - width) / 2.0,
        y: f64::from(region.min_y),
        width,
        height,
    }
}

/// Index of the content image shown in region `region_idx`; images repeat cyclically.
pub fn content_index(region_idx: usize, content_len: usize) -> Option<usize> {
    (content_len > 0).then(|| region_idx % content_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: u32, y: u32, w: u32, h: u32) -> Region {
        Region {
            min_x: x,
            min_y: y,
            max_x: x + w,
            max_y: y + h,
        }
    }

    #[test]
    fn square_into_square_fills_exactly() {
        let r = cover_placement(region(50, 50, 100, 100), Dimensions::new(200, 200));
        assert_eq!(
            r,
            DrawRect {
                x: 50.0,
                y: 50.0,
                width: 100.0,
                height: 100.0
            }
        );
    }

    #[test]
    fn wide_image_is_centered_horizontally() {
        let r = cover_placement(region(10, 20, 100, 100), Dimensions::new(400, 200));
        assert_eq!(r.height, 100.0);
        assert_eq!(r.width, 200.0);
        assert_eq!(r.x, 10.0 - 50.0);
        assert_eq!(r.y, 20.0);
    }

    #[test]
    fn tall_image_is_anchored_to_top() {
        let r = cover_placement(region(10, 20, 100, 50), Dimensions::new(100, 300));
        assert_eq!(r.width, 100.0);
        assert_eq!(r.height, 300.0);
        assert_eq!(r.x, 10.0);
        assert_eq!(r.y, 20.0);
    }

    #[test]
    fn content_cycles_through_images() {
        let picks: Vec<_> = (0..5).map(|i| content_index(i, 2)).collect();
        assert_eq!(picks, vec![Some(0), Some(1), Some(0), Some(1), Some(0)]);
        assert_eq!(content_index(3, 0), None);
    }
}
