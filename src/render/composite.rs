use crate::assets::Bitmap;

pub type PremulRgba8 = [u8; 4];

/// Source-over for premultiplied pixels.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(src[3]);

    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = add_sat_u8(src[i], mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Bilinear sample of `src` at continuous pixel coordinates, clamped to the edges.
///
/// Integer coordinates land exactly on pixel centers, so an unscaled draw copies pixels verbatim.
pub fn sample_bilinear(src: &Bitmap, u: f64, v: f64) -> PremulRgba8 {
    let max_x = f64::from(src.width() - 1);
    let max_y = f64::from(src.height() - 1);
    let u = u.clamp(0.0, max_x);
    let v = v.clamp(0.0, max_y);

    let x0 = u.floor() as u32;
    let y0 = v.floor() as u32;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let fx = u - f64::from(x0);
    let fy = v - f64::from(y0);

    if fx == 0.0 && fy == 0.0 {
        return src.pixel(x0, y0);
    }

    let p00 = src.pixel(x0, y0);
    let p10 = src.pixel(x1, y0);
    let p01 = src.pixel(x0, y1);
    let p11 = src.pixel(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bottom = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    // Interpolated color may not exceed interpolated alpha in premultiplied space.
    for c in 0..3 {
        out[c] = out[c].min(out[3]);
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        let src = [0, 0, 0, 0];
        assert_eq!(over(dst, src), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src), src);
    }

    #[test]
    fn over_dst_transparent_returns_src() {
        let dst = [0, 0, 0, 0];
        let src = [100, 110, 120, 200];
        assert_eq!(over(dst, src), src);
    }

    #[test]
    fn over_half_alpha_blends() {
        let dst = [0, 0, 200, 255];
        let src = [64, 0, 0, 128];
        assert_eq!(over(dst, src), [64, 0, 100, 255]);
    }

    #[test]
    fn sample_integer_coords_are_exact() {
        let bmp = Bitmap::from_premul_rgba8(
            2,
            1,
            vec![10, 20, 30, 255, 200, 210, 220, 255],
        )
        .unwrap();
        assert_eq!(sample_bilinear(&bmp, 0.0, 0.0), [10, 20, 30, 255]);
        assert_eq!(sample_bilinear(&bmp, 1.0, 0.0), [200, 210, 220, 255]);
        assert_eq!(sample_bilinear(&bmp, 0.5, 0.0), [105, 115, 125, 255]);
    }

    #[test]
    fn sample_clamps_outside_edges() {
        let bmp = Bitmap::from_premul_rgba8(1, 1, vec![1, 2, 3, 255]).unwrap();
        assert_eq!(sample_bilinear(&bmp, -4.0, 9.0), [1, 2, 3, 255]);
    }
}
