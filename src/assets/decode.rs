use anyhow::Context;

use crate::{
    assets::Bitmap,
    foundation::error::{CompositorError, CompositorResult},
};

pub fn decode_image(bytes: &[u8]) -> CompositorResult<Bitmap> {
    let dyn_img = image::load_from_memory(bytes)
        .context("decode image from memory")
        .map_err(CompositorError::decode_chain)?;
    Bitmap::from_rgba_image(dyn_img.to_rgba8())
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}
