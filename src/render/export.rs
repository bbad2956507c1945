use std::io::Cursor;

use anyhow::Context;
use base64::Engine as _;

use crate::foundation::core::OutputFormat;
use crate::foundation::error::CompositorResult;
use crate::render::surface::Surface;

/// Encode the surface as PNG or JPEG bytes.
///
/// `quality` (0.0..=1.0) only affects JPEG. JPEG has no alpha, so transparent areas come out
/// black. An empty surface encodes to no bytes.
pub fn encode_surface(
    surface: &Surface,
    format: OutputFormat,
    quality: f32,
) -> CompositorResult<Vec<u8>> {
    if surface.is_empty() {
        return Ok(Vec::new());
    }
    let dims = surface.dimensions();
    let mut out = Vec::new();

    match format {
        OutputFormat::Png => {
            let mut raw = surface.premul_bytes().to_vec();
            crate::assets::decode::unpremultiply_rgba8_in_place(&mut raw);
            let img = image::RgbaImage::from_raw(dims.width, dims.height, raw)
                .context("surface buffer does not match its dimensions")?;
            img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
                .context("encode png")?;
        }
        OutputFormat::Jpeg => {
            // Premultiplied color is already the color flattened over black.
            let rgb: Vec<u8> = surface
                .premul_bytes()
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            let img = image::RgbImage::from_raw(dims.width, dims.height, rgb)
                .context("surface buffer does not match its dimensions")?;
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, jpeg_quality(quality));
            img.write_with_encoder(encoder).context("encode jpeg")?;
        }
    }
    Ok(out)
}

/// Encode the surface as a `data:` URL. An empty surface yields `"data:,"`.
pub fn surface_data_url(
    surface: &Surface,
    format: OutputFormat,
    quality: f32,
) -> CompositorResult<String> {
    if surface.is_empty() {
        return Ok("data:,".to_string());
    }
    let bytes = encode_surface(surface, format, quality)?;
    Ok(format!(
        "data:{};base64,{}",
        format.mime_type(),
        base64::engine::general_purpose::STANDARD.encode(bytes)
    ))
}

fn jpeg_quality(quality: f32) -> u8 {
    let q = if quality.is_finite() {
        quality.clamp(0.0, 1.0)
    } else {
        crate::foundation::core::DEFAULT_QUALITY
    };
    ((q * 100.0).round() as u8).max(1)
}
