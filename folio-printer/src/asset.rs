//! Image asset decoding
//!
//! Logos and signatures arrive as `data:` URLs or file paths. They are
//! decoded, downscaled to a bounded pixel size and flattened onto white so
//! the PDF writer only ever sees opaque 8-bit RGB.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

#[cfg(feature = "image")]
use crate::block::ImageData;
use crate::error::{PrintError, PrintResult};

/// Decode the payload of a base64 `data:` URL
pub fn decode_data_url(url: &str) -> PrintResult<Vec<u8>> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| PrintError::InvalidAsset("not a data URL".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| PrintError::InvalidAsset("data URL without payload".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(PrintError::InvalidAsset("data URL is not base64 encoded".to_string()));
    }
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| PrintError::InvalidAsset(format!("base64: {e}")))
}

/// Decode an encoded image (PNG, JPEG, WebP) and fit it within
/// `max_w` x `max_h` pixels
#[cfg(feature = "image")]
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn process_image(bytes: &[u8], max_w: u32, max_h: u32) -> PrintResult<ImageData> {
    use image::GenericImageView;
    use tracing::info;

    let img = image::load_from_memory(bytes).map_err(|e| PrintError::Image(e.to_string()))?;
    let (w, h) = img.dimensions();
    info!(width = w, height = h, "image decoded");

    let resized = if w > max_w || h > max_h {
        img.resize(max_w, max_h, image::imageops::FilterType::Triangle)
    } else {
        img
    };

    // Flatten transparency onto white
    let rgba = resized.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for pixel in rgba.pixels() {
        let alpha = pixel[3] as u32;
        for channel in 0..3 {
            let value = (pixel[channel] as u32 * alpha + 255 * (255 - alpha)) / 255;
            rgb.push(value as u8);
        }
    }
    Ok(ImageData { width, height, rgb })
}
