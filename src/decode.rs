use base64::Engine;
use image::DynamicImage;

use crate::error::DecodeError;

/// Decode a base64-encoded upload into a 3-channel image.
///
/// A data-URL header (`data:image/png;base64,<data>`) is tolerated:
/// everything up to and including the first comma is stripped.
pub fn image_from_base64(payload: &str) -> Result<DynamicImage, DecodeError> {
    let data = match payload.split_once(',') {
        Some((_header, data)) => data,
        None => payload,
    };

    let bytes = base64::engine::general_purpose::STANDARD.decode(data)?;
    let img = image::load_from_memory(&bytes)?;
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}
