use image::DynamicImage;

use crate::error::FetchError;

/// Fetch a candidate image and decode it to 3-channel color.
///
/// The whole body is read before decoding; a non-2xx status is a failure.
/// No retries and no timeout: a hanging remote stalls the request it
/// belongs to, nothing else.
pub async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<DynamicImage, FetchError> {
    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;

    let img = image::load_from_memory(&bytes)?;
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}
