use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};

use crate::config::AVATAR_SIZE;
use crate::core::errors::{ApiError, ApiResult};

fn encode_png(img: &DynamicImage) -> ApiResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ApiError::InternalError(format!("PNG encode failed: {}", e)))?;
    Ok(buf)
}

fn decode(bytes: &[u8]) -> ApiResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Image is required".to_string()));
    }
    image::load_from_memory(bytes)
        .map_err(|_| ApiError::BadRequest("Unsupported or corrupt image".to_string()))
}

/// Re-encodes an uploaded post image as PNG, keeping its dimensions.
pub fn normalize_post_image(bytes: &[u8]) -> ApiResult<Vec<u8>> {
    encode_png(&decode(bytes)?)
}

/// Crops and scales an avatar to a square PNG.
pub fn normalize_avatar(bytes: &[u8]) -> ApiResult<Vec<u8>> {
    let img = decode(bytes)?.resize_to_fill(AVATAR_SIZE, AVATAR_SIZE, FilterType::Lanczos3);
    encode_png(&img)
}

/// Flat grey square given to accounts until they upload an avatar.
pub fn default_avatar() -> ApiResult<Vec<u8>> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_pixel(AVATAR_SIZE, AVATAR_SIZE, Rgb([219, 219, 219]));
    encode_png(&DynamicImage::ImageRgb8(img))
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 255) as u8, (y % 255) as u8, 90]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_is_square() {
        let png = normalize_avatar(&sample_png(40, 20)).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (AVATAR_SIZE, AVATAR_SIZE));
    }

    #[test]
    fn post_image_keeps_dimensions() {
        let png = normalize_post_image(&sample_png(33, 17)).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (33, 17));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(normalize_post_image(b"not an image"), Err(ApiError::BadRequest(_))));
        assert!(matches!(normalize_post_image(&[]), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn default_avatar_decodes() {
        let img = image::load_from_memory(&default_avatar().unwrap()).unwrap();
        assert_eq!(img.width(), AVATAR_SIZE);
    }
}
