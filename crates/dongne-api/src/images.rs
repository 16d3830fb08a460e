use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use image::ImageError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

pub const THUMBNAIL_SIZE: u32 = 512;
pub const JPEG_QUALITY: u8 = 85;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_IMAGES: usize = 10;

/// Decode an upload, centre-crop it to a square thumbnail and return it as a
/// JPEG `data:` URL.
pub fn thumbnail_data_url(bytes: &[u8]) -> Result<String, ImageError> {
    let img = image::load_from_memory(bytes)?;
    let thumb = img
        .resize_to_fill(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3)
        .to_rgb8();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&thumb)?;

    Ok(format!("data:image/jpeg;base64,{}", B64.encode(out.into_inner())))
}

#[cfg(test)]
mod tests {
    use image::{ImageFormat, RgbImage};

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn wide_upload_becomes_square_jpeg() {
        let url = thumbnail_data_url(&png(1200, 300)).unwrap();
        let encoded = url.strip_prefix("data:image/jpeg;base64,").unwrap();
        let decoded = image::load_from_memory(&B64.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded.width(), THUMBNAIL_SIZE);
        assert_eq!(decoded.height(), THUMBNAIL_SIZE);
    }

    #[test]
    fn small_uploads_are_scaled_up() {
        let url = thumbnail_data_url(&png(40, 60)).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(thumbnail_data_url(b"definitely not an image").is_err());
    }
}
