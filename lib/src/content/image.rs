use std::io::Cursor;

use image::ImageReader;

/// Reads `(width, height)` of an encoded image, guessing its format from the
/// leading bytes. Only the header is decoded.
pub fn dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format().ok()?;
    reader.format()?;
    match reader.into_dimensions() {
        Ok(dimensions) => Some(dimensions),
        Err(e) => {
            tracing::debug!(error = %e, "unreadable image header");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat};

    use super::*;

    pub fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let image = match format {
            ImageFormat::Jpeg => DynamicImage::new_rgb8(width, height),
            _ => DynamicImage::new_rgba8(width, height),
        };

        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, format).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn reads_dimensions_of_encoded_images() {
        assert_eq!(dimensions(&encoded(30, 60, ImageFormat::Png)), Some((30, 60)));
        assert_eq!(dimensions(&encoded(640, 480, ImageFormat::Jpeg)), Some((640, 480)));
        assert_eq!(dimensions(&encoded(32, 16, ImageFormat::Gif)), Some((32, 16)));
    }

    #[test]
    fn unknown_or_truncated_data_has_no_dimensions() {
        assert_eq!(dimensions(b"plain text"), None);
        assert_eq!(dimensions(&[0xFF, 0xD8, 0x00]), None);

        let png = encoded(8, 8, ImageFormat::Png);
        assert_eq!(dimensions(&png[..12]), None);
    }
}
