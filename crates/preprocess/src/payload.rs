use crate::PreprocessError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;

/// Drop a leading `data:<mime>;base64,` header if present.
pub fn strip_data_url(image: &str) -> &str {
    match image.split_once(";base64,") {
        Some((header, body)) if header.starts_with("data:") => body,
        _ => image,
    }
}

/// Base64-decode and decode the image a detection request carries.
pub fn decode_payload(image: &str) -> Result<DynamicImage, PreprocessError> {
    let bytes = STANDARD.decode(strip_data_url(image).trim())?;
    Ok(image::load_from_memory(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_base64() -> String {
        let img = RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        STANDARD.encode(bytes.into_inner())
    }

    #[test]
    fn strips_data_url_header() {
        assert_eq!(strip_data_url("data:image/jpeg;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url("AAAA"), "AAAA");
        assert_eq!(strip_data_url("nodata;base64,AAAA"), "nodata;base64,AAAA");
    }

    #[test]
    fn decodes_with_and_without_prefix() {
        let raw = png_base64();
        let plain = decode_payload(&raw).unwrap();
        let prefixed = decode_payload(&format!("data:image/png;base64,{raw}")).unwrap();
        assert_eq!((plain.width(), plain.height()), (3, 2));
        assert_eq!(plain.to_rgb8().into_raw(), prefixed.to_rgb8().into_raw());
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(matches!(
            decode_payload("data:image/png;base64,!!!"),
            Err(PreprocessError::Base64(_))
        ));
    }

    #[test]
    fn rejects_non_image_bytes() {
        let garbage = STANDARD.encode(b"definitely not an image");
        assert!(matches!(decode_payload(&garbage), Err(PreprocessError::Decode(_))));
    }
}
