//! Image format detection and encoder dispatch

use std::path::Path;
use crate::config::ImageFormat;
use crate::error::{Result, GrayBatchError};

/// Select the output encoding from the input file extension
///
/// Only `.png` and `.jpg` are recognized (ASCII case-insensitive). The
/// decoded content is not consulted here.
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<ImageFormat> {
    let extension = path
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str());

    extension
        .and_then(ImageFormat::from_extension)
        .ok_or_else(|| GrayBatchError::unsupported_format(extension.map(str::to_string)))
}

/// Map a decoded format tag onto our output encodings
pub fn from_decoded_tag(tag: image::ImageFormat) -> Option<ImageFormat> {
    match tag {
        image::ImageFormat::Png => Some(ImageFormat::Png),
        image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
        _ => None,
    }
}

/// Convert our ImageFormat to image crate format
impl From<ImageFormat> for image::ImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// Extensions that select an encoder, dotted and comma-separated
pub fn supported_extensions() -> String {
    ImageFormat::ALL
        .iter()
        .map(|format| format!(".{}", format.extension()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn test_format_detection_from_path() {
        assert_eq!(detect_format_from_path("a.png").unwrap(), ImageFormat::Png);
        assert_eq!(detect_format_from_path("dir/b.jpg").unwrap(), ImageFormat::Jpeg);
        assert_eq!(detect_format_from_path("C.PNG").unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_unrecognized_extensions() {
        for path in ["photo.bmp", "photo.jpeg", "photo.webp", "photo", "archive.png.gz"] {
            let err = detect_format_from_path(path).unwrap_err();
            assert_eq!(err.kind(), Some(FailureKind::UnsupportedFormat), "{}", path);
            assert_eq!(err.to_string(), "unsupported image format");
        }
    }

    #[test]
    fn test_decoded_tag_mapping() {
        assert_eq!(from_decoded_tag(image::ImageFormat::Png), Some(ImageFormat::Png));
        assert_eq!(from_decoded_tag(image::ImageFormat::Jpeg), Some(ImageFormat::Jpeg));
        assert_eq!(from_decoded_tag(image::ImageFormat::Gif), None);
    }

    #[test]
    fn test_supported_extensions() {
        assert_eq!(supported_extensions(), ".png, .jpg");
    }
}
