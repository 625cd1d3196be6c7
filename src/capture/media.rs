// # Declared Media Types
//
// The four image formats the vision model accepts from this application. A
// file's declared type comes from its extension, the way a browser fills in
// `File.type`; contents are not sniffed at selection time.

use std::fmt;
use std::path::Path;

use image::ImageFormat;

/// Image formats accepted for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl MediaType {
    /// Every accepted type, in the order they are listed to users.
    pub const ALL: [MediaType; 4] = [
        MediaType::Jpeg,
        MediaType::Png,
        MediaType::Webp,
        MediaType::Gif,
    ];

    /// Declared type of a file, from its extension.
    ///
    /// Returns `None` for anything that is not one of the accepted formats,
    /// including other image formats such as BMP or TIFF.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        ImageFormat::from_path(path.as_ref())
            .ok()
            .and_then(Self::from_image_format)
    }

    /// Parses a MIME string such as `image/png`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        ImageFormat::from_mime_type(mime.trim()).and_then(Self::from_image_format)
    }

    fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(MediaType::Jpeg),
            ImageFormat::Png => Some(MediaType::Png),
            ImageFormat::WebP => Some(MediaType::Webp),
            ImageFormat::Gif => Some(MediaType::Gif),
            _ => None,
        }
    }

    /// MIME string sent alongside the encoded payload.
    pub fn as_mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Webp => "image/webp",
            MediaType::Gif => "image/gif",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            MediaType::Jpeg => ImageFormat::Jpeg,
            MediaType::Png => ImageFormat::Png,
            MediaType::Webp => ImageFormat::WebP,
            MediaType::Gif => ImageFormat::Gif,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}
