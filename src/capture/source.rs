// # Image Sources
//
// What a capture session holds between acquisition and analysis.

use std::path::{Path, PathBuf};

use crate::capture::MediaType;
use crate::error::{CalorieError, CalorieResult};

/// An acquired image waiting to be analyzed.
///
/// File selections keep only the path; bytes are read when the image is
/// encoded. Camera captures own their JPEG bytes, which are dropped when the
/// source is replaced or the session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    File { path: PathBuf, media_type: MediaType },
    Still { bytes: Vec<u8>, media_type: MediaType },
}

impl ImageSource {
    /// Accepts a user-chosen file if its declared type is a supported image.
    pub fn from_file(path: impl AsRef<Path>) -> CalorieResult<Self> {
        let path = path.as_ref();
        let media_type = MediaType::from_path(path).ok_or_else(|| {
            let declared = path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_else(|| "no extension".to_string());
            CalorieError::invalid_media_type(declared)
        })?;

        Ok(ImageSource::File {
            path: path.to_path_buf(),
            media_type,
        })
    }

    pub fn still(bytes: Vec<u8>, media_type: MediaType) -> Self {
        ImageSource::Still { bytes, media_type }
    }

    pub fn media_type(&self) -> MediaType {
        match self {
            ImageSource::File { media_type, .. } | ImageSource::Still { media_type, .. } => {
                *media_type
            }
        }
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            ImageSource::File { path, media_type } => {
                format!("file '{}' ({})", path.display(), media_type)
            }
            ImageSource::Still { bytes, media_type } => {
                format!("camera still, {} bytes ({})", bytes.len(), media_type)
            }
        }
    }
}
