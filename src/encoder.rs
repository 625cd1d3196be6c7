//! # Image Encoder
//!
//! Converts an [`ImageSource`] into the transport form the model endpoint
//! expects: standard base64 (padded, no `data:` URI prefix) plus the declared
//! media type.

use base64::{Engine as _, engine::general_purpose};
use tracing::debug;

use crate::capture::{ImageSource, MediaType};
use crate::error::{CalorieError, CalorieResult};

/// Binary image content as a transport-safe string plus its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub media_type: MediaType,
}

impl EncodedImage {
    /// Size of the encoded payload in bytes.
    pub fn payload_len(&self) -> usize {
        self.data.len()
    }
}

/// Encodes raw bytes. Deterministic and infallible.
pub fn encode_bytes(bytes: &[u8], media_type: MediaType) -> EncodedImage {
    EncodedImage {
        data: general_purpose::STANDARD.encode(bytes),
        media_type,
    }
}

/// Encodes an acquired image, reading file-backed sources from disk.
///
/// # Errors
///
/// Returns [`CalorieError::Encoding`] if the file cannot be read.
pub async fn encode_source(source: &ImageSource) -> CalorieResult<EncodedImage> {
    let encoded = match source {
        ImageSource::File { path, media_type } => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| CalorieError::encoding(Some(path.clone()), e))?;
            encode_bytes(&bytes, *media_type)
        }
        ImageSource::Still { bytes, media_type } => encode_bytes(bytes, *media_type),
    };

    debug!(
        source = %source.describe(),
        encoded_len = encoded.payload_len(),
        "image encoded"
    );
    Ok(encoded)
}
