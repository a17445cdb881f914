//! Transport encoding for compressed images.
//!
//! The sync engine sends attachments inside the same payload as text, so
//! the binary JPEG is wrapped in a base64 `data:` URL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::compress::{compress, validate, CompressedImage};
use crate::error::Result;

/// Encode a compressed image as a `data:image/jpeg;base64,...` URL.
pub fn to_data_url(image: &CompressedImage) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(&image.bytes))
}

/// The full selection-to-payload path used by both the message composer
/// and the profile-picture upload: validate, compress, encode.
pub fn prepare_attachment(mime: &str, bytes: &[u8]) -> Result<String> {
    validate(mime, bytes.len())?;
    let compressed = compress(bytes)?;
    Ok(to_data_url(&compressed))
}
