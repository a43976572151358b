use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::extraction::ExtractionError;

/// Largest accepted document.
pub const MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Document formats the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Png,
    Jpeg,
    Tiff,
}

impl DocumentFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Detect from magic bytes. Magic bytes don't lie; declared types can be wrong.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x25, 0x50, 0x44, 0x46, ..] => Some(Self::Pdf),
            [0x89, 0x50, 0x4E, 0x47, ..] => Some(Self::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Tiff => "image/tiff",
        }
    }
}

/// Validate size, declared MIME type and content signature.
pub fn detect_format(bytes: &[u8], declared_mime: &str) -> Result<DocumentFormat, ExtractionError> {
    if bytes.len() > MAX_INPUT_BYTES {
        return Err(ExtractionError::InputTooLarge {
            size: bytes.len(),
            limit_mb: MAX_INPUT_BYTES / (1024 * 1024),
        });
    }

    let declared = DocumentFormat::from_mime(declared_mime).ok_or_else(|| {
        ExtractionError::UnsupportedFormat(format!("MIME type '{declared_mime}' is not accepted"))
    })?;

    match DocumentFormat::sniff(bytes) {
        Some(actual) if actual == declared => Ok(declared),
        Some(actual) => Err(ExtractionError::UnsupportedFormat(format!(
            "declared {} but content is {}",
            declared.mime(),
            actual.mime()
        ))),
        None => Err(ExtractionError::UnsupportedFormat(format!(
            "content does not look like {}",
            declared.mime()
        ))),
    }
}

/// SHA-256 of the raw document, base64-encoded.
pub fn fingerprint(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(Sha256::digest(bytes))
}
