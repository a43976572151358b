//! Text recovery: turns document bytes into the best text the recognition
//! engine can produce.

pub mod ocr;
pub mod pdf;
pub mod pdf_renderer;
pub mod preprocess;
pub mod quality;
pub mod recovery;
pub mod types;

pub use ocr::*;
pub use pdf::*;
pub use pdf_renderer::*;
pub use recovery::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Image decoding failed: {0}")]
    ImageDecode(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Input exceeds {limit_mb} MB limit ({size} bytes)")]
    InputTooLarge { size: usize, limit_mb: usize },

    #[error("OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Attempt timed out after {0}s")]
    AttemptTimedOut(u64),

    #[error("Attempt aborted: {0}")]
    AttemptAborted(String),
}

impl ExtractionError {
    /// Decode-level failures: there is no text to attempt extraction on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ImageDecode(_)
                | Self::PdfParsing(_)
                | Self::UnsupportedFormat(_)
                | Self::InputTooLarge { .. }
        )
    }
}
