use serde::Serialize;

use super::ExtractionError;
use crate::models::enums::{PreprocessingMethod, RecognitionProfile};

/// Raw result from the recognition engine for one image.
#[derive(Debug, Clone)]
pub struct OcrPageResult {
    pub text: String,
    /// Engine confidence, 0-100.
    pub confidence: f32,
}

/// Recognition engine abstraction (allows mocking for tests).
pub trait OcrEngine: Send + Sync {
    fn recognize(
        &self,
        image_bytes: &[u8],
        lang: &str,
        profile: RecognitionProfile,
    ) -> Result<OcrPageResult, ExtractionError>;
}

/// PDF text-layer extraction, one string per page.
pub trait PdfExtractor: Send + Sync {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// Page images of a scanned PDF, encoded as PNG. Pages without an image are skipped.
pub trait PdfPageRenderer: Send + Sync {
    fn page_images(&self, pdf_bytes: &[u8]) -> Result<Vec<Vec<u8>>, ExtractionError>;
}

/// One scored recognition attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    pub text: String,
    pub recognition_confidence: f32,
    pub preprocessing_method: PreprocessingMethod,
    pub recognition_config: RecognitionProfile,
    pub quality_score: f64,
}

/// Where the adopted text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoverySource {
    DirectText,
    Ocr,
    Desperation,
    PartialConcatenation,
    Empty,
}

/// Outcome of text recovery for one document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveredText {
    #[serde(skip_serializing)]
    pub text: String,
    pub is_likely_scanned: bool,
    pub source: RecoverySource,
    pub page_count: usize,
    pub attempts: usize,
    pub failed_attempts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<f64>,
}
