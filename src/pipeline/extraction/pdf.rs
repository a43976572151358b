use super::types::PdfExtractor;
use super::ExtractionError;

/// PDF text-layer extractor using the pdf-extract crate.
/// Handles digital PDFs; scanned PDFs yield empty or near-empty pages.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))
    }
}
