//! Document processing entry point.
//!
//! Drives format detection → text recovery → normalization → parameter
//! extraction under one wall-clock budget. Only fatal decode failures and
//! budget overruns are errors; empty or near-empty documents come back as a
//! successful outcome flagged for manual entry.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::models::enums::ProcessingStatus;
use crate::models::HealthParameter;
use crate::pipeline::diagnostic::ProcessingContext;
use crate::pipeline::extraction::{ExtractionError, OcrEngine, RecoveredText, TextRecovery};
use crate::pipeline::format::{detect_format, fingerprint};
use crate::pipeline::normalize::normalize;
use crate::pipeline::parameters::ParameterExtractor;
use crate::pipeline_config::PipelineConfig;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Document processing exceeded the {budget_secs}s budget")]
    Timeout { budget_secs: u64 },
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// What the caller persists: parameters plus the manual-entry flags.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOutcome {
    pub document_id: Uuid,
    pub health_parameters: Vec<HealthParameter>,
    pub is_scanned_document: bool,
    /// True iff `health_parameters` is empty.
    pub requires_manual_entry: bool,
    pub message: String,
    pub processing_status: ProcessingStatus,
    pub fingerprint: String,
    pub recovery: RecoveredText,
}

const SCANNED_EMPTY: &str = "This appears to be a scanned document. No health parameters were \
     automatically detected. You may need to enter data manually.";
const SCANNED_PARTIAL: &str = "This appears to be a scanned document. Some health parameters \
     were detected, but you may need to verify and complete the data.";
const DIGITAL_EMPTY: &str =
    "No health parameters were found in the document. You may need to enter data manually.";

fn outcome_message(scanned: bool, found: usize) -> String {
    match (scanned, found) {
        (true, 0) => SCANNED_EMPTY.to_string(),
        (true, _) => SCANNED_PARTIAL.to_string(),
        (false, 0) => DIGITAL_EMPTY.to_string(),
        (false, 1) => "Extracted 1 health parameter.".to_string(),
        (false, n) => format!("Extracted {n} health parameters."),
    }
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

pub struct DocumentProcessor {
    recovery: TextRecovery,
    extractor: ParameterExtractor,
    config: PipelineConfig,
}

impl DocumentProcessor {
    pub fn new(ocr: Arc<dyn OcrEngine>, config: PipelineConfig) -> Self {
        Self {
            recovery: TextRecovery::new(ocr, config.clone()),
            extractor: ParameterExtractor::new(&config),
            config,
        }
    }

    /// Process one uploaded document.
    pub async fn process(
        &self,
        bytes: &[u8],
        mime: &str,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        self.process_with_context(&ProcessingContext::new(), bytes, mime)
            .await
    }

    pub async fn process_with_context(
        &self,
        ctx: &ProcessingContext,
        bytes: &[u8],
        mime: &str,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let budget = self.config.document_timeout();
        let run = self.run(ctx, bytes, mime).instrument(ctx.span.clone());

        match tokio::time::timeout(budget, run).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    parent: &ctx.span,
                    budget_secs = budget.as_secs(),
                    "Document processing timed out"
                );
                Err(ProcessingError::Timeout {
                    budget_secs: budget.as_secs(),
                })
            }
        }
    }

    async fn run(
        &self,
        ctx: &ProcessingContext,
        bytes: &[u8],
        mime: &str,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let started = Instant::now();
        let format = detect_format(bytes, mime).inspect_err(|e| {
            tracing::warn!(mime, error = %e, "Rejected document");
        })?;
        let fingerprint = fingerprint(bytes);

        tracing::info!(
            format = format.mime(),
            size = bytes.len(),
            fingerprint = %fingerprint,
            "Processing document"
        );
        ctx.dump_json(
            "00-source-info.json",
            &serde_json::json!({
                "format": format,
                "declaredMime": mime,
                "size": bytes.len(),
                "fingerprint": fingerprint,
            }),
        );

        let recovery = self.recovery.recover(ctx, bytes, format).await?;
        ctx.dump_text("02-recovered-text.txt", &recovery.text);

        let normalized = normalize(&recovery.text);
        ctx.dump_text("03-normalized-text.txt", &normalized);

        let candidates = self.extractor.candidates(&normalized);
        ctx.dump_json("04-candidates.json", &candidates);
        let health_parameters = self.extractor.resolve(candidates);

        let is_scanned_document = recovery.is_likely_scanned;
        let requires_manual_entry = health_parameters.is_empty();
        let processing_status = if requires_manual_entry || is_scanned_document {
            ProcessingStatus::CompletedWithWarnings
        } else {
            ProcessingStatus::Completed
        };

        tracing::info!(
            parameters = health_parameters.len(),
            scanned = is_scanned_document,
            status = %processing_status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Document processed"
        );

        let outcome = ProcessingOutcome {
            document_id: ctx.document_id,
            message: outcome_message(is_scanned_document, health_parameters.len()),
            health_parameters,
            is_scanned_document,
            requires_manual_entry,
            processing_status,
            fingerprint,
            recovery,
        };
        ctx.dump_json("05-outcome.json", &outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::enums::ParameterStatus;
    use crate::pipeline::extraction::pdf::fixtures::text_pdf;
    use crate::pipeline::extraction::preprocess::fixtures::report_png;
    use crate::pipeline::extraction::MockOcrEngine;

    const LAB_TEXT: &str = "LIPID PROFILE\n\
                            Total Cholesterol  195  mg/dL  <200\n\
                            Glucose: 130 mg/dL\n\
                            Hemoglobin  13.1  g/dL  13.5-17.5";

    fn processor(engine: MockOcrEngine) -> DocumentProcessor {
        DocumentProcessor::new(Arc::new(engine), PipelineConfig::default())
    }

    fn find<'a>(outcome: &'a ProcessingOutcome, name: &str) -> &'a HealthParameter {
        outcome
            .health_parameters
            .iter()
            .find(|p| p.name == name)
            .unwrap_or_else(|| panic!("{name} missing from {:?}", outcome.health_parameters))
    }

    #[tokio::test]
    async fn image_report_end_to_end() {
        let outcome = processor(MockOcrEngine::new(LAB_TEXT, 85.0))
            .process(&report_png(120, 80), "image/png")
            .await
            .unwrap();

        let cholesterol = find(&outcome, "Total Cholesterol");
        assert_eq!(cholesterol.value, 195.0);
        assert_eq!(cholesterol.unit, "mg/dL");
        assert_eq!(cholesterol.status, ParameterStatus::Normal);

        let glucose = find(&outcome, "Glucose");
        assert_eq!(glucose.value, 130.0);
        assert_eq!(glucose.normal_range, "70-100");
        assert_eq!(glucose.status, ParameterStatus::High);

        assert_eq!(find(&outcome, "Hemoglobin").status, ParameterStatus::Low);

        assert!(!outcome.is_scanned_document);
        assert!(!outcome.requires_manual_entry);
        assert_eq!(outcome.processing_status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn blank_scan_is_flagged_not_failed() {
        let outcome = processor(MockOcrEngine::new("", 0.0))
            .process(&report_png(120, 80), "image/png")
            .await
            .unwrap();

        assert!(outcome.health_parameters.is_empty());
        assert!(outcome.is_scanned_document);
        assert!(outcome.requires_manual_entry);
        assert_eq!(outcome.processing_status, ProcessingStatus::CompletedWithWarnings);
        assert!(outcome.message.contains("enter data manually"));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["healthParameters"], serde_json::json!([]));
        assert_eq!(json["isScannedDocument"], true);
        assert_eq!(json["requiresManualEntry"], true);
        assert_eq!(json["processingStatus"], "completed-with-warnings");
    }

    #[tokio::test]
    async fn recognition_failures_everywhere_still_succeed() {
        let outcome = processor(MockOcrEngine::failing("engine down"))
            .process(&report_png(120, 80), "image/png")
            .await
            .unwrap();

        assert!(outcome.requires_manual_entry);
        assert_eq!(outcome.recovery.failed_attempts, outcome.recovery.attempts);
    }

    #[tokio::test]
    async fn mismatched_mime_is_fatal() {
        let err = processor(MockOcrEngine::new(LAB_TEXT, 85.0))
            .process(&report_png(120, 80), "application/pdf")
            .await
            .unwrap_err();

        match err {
            ProcessingError::Extraction(e) => assert!(e.is_fatal()),
            other => panic!("expected extraction error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn document_budget_surfaces_as_timeout() {
        let config = PipelineConfig {
            document_timeout_secs: 1,
            attempt_timeout_secs: 30,
            ..PipelineConfig::default()
        };
        let engine = MockOcrEngine::new(LAB_TEXT, 85.0).with_delay(Duration::from_millis(700));
        let processor = DocumentProcessor::new(Arc::new(engine), config);

        let err = processor
            .process(&report_png(120, 80), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Timeout { budget_secs: 1 }));
    }

    #[tokio::test]
    async fn digital_pdf_end_to_end() {
        let pdf = text_pdf(&["Glucose: 130 mg/dL", "Sodium 140 mmol/L 135-145"]);
        let outcome = processor(MockOcrEngine::new("unused", 0.0))
            .process(&pdf, "application/pdf")
            .await
            .unwrap();

        let glucose = find(&outcome, "Glucose");
        assert_eq!(glucose.value, 130.0);
        assert_eq!(glucose.status, ParameterStatus::High);
        assert_eq!(outcome.recovery.attempts, 0);
    }

    #[tokio::test]
    async fn artifacts_are_dumped_when_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ProcessingContext::with_dump_base(Some(tmp.path()));

        let outcome = processor(MockOcrEngine::new(LAB_TEXT, 85.0))
            .process_with_context(&ctx, &report_png(120, 80), "image/png")
            .await
            .unwrap();

        let dir = ctx.dump_dir().unwrap();
        for file in [
            "00-source-info.json",
            "02-recovered-text.txt",
            "03-normalized-text.txt",
            "04-candidates.json",
            "05-outcome.json",
        ] {
            assert!(dir.join(file).exists(), "{file} not written");
        }
        assert_eq!(outcome.document_id, ctx.document_id);
    }

    #[test]
    fn messages_follow_flags() {
        assert_eq!(outcome_message(true, 0), SCANNED_EMPTY);
        assert_eq!(outcome_message(true, 3), SCANNED_PARTIAL);
        assert_eq!(outcome_message(false, 0), DIGITAL_EMPTY);
        assert_eq!(outcome_message(false, 2), "Extracted 2 health parameters.");
    }
}
