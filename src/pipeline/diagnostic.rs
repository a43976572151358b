//! Per-document processing context and diagnostic dumps.
//!
//! Every document gets a [`ProcessingContext`]: its id, a tracing span that
//! concurrent recognition attempts are instrumented with, and an optional dump
//! directory for intermediate artifacts.
//!
//! Dumps are disabled unless `LABSENSE_DUMP_DIR` is set:
//! ```text
//! {dump_dir}/{doc_id}/
//!   00-source-info.json
//!   01-variant-<method>.png
//!   02-recovered-text.txt
//!   03-normalized-text.txt
//!   04-candidates.json
//!   05-outcome.json
//! ```

use std::path::{Path, PathBuf};

use tracing::Span;
use uuid::Uuid;

use crate::config::DUMP_DIR_ENV;

#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub document_id: Uuid,
    pub span: Span,
    dump_dir: Option<PathBuf>,
}

impl ProcessingContext {
    /// New document context; dumps follow `LABSENSE_DUMP_DIR`.
    pub fn new() -> Self {
        let base = std::env::var_os(DUMP_DIR_ENV).map(PathBuf::from);
        Self::with_dump_base(base.as_deref())
    }

    pub fn with_dump_base(base: Option<&Path>) -> Self {
        let document_id = Uuid::new_v4();
        let span = tracing::info_span!("document", document_id = %document_id);
        let dump_dir = base.and_then(|b| create_dump_dir(b, &document_id));
        Self {
            document_id,
            span,
            dump_dir,
        }
    }

    pub fn dump_dir(&self) -> Option<&Path> {
        self.dump_dir.as_deref()
    }

    pub fn dump_binary(&self, filename: &str, data: &[u8]) {
        if let Some(dir) = &self.dump_dir {
            dump_binary(dir, filename, data);
        }
    }

    pub fn dump_json<T: serde::Serialize>(&self, filename: &str, value: &T) {
        if let Some(dir) = &self.dump_dir {
            dump_json(dir, filename, value);
        }
    }

    pub fn dump_text(&self, filename: &str, text: &str) {
        if let Some(dir) = &self.dump_dir {
            dump_text(dir, filename, text);
        }
    }
}

impl Default for ProcessingContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates `{base}/{doc_id}`. Returns `None` (with a warning) on failure.
fn create_dump_dir(base: &Path, doc_id: &Uuid) -> Option<PathBuf> {
    let dir = base.join(doc_id.to_string());
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(
            path = %dir.display(),
            error = %e,
            "Diagnostic dump: failed to create directory"
        );
        return None;
    }
    Some(dir)
}

// ──────────────────────────────────────────────
// Dump writers (never panic, never fail the pipeline)
// ──────────────────────────────────────────────

pub fn dump_binary(dir: &Path, filename: &str, data: &[u8]) {
    write_artifact(&dir.join(filename), data, "binary");
}

pub fn dump_json<T: serde::Serialize>(dir: &Path, filename: &str, value: &T) {
    let path = dir.join(filename);
    match serde_json::to_string_pretty(value) {
        Ok(json) => write_artifact(&path, json.as_bytes(), "JSON"),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Diagnostic dump: failed to serialize JSON"
        ),
    }
}

pub fn dump_text(dir: &Path, filename: &str, text: &str) {
    write_artifact(&dir.join(filename), text.as_bytes(), "text");
}

fn write_artifact(path: &Path, data: &[u8], kind: &str) {
    match std::fs::write(path, data) {
        Ok(()) => tracing::debug!(
            path = %path.display(),
            size = data.len(),
            kind,
            "Diagnostic dump: artifact written"
        ),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            kind,
            "Diagnostic dump: failed to write artifact"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_without_base_has_no_dump_dir() {
        let ctx = ProcessingContext::with_dump_base(None);
        assert!(ctx.dump_dir().is_none());
        // No-op, no panic.
        ctx.dump_text("x.txt", "ignored");
    }

    #[test]
    fn context_creates_per_document_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ProcessingContext::with_dump_base(Some(tmp.path()));

        let dir = ctx.dump_dir().unwrap();
        assert!(dir.exists());
        assert!(dir.ends_with(ctx.document_id.to_string()));

        ctx.dump_text("02-recovered-text.txt", "Glucose 95");
        let content = std::fs::read_to_string(dir.join("02-recovered-text.txt")).unwrap();
        assert_eq!(content, "Glucose 95");
    }

    #[test]
    fn contexts_get_distinct_ids() {
        let a = ProcessingContext::with_dump_base(None);
        let b = ProcessingContext::with_dump_base(None);
        assert_ne!(a.document_id, b.document_id);
    }

    #[test]
    fn dump_binary_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        dump_binary(tmp.path(), "variant.png", b"PNG fake image data");
        let written = std::fs::read(tmp.path().join("variant.png")).unwrap();
        assert_eq!(written, b"PNG fake image data");
    }

    #[test]
    fn dump_json_writes_pretty_json() {
        let tmp = tempfile::tempdir().unwrap();

        #[derive(serde::Serialize)]
        struct Info {
            name: String,
            value: u32,
        }

        dump_json(
            tmp.path(),
            "info.json",
            &Info {
                name: "test".to_string(),
                value: 42,
            },
        );

        let content = std::fs::read_to_string(tmp.path().join("info.json")).unwrap();
        assert!(content.contains("\"name\": \"test\""));
        assert!(content.contains("\"value\": 42"));
        assert!(content.contains('\n'));
    }

    #[test]
    fn write_failures_are_swallowed() {
        let bad_dir = Path::new("/nonexistent/path/that/does/not/exist");
        dump_binary(bad_dir, "test.png", b"data");
        dump_json(bad_dir, "test.json", &"data");
        dump_text(bad_dir, "test.txt", "data");
    }
}
