use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::types::{OcrEngine, OcrPageResult};
use super::ExtractionError;
use crate::models::enums::RecognitionProfile;

/// Bundled Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: Option<std::path::PathBuf>,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// Use an explicit tessdata directory, or the system default when `None`.
    pub fn new(tessdata_dir: Option<&std::path::Path>) -> Result<Self, ExtractionError> {
        if let Some(dir) = tessdata_dir {
            if !dir.join("eng.traineddata").exists() {
                return Err(ExtractionError::OcrInit(format!(
                    "eng.traineddata not found in {}",
                    dir.display()
                )));
            }
        }
        Ok(Self {
            tessdata_dir: tessdata_dir.map(|d| d.to_path_buf()),
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn recognize(
        &self,
        image_bytes: &[u8],
        lang: &str,
        profile: RecognitionProfile,
    ) -> Result<OcrPageResult, ExtractionError> {
        let datapath = match &self.tessdata_dir {
            Some(dir) => Some(
                dir.to_str()
                    .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?,
            ),
            None => None,
        };

        let mut tess = tesseract::Tesseract::new(datapath, Some(lang))
            .map_err(init_err)?
            .set_variable("tessedit_pageseg_mode", profile.page_segmentation_mode())
            .map_err(init_err)?
            .set_variable("preserve_interword_spaces", "1")
            .map_err(init_err)?;

        if let Some(whitelist) = profile.char_whitelist() {
            tess = tess
                .set_variable("tessedit_char_whitelist", whitelist)
                .map_err(init_err)?;
        }

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        Ok(OcrPageResult {
            text,
            confidence: tess.mean_text_conf().max(0) as f32,
        })
    }
}

#[cfg(feature = "ocr")]
fn init_err<E: std::fmt::Debug>(e: E) -> ExtractionError {
    ExtractionError::OcrInit(format!("{e:?}"))
}

/// Stand-in for builds without the `ocr` feature: every attempt fails, so
/// image documents degrade to an empty, scanned result.
pub struct UnavailableOcr;

impl OcrEngine for UnavailableOcr {
    fn recognize(
        &self,
        _image_bytes: &[u8],
        _lang: &str,
        _profile: RecognitionProfile,
    ) -> Result<OcrPageResult, ExtractionError> {
        Err(ExtractionError::OcrInit(
            "built without the `ocr` feature".into(),
        ))
    }
}

#[derive(Debug, Clone)]
enum MockResponse {
    Text { text: String, confidence: f32 },
    Fail(String),
}

/// Mock OCR engine for unit testing without Tesseract.
///
/// Answers with a default response, optionally overridden per recognition
/// profile, and counts calls.
pub struct MockOcrEngine {
    default: MockResponse,
    by_profile: HashMap<RecognitionProfile, MockResponse>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self::from_response(MockResponse::Text {
            text: text.to_string(),
            confidence,
        })
    }

    pub fn failing(message: &str) -> Self {
        Self::from_response(MockResponse::Fail(message.to_string()))
    }

    fn from_response(default: MockResponse) -> Self {
        Self {
            default,
            by_profile: HashMap::new(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_profile(mut self, profile: RecognitionProfile, text: &str, confidence: f32) -> Self {
        self.by_profile.insert(
            profile,
            MockResponse::Text {
                text: text.to_string(),
                confidence,
            },
        );
        self
    }

    pub fn with_profile_failure(mut self, profile: RecognitionProfile, message: &str) -> Self {
        self.by_profile
            .insert(profile, MockResponse::Fail(message.to_string()));
        self
    }

    /// Block each call for `delay` (exercises attempt timeouts).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(
        &self,
        _image_bytes: &[u8],
        _lang: &str,
        profile: RecognitionProfile,
    ) -> Result<OcrPageResult, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        match self.by_profile.get(&profile).unwrap_or(&self.default) {
            MockResponse::Text { text, confidence } => Ok(OcrPageResult {
                text: text.clone(),
                confidence: *confidence,
            }),
            MockResponse::Fail(message) => Err(ExtractionError::OcrProcessing(message.clone())),
        }
    }
}
