//! Text recovery orchestration.
//!
//! PDF text layers are used directly when long enough. Everything else goes
//! through recognition: every preprocessing recipe is rendered, every
//! (variant, profile) pair is recognized concurrently under a worker limit
//! and a per-attempt timeout, and the results are ranked by quality score.
//! A failed attempt is logged and dropped; siblings keep running.

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::GrayImage;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use super::pdf::PdfTextExtractor;
use super::pdf_renderer::LopdfImageExtractor;
use super::preprocess::{load_grayscale, Recipe, DESPERATION, RECIPES};
use super::quality::quality_score;
use super::types::{
    OcrEngine, PdfExtractor, PdfPageRenderer, RawCandidate, RecoveredText, RecoverySource,
};
use super::ExtractionError;
use crate::pipeline::diagnostic::ProcessingContext;
use crate::pipeline::format::DocumentFormat;
use crate::pipeline_config::PipelineConfig;

pub struct TextRecovery {
    ocr: Arc<dyn OcrEngine>,
    pdf_text: Arc<dyn PdfExtractor>,
    pdf_images: Arc<dyn PdfPageRenderer>,
    config: PipelineConfig,
}

/// Recognition outcome for one image.
struct PageRecovery {
    text: String,
    source: RecoverySource,
    attempts: usize,
    failed: usize,
    best_score: Option<f64>,
}

/// Scored candidates of one batch of recipes, best first.
struct AttemptBatch {
    candidates: Vec<RawCandidate>,
    attempts: usize,
}

impl TextRecovery {
    pub fn new(ocr: Arc<dyn OcrEngine>, config: PipelineConfig) -> Self {
        Self {
            ocr,
            pdf_text: Arc::new(PdfTextExtractor),
            pdf_images: Arc::new(LopdfImageExtractor),
            config,
        }
    }

    pub fn with_pdf_backends(
        mut self,
        text: Arc<dyn PdfExtractor>,
        images: Arc<dyn PdfPageRenderer>,
    ) -> Self {
        self.pdf_text = text;
        self.pdf_images = images;
        self
    }

    /// Recover text from a validated document. Errors only on fatal decode failures.
    pub async fn recover(
        &self,
        ctx: &ProcessingContext,
        bytes: &[u8],
        format: DocumentFormat,
    ) -> Result<RecoveredText, ExtractionError> {
        async {
            let started = Instant::now();
            let recovered = match format {
                DocumentFormat::Pdf => self.recover_pdf(ctx, bytes).await?,
                _ => {
                    let page = self.recognize_image(ctx, bytes.to_vec()).await?;
                    self.assemble(vec![page])
                }
            };

            tracing::info!(
                source = ?recovered.source,
                chars = recovered.text.chars().count(),
                scanned = recovered.is_likely_scanned,
                attempts = recovered.attempts,
                failed = recovered.failed_attempts,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Text recovery complete"
            );
            Ok(recovered)
        }
        .instrument(ctx.span.clone())
        .await
    }

    async fn recover_pdf(
        &self,
        ctx: &ProcessingContext,
        bytes: &[u8],
    ) -> Result<RecoveredText, ExtractionError> {
        let extractor = Arc::clone(&self.pdf_text);
        let owned = bytes.to_vec();
        match run_blocking(move || extractor.extract_text(&owned)).await {
            Ok(pages) => {
                let text = join_non_empty(pages.iter().map(String::as_str));
                if char_len(&text) >= self.config.direct_text_min_chars {
                    tracing::info!(pages = pages.len(), "Using PDF text layer");
                    return Ok(RecoveredText {
                        is_likely_scanned: self.is_short(&text),
                        text,
                        source: RecoverySource::DirectText,
                        page_count: pages.len(),
                        attempts: 0,
                        failed_attempts: 0,
                        best_score: None,
                    });
                }
                tracing::debug!(
                    chars = char_len(&text),
                    "PDF text layer too short, treating as scanned"
                );
            }
            Err(e) => tracing::warn!(error = %e, "PDF text layer unreadable, trying page images"),
        }

        let renderer = Arc::clone(&self.pdf_images);
        let owned = bytes.to_vec();
        let images = match run_blocking(move || renderer.page_images(&owned)).await {
            Ok(images) => images,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Page image extraction failed, no pages to recognize");
                Vec::new()
            }
        };
        if images.is_empty() {
            tracing::warn!("Scanned PDF has no recoverable page images");
        }

        let mut pages = Vec::with_capacity(images.len());
        for (index, png) in images.into_iter().enumerate() {
            match self.recognize_image(ctx, png).await {
                Ok(page) => pages.push(page),
                Err(e) => tracing::warn!(page = index, error = %e, "Skipping undecodable page"),
            }
        }
        Ok(self.assemble(pages))
    }

    async fn recognize_image(
        &self,
        ctx: &ProcessingContext,
        bytes: Vec<u8>,
    ) -> Result<PageRecovery, ExtractionError> {
        let base = Arc::new(run_blocking(move || load_grayscale(&bytes)).await?);
        let semaphore = Arc::new(Semaphore::new(self.config.worker_limit));

        let batch = self.attempt_batch(ctx, &base, &semaphore, RECIPES).await;
        let mut attempts = batch.attempts;
        let mut succeeded = batch.candidates.len();
        let best_score = batch.candidates.first().map(|c| c.quality_score);
        let mut text = batch
            .candidates
            .first()
            .map(|c| c.text.trim().to_string())
            .unwrap_or_default();
        let mut source = RecoverySource::Ocr;

        let below_floor = best_score.map_or(true, |s| s < self.config.desperation_score_floor);
        if self.is_short(&text) || below_floor {
            let rescue = self
                .attempt_batch(ctx, &base, &semaphore, std::slice::from_ref(&DESPERATION))
                .await;
            attempts += rescue.attempts;
            succeeded += rescue.candidates.len();

            if let Some(candidate) = rescue.candidates.first() {
                let rescued = candidate.text.trim();
                let len = char_len(rescued);
                if len > char_len(&text) && len >= self.config.desperation_min_chars {
                    tracing::info!(chars = len, "Adopting desperation pass");
                    text = rescued.to_string();
                    source = RecoverySource::Desperation;
                }
            }
        }

        if self.is_short(&text) {
            let joined = join_non_empty(distinct_texts(&batch.candidates));
            if char_len(&joined) > char_len(&text) {
                tracing::info!(chars = char_len(&joined), "Adopting concatenated partial hits");
                text = joined;
                source = RecoverySource::PartialConcatenation;
            }
        }

        if text.is_empty() {
            source = RecoverySource::Empty;
        }

        Ok(PageRecovery {
            text,
            source,
            attempts,
            failed: attempts - succeeded,
            best_score,
        })
    }

    /// Render `recipes`, then recognize every (variant, profile) pair.
    async fn attempt_batch(
        &self,
        ctx: &ProcessingContext,
        base: &Arc<GrayImage>,
        semaphore: &Arc<Semaphore>,
        recipes: &'static [Recipe],
    ) -> AttemptBatch {
        let timeout = self.config.attempt_timeout();
        let attempts = recipes.iter().map(|r| r.profiles.len()).sum();

        let mut renders = JoinSet::new();
        for (index, recipe) in recipes.iter().enumerate() {
            let base = Arc::clone(base);
            let semaphore = Arc::clone(semaphore);
            renders.spawn(
                async move {
                    let result =
                        bounded(&semaphore, timeout, move || recipe.render(&base)).await;
                    (index, recipe, result)
                }
                .instrument(ctx.span.clone()),
            );
        }

        let mut variants = Vec::new();
        while let Some(joined) = renders.join_next().await {
            match joined {
                Ok((index, recipe, Ok(png))) => {
                    ctx.dump_binary(&format!("01-variant-{}.png", recipe.method), &png);
                    variants.push((index, recipe, Arc::new(png)));
                }
                Ok((_, recipe, Err(e))) => tracing::warn!(
                    variant = %recipe.method,
                    error = %e,
                    "Preprocessing failed"
                ),
                Err(e) => tracing::warn!(error = %e, "Preprocessing task aborted"),
            }
        }

        let mut recognitions = JoinSet::new();
        for (index, recipe, png) in &variants {
            for (slot, &profile) in recipe.profiles.iter().enumerate() {
                let order = (*index, slot);
                let method = recipe.method;
                let ocr = Arc::clone(&self.ocr);
                let png = Arc::clone(png);
                let lang = self.config.language.clone();
                let semaphore = Arc::clone(semaphore);
                recognitions.spawn(
                    async move {
                        let started = Instant::now();
                        let result = bounded(&semaphore, timeout, move || {
                            ocr.recognize(&png, &lang, profile)
                        })
                        .await;
                        (order, method, profile, result, started.elapsed())
                    }
                    .instrument(ctx.span.clone()),
                );
            }
        }

        let mut scored = Vec::new();
        while let Some(joined) = recognitions.join_next().await {
            match joined {
                Ok((order, method, profile, Ok(page), elapsed)) => {
                    let score = quality_score(&page.text, page.confidence);
                    tracing::debug!(
                        variant = %method,
                        profile = %profile,
                        score,
                        chars = page.text.chars().count(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Recognition attempt scored"
                    );
                    scored.push((
                        order,
                        RawCandidate {
                            text: page.text,
                            recognition_confidence: page.confidence,
                            preprocessing_method: method,
                            recognition_config: profile,
                            quality_score: score,
                        },
                    ));
                }
                Ok((_, method, profile, Err(e), _)) => tracing::warn!(
                    variant = %method,
                    profile = %profile,
                    error = %e,
                    "Recognition attempt failed"
                ),
                Err(e) => tracing::warn!(error = %e, "Recognition task aborted"),
            }
        }

        // Completion order is nondeterministic; ties fall back to recipe order.
        scored.sort_by(|(a_order, a), (b_order, b)| {
            b.quality_score
                .total_cmp(&a.quality_score)
                .then(a_order.cmp(b_order))
        });

        AttemptBatch {
            candidates: scored.into_iter().map(|(_, c)| c).collect(),
            attempts,
        }
    }

    fn assemble(&self, pages: Vec<PageRecovery>) -> RecoveredText {
        let text = join_non_empty(pages.iter().map(|p| p.text.as_str()));
        let source = pages
            .iter()
            .map(|p| p.source)
            .find(|s| *s != RecoverySource::Empty)
            .unwrap_or(RecoverySource::Empty);

        RecoveredText {
            is_likely_scanned: self.is_short(&text),
            source,
            page_count: pages.len(),
            attempts: pages.iter().map(|p| p.attempts).sum(),
            failed_attempts: pages.iter().map(|p| p.failed).sum(),
            best_score: pages
                .iter()
                .filter_map(|p| p.best_score)
                .reduce(f64::max),
            text,
        }
    }

    fn is_short(&self, text: &str) -> bool {
        char_len(text) < self.config.scanned_text_threshold
    }
}

/// Run blocking work once a worker permit is free, bounded by `timeout`.
///
/// The permit moves into the blocking closure, so a timed-out attempt keeps
/// its slot until the thread actually finishes.
async fn bounded<T, F>(
    semaphore: &Arc<Semaphore>,
    timeout: Duration,
    work: F,
) -> Result<T, ExtractionError>
where
    F: FnOnce() -> Result<T, ExtractionError> + Send + 'static,
    T: Send + 'static,
{
    let permit = Arc::clone(semaphore)
        .acquire_owned()
        .await
        .map_err(|e| ExtractionError::AttemptAborted(e.to_string()))?;

    let task = run_blocking(move || {
        let _permit = permit;
        work()
    });
    tokio::time::timeout(timeout, task)
        .await
        .map_err(|_| ExtractionError::AttemptTimedOut(timeout.as_secs()))?
}

async fn run_blocking<T, F>(work: F) -> Result<T, ExtractionError>
where
    F: FnOnce() -> Result<T, ExtractionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ExtractionError::AttemptAborted(e.to_string()))?
}

fn char_len(text: &str) -> usize {
    text.trim().chars().count()
}

fn join_non_empty<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Candidate texts in rank order, duplicates and blanks removed.
fn distinct_texts(candidates: &[RawCandidate]) -> impl Iterator<Item = &str> {
    let mut seen: Vec<&str> = Vec::new();
    candidates.iter().filter_map(move |c| {
        let text = c.text.trim();
        if text.is_empty() || seen.contains(&text) {
            return None;
        }
        seen.push(text);
        Some(text)
    })
}
