use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::OcrConfig;

use super::engine::{LazyEngine, OcrEngine, RecognitionLine};
use super::input::{normalize_all, CanonicalImage, ImageInput};

/// Returned when images decoded but neither engine produced any text.
pub const OCR_UNAVAILABLE: &str = "[OCR unavailable – DeepDoc & PaddleOCR not available.]";

/// Appended to output cut at the character budget.
pub const TRUNCATION_MARKER: &str = "\n[TRUNCATED]";

/// Runs images through the primary engine, then the fallback engine when the
/// primary is unavailable or finds nothing.
#[derive(Debug, Clone)]
pub struct OcrPipeline {
    primary: Arc<LazyEngine>,
    fallback: Arc<LazyEngine>,
    max_image_dimension: u32,
}

impl OcrPipeline {
    pub fn new(primary: Arc<LazyEngine>, fallback: Arc<LazyEngine>) -> Self {
        Self {
            primary,
            fallback,
            max_image_dimension: 4096,
        }
    }

    /// Pipeline over the process-wide shared engines.
    pub fn from_config(config: &OcrConfig) -> Self {
        let engines = super::shared_engines(config);
        Self::new(Arc::clone(&engines.primary), Arc::clone(&engines.fallback))
            .with_max_image_dimension(config.max_image_dimension)
    }

    pub fn with_max_image_dimension(mut self, max_image_dimension: u32) -> Self {
        self.max_image_dimension = max_image_dimension;
        self
    }

    /// OCR every decodable image into one labelled, length-bounded string.
    ///
    /// Returns an empty string when nothing decodes, and [`OCR_UNAVAILABLE`]
    /// when images decoded but no engine produced text. `max_chars == 0`
    /// disables truncation.
    pub async fn extract_text(&self, images: &[ImageInput], max_chars: usize) -> String {
        info!(images = images.len(), "Starting image OCR");
        if images.is_empty() {
            return String::new();
        }

        let canonical = normalize_all(images, self.max_image_dimension);
        if canonical.is_empty() {
            debug!("No decodable images");
            return String::new();
        }

        for slot in [&self.primary, &self.fallback] {
            let Some(engine) = acquire(slot).await else {
                debug!(engine = slot.label(), "OCR engine unavailable, trying next");
                continue;
            };

            let out = truncate_chars(recognize_all(engine, &canonical).await, max_chars);
            if !out.is_empty() {
                return out;
            }
            warn!(engine = slot.label(), "OCR engine produced no text, trying next");
        }

        warn!(images = canonical.len(), "No OCR engine produced text");
        OCR_UNAVAILABLE.to_string()
    }
}

/// Construction may load model files, so it runs off the async workers.
async fn acquire(slot: &Arc<LazyEngine>) -> Option<Arc<dyn OcrEngine>> {
    let slot = Arc::clone(slot);
    match tokio::task::spawn_blocking(move || slot.get()).await {
        Ok(engine) => engine,
        Err(e) => {
            warn!("OCR engine construction panicked: {}", e);
            None
        }
    }
}

async fn recognize_all(engine: Arc<dyn OcrEngine>, images: &[CanonicalImage]) -> String {
    let mut blocks = Vec::new();
    for (idx, image) in images.iter().enumerate() {
        let lines = recognize_one(Arc::clone(&engine), image.clone()).await;
        if let Some(block) = format_block(idx + 1, &lines) {
            blocks.push(block);
        }
    }
    blocks.join("\n\n").trim().to_string()
}

/// Inference errors and panics count as "no text" for this image only.
async fn recognize_one(engine: Arc<dyn OcrEngine>, image: CanonicalImage) -> Vec<RecognitionLine> {
    let name = engine.name();
    match tokio::task::spawn_blocking(move || engine.recognize(&image)).await {
        Ok(Ok(lines)) => lines,
        Ok(Err(e)) => {
            debug!(engine = name, "OCR inference failed: {}", e);
            Vec::new()
        }
        Err(e) => {
            warn!(engine = name, "OCR inference panicked: {}", e);
            Vec::new()
        }
    }
}

/// `[Image #index OCR]` header followed by the non-empty lines, or `None`
/// when nothing was recognized.
pub fn format_block(index: usize, lines: &[RecognitionLine]) -> Option<String> {
    let block = lines
        .iter()
        .map(|line| line.text.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let block = block.trim();

    if block.is_empty() {
        None
    } else {
        Some(format!("[Image #{index} OCR]\n{block}"))
    }
}

/// Cut to the first `max_chars` characters and mark the cut.
pub fn truncate_chars(text: String, max_chars: usize) -> String {
    if max_chars == 0 {
        return text;
    }
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(&text[..cut]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => text,
    }
}
