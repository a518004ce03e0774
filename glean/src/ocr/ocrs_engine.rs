//! Primary engine: text detection and line recognition with `ocrs`, running
//! rten models from the OCR resource directory.

use std::path::Path;

use ::ocrs::{ImageSource, OcrEngineParams};
use rten::Model;
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{GleanError, Result};

use super::engine::{OcrEngine, RecognitionLine};
use super::input::CanonicalImage;

pub struct OcrsEngine {
    engine: ::ocrs::OcrEngine,
}

fn load_model(path: &Path) -> Result<Model> {
    if !path.is_file() {
        return Err(GleanError::OcrUnavailable(format!(
            "model file not found: {}",
            path.display()
        )));
    }
    Model::load_file(path).map_err(|e| {
        GleanError::OcrUnavailable(format!("failed to load model {}: {e}", path.display()))
    })
}

impl OcrsEngine {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let detection_model = load_model(&config.detection_model_path())?;
        let recognition_model = load_model(&config.recognition_model_path())?;

        let engine = ::ocrs::OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| GleanError::OcrUnavailable(format!("failed to create ocrs engine: {e}")))?;

        Ok(Self { engine })
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn recognize(&self, image: &CanonicalImage) -> Result<Vec<RecognitionLine>> {
        let rgb = image.rgb();
        let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|e| GleanError::Ocr(format!("invalid image source: {e}")))?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| GleanError::Ocr(format!("failed to prepare input: {e}")))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|e| GleanError::Ocr(format!("text detection failed: {e}")))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        let line_texts = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|e| GleanError::Ocr(format!("text recognition failed: {e}")))?;

        let lines: Vec<RecognitionLine> = line_texts
            .iter()
            .flatten()
            .map(|line| line.to_string())
            .filter(|text| !text.trim().is_empty())
            // ocrs exposes no per-line score
            .map(|text| RecognitionLine::new(text, 1.0))
            .collect();

        debug!(
            width = rgb.width(),
            height = rgb.height(),
            lines = lines.len(),
            "ocrs recognition complete"
        );
        Ok(lines)
    }
}
