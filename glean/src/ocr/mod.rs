//! OCR over heterogeneous image inputs.
//!
//! Inputs are normalized into RGB rasters (`input`), then recognized by a
//! primary engine with a fallback engine behind it (`pipeline`). Engines sit
//! behind the `OcrEngine` trait and are built lazily inside a `LazyEngine`
//! slot, so a missing model or library shows up as an unavailable engine
//! rather than an error.
//!
//! - Primary: `ocrs` detector + recognizer models from `OcrConfig::resource_dir`
//! - Fallback: Tesseract via `leptess`
//!
//! # Usage
//!
//! ```rust,ignore
//! let pipeline = OcrPipeline::from_config(&config.ocr);
//! let text = pipeline.extract_text(&images, config.ocr.max_chars).await;
//! ```

mod engine;
pub mod input;
#[cfg(feature = "ocrs")]
mod ocrs_engine;
mod pipeline;
#[cfg(feature = "tesseract")]
mod tesseract;

use std::sync::{Arc, OnceLock};

use crate::config::OcrConfig;
#[cfg(any(not(feature = "ocrs"), not(feature = "tesseract")))]
use crate::error::GleanError;
use crate::error::Result;

pub use engine::{LazyEngine, OcrEngine, RecognitionLine};
pub use input::{parse_image_list, CanonicalImage, ImageInput};
#[cfg(feature = "ocrs")]
pub use ocrs_engine::OcrsEngine;
pub use pipeline::{format_block, truncate_chars, OcrPipeline, OCR_UNAVAILABLE, TRUNCATION_MARKER};
#[cfg(feature = "tesseract")]
pub use tesseract::{tesseract_language, TesseractEngine};

#[cfg(feature = "ocrs")]
fn build_primary(config: &OcrConfig) -> Result<Arc<dyn OcrEngine>> {
    Ok(Arc::new(OcrsEngine::new(config)?))
}

#[cfg(not(feature = "ocrs"))]
fn build_primary(_config: &OcrConfig) -> Result<Arc<dyn OcrEngine>> {
    Err(GleanError::OcrUnavailable(
        "built without the `ocrs` feature".to_string(),
    ))
}

#[cfg(feature = "tesseract")]
fn build_fallback(config: &OcrConfig) -> Result<Arc<dyn OcrEngine>> {
    Ok(Arc::new(TesseractEngine::new(config)?))
}

#[cfg(not(feature = "tesseract"))]
fn build_fallback(_config: &OcrConfig) -> Result<Arc<dyn OcrEngine>> {
    Err(GleanError::OcrUnavailable(
        "built without the `tesseract` feature".to_string(),
    ))
}

pub fn primary_engine(config: &OcrConfig) -> LazyEngine {
    let config = config.clone();
    LazyEngine::new("primary", move || build_primary(&config))
}

pub fn fallback_engine(config: &OcrConfig) -> LazyEngine {
    let config = config.clone();
    LazyEngine::new("fallback", move || build_fallback(&config))
}

#[derive(Debug)]
pub struct SharedEngines {
    pub primary: Arc<LazyEngine>,
    pub fallback: Arc<LazyEngine>,
}

static SHARED_ENGINES: OnceLock<SharedEngines> = OnceLock::new();

/// Process-wide engine slots. The first caller's config wins.
pub fn shared_engines(config: &OcrConfig) -> &'static SharedEngines {
    SHARED_ENGINES.get_or_init(|| SharedEngines {
        primary: Arc::new(primary_engine(config)),
        fallback: Arc::new(fallback_engine(config)),
    })
}

/// Forget cached engines and failures; the next use rebuilds them.
pub fn reset_shared_engines() {
    if let Some(engines) = SHARED_ENGINES.get() {
        engines.primary.reset();
        engines.fallback.reset();
    }
}
