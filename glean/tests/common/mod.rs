// Common test utilities for integration tests
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use glean::error::{GleanError, Result};
use glean::ocr::{CanonicalImage, LazyEngine, OcrEngine, RecognitionLine};
use image::{DynamicImage, ImageFormat};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Encode a blank RGB image of the given size as PNG
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(width, height);
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
        .expect("Failed to encode PNG");
    output
}

/// Engine returning a fixed set of lines for every image
pub struct StubEngine {
    lines: Vec<RecognitionLine>,
    calls: AtomicUsize,
}

impl StubEngine {
    pub fn new(lines: &[(&str, f32)]) -> Self {
        Self {
            lines: lines
                .iter()
                .map(|(text, conf)| RecognitionLine::new(*text, *conf))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn recognize(&self, _image: &CanonicalImage) -> Result<Vec<RecognitionLine>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lines.clone())
    }
}

/// Engine whose behaviour depends on image width: width 13 fails, width 17
/// panics, anything else reports the width as text
pub struct WidthEngine;

impl OcrEngine for WidthEngine {
    fn name(&self) -> &'static str {
        "width"
    }

    fn recognize(&self, image: &CanonicalImage) -> Result<Vec<RecognitionLine>> {
        let (width, _) = image.dimensions();
        match width {
            13 => Err(GleanError::Ocr("inference failed".to_string())),
            17 => panic!("engine crashed"),
            _ => Ok(vec![RecognitionLine::new(format!("width {width}"), 0.9)]),
        }
    }
}

pub fn ready_slot(label: &str, engine: Arc<dyn OcrEngine>) -> Arc<LazyEngine> {
    Arc::new(LazyEngine::new(label, move || Ok(Arc::clone(&engine))))
}

pub fn unavailable_slot(label: &str) -> Arc<LazyEngine> {
    Arc::new(LazyEngine::new(label, || {
        Err(GleanError::OcrUnavailable("model files missing".to_string()))
    }))
}
