use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::error::{GleanError, Result};

use super::input::CanonicalImage;

/// One detected text region.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionLine {
    pub text: String,
    pub confidence: f32,
}

impl RecognitionLine {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A constructed OCR backend. Calls block until inference completes.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(&self, image: &CanonicalImage) -> Result<Vec<RecognitionLine>>;
}

type EngineBuilder = Box<dyn Fn() -> Result<Arc<dyn OcrEngine>> + Send + Sync>;

enum EngineState {
    Uninitialized,
    Ready(Arc<dyn OcrEngine>),
    Failed { reason: String },
}

/// An engine built on first use and cached for the lifetime of the slot.
///
/// Construction runs under a mutex, so concurrent callers never build twice.
/// A failed construction is remembered and logged once; the slot stays
/// unavailable until [`LazyEngine::reset`].
pub struct LazyEngine {
    label: String,
    builder: EngineBuilder,
    state: Mutex<EngineState>,
}

impl LazyEngine {
    pub fn new<F>(label: impl Into<String>, builder: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn OcrEngine>> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            builder: Box::new(builder),
            state: Mutex::new(EngineState::Uninitialized),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The engine, building it if this is the first use.
    pub fn get(&self) -> Option<Arc<dyn OcrEngine>> {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match &*state {
            EngineState::Ready(engine) => return Some(Arc::clone(engine)),
            EngineState::Failed { .. } => return None,
            EngineState::Uninitialized => {}
        }

        let built = catch_unwind(AssertUnwindSafe(|| (self.builder)()))
            .unwrap_or_else(|panic| Err(GleanError::OcrUnavailable(panic_message(&*panic))));

        match built {
            Ok(engine) => {
                info!(engine = %self.label, backend = engine.name(), "OCR engine initialized");
                *state = EngineState::Ready(Arc::clone(&engine));
                Some(engine)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(engine = %self.label, "OCR engine unavailable: {}", reason);
                *state = EngineState::Failed { reason };
                None
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.get().is_some()
    }

    /// Why construction failed, if it has.
    pub fn failure(&self) -> Option<String> {
        let state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match &*state {
            EngineState::Failed { reason } => Some(reason.clone()),
            _ => None,
        }
    }

    /// Drop the cached engine or failure so the next use rebuilds.
    pub fn reset(&self) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *state = EngineState::Uninitialized;
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("engine construction panicked: {detail}")
}

impl fmt::Debug for LazyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyEngine")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
