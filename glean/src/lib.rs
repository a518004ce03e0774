//! Glean pulls text out of document images.
//!
//! Document identifiers are resolved to object-store blobs by
//! [`storage::StorageResolver`]; images (blobs, base64, data URLs or wrapped
//! values) are recognized by [`ocr::OcrPipeline`] using a primary engine and
//! a fallback engine. Both stages skip bad items instead of failing the batch.

pub mod config;
pub mod error;
pub mod ocr;
pub mod storage;

pub use error::{GleanError, Result};

use ocr::{ImageInput, OcrPipeline};
use storage::StorageResolver;

/// Fetch every resolvable document and OCR its bytes as one image each.
pub async fn extract_document_text(
    resolver: &StorageResolver,
    pipeline: &OcrPipeline,
    doc_ids: &[String],
    max_chars: usize,
) -> String {
    let images: Vec<ImageInput> = resolver
        .fetch(doc_ids)
        .await
        .into_iter()
        .map(|blob| ImageInput::RawBytes(blob.data))
        .collect();

    pipeline.extract_text(&images, max_chars).await
}
