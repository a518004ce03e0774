//! Document identifier → object-store bytes.
//!
//! `StorageResolver` drives three collaborators per identifier: a document
//! lookup, a storage-address resolver and an object store. Any failure skips
//! that identifier and is logged; it never fails the batch.

mod catalog;
mod http;
mod resolver;

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

pub use catalog::ManifestCatalog;
pub use http::{reset_shared_object_store, shared_object_store, HttpObjectStore};
pub use resolver::{FetchReport, SkipReason, StorageResolver};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Bucket and object key locating one blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAddress {
    pub bucket: String,
    pub key: String,
}

impl StorageAddress {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for StorageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Bytes fetched for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlob {
    pub document_id: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait DocumentLookup: Send + Sync {
    /// `Ok(None)` when the document does not exist.
    async fn get_by_id(&self, id: &str) -> Result<Option<DocumentRecord>>;
}

#[async_trait]
pub trait StorageAddressResolver: Send + Sync {
    async fn storage_address(&self, id: &str) -> Result<StorageAddress>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// The full object body.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}
