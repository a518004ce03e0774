use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::{DocumentLookup, ObjectStore, RawBlob, StorageAddress, StorageAddressResolver};

/// Why an identifier contributed no blob.
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("document not found")]
    NotFound,

    #[error("document lookup failed: {0}")]
    Lookup(String),

    #[error("storage address resolution failed: {0}")]
    Address(String),

    #[error("failed to read {address}: {reason}")]
    Fetch {
        address: StorageAddress,
        reason: String,
    },

    #[error("empty object at {0}")]
    EmptyObject(StorageAddress),
}

/// Outcome of a batch fetch: successes in input order plus every skip.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub blobs: Vec<RawBlob>,
    pub skipped: Vec<(String, SkipReason)>,
}

#[derive(Clone)]
pub struct StorageResolver {
    documents: Arc<dyn DocumentLookup>,
    addresses: Arc<dyn StorageAddressResolver>,
    store: Arc<dyn ObjectStore>,
}

impl StorageResolver {
    pub fn new(
        documents: Arc<dyn DocumentLookup>,
        addresses: Arc<dyn StorageAddressResolver>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            documents,
            addresses,
            store,
        }
    }

    /// Blobs for every identifier that resolved and fetched. Skipped
    /// identifiers leave no placeholder, so positions do not line up with
    /// `doc_ids`.
    pub async fn fetch(&self, doc_ids: &[String]) -> Vec<RawBlob> {
        self.fetch_with_report(doc_ids).await.blobs
    }

    pub async fn fetch_with_report(&self, doc_ids: &[String]) -> FetchReport {
        let mut report = FetchReport::default();

        for doc_id in doc_ids {
            match self.fetch_one(doc_id).await {
                Ok(blob) => report.blobs.push(blob),
                Err(reason) => {
                    warn!(doc_id = %doc_id, "Skipping document: {}", reason);
                    report.skipped.push((doc_id.clone(), reason));
                }
            }
        }

        report
    }

    async fn fetch_one(&self, doc_id: &str) -> Result<RawBlob, SkipReason> {
        match self.documents.get_by_id(doc_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return Err(SkipReason::NotFound),
            Err(e) => return Err(SkipReason::Lookup(e.to_string())),
        }

        let address = self
            .addresses
            .storage_address(doc_id)
            .await
            .map_err(|e| SkipReason::Address(e.to_string()))?;

        let data = match self.store.get_object(&address.bucket, &address.key).await {
            Ok(data) => data,
            Err(e) => {
                return Err(SkipReason::Fetch {
                    address,
                    reason: e.to_string(),
                })
            }
        };

        if data.is_empty() {
            return Err(SkipReason::EmptyObject(address));
        }

        info!(
            bucket = %address.bucket,
            key = %address.key,
            bytes = data.len(),
            "Loaded document blob"
        );

        Ok(RawBlob {
            document_id: doc_id.to_string(),
            data,
        })
    }
}
