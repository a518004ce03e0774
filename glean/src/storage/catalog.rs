use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{GleanError, Result};

use super::{DocumentLookup, DocumentRecord, StorageAddress, StorageAddressResolver};

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    bucket: String,
    #[serde(default)]
    key: String,
}

/// Document metadata and storage addresses read from a JSON manifest:
///
/// ```json
/// { "<doc id>": { "name": "scan.png", "bucket": "kb-1", "key": "scan.png" } }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManifestCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl ManifestCatalog {
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DocumentLookup for ManifestCatalog {
    async fn get_by_id(&self, id: &str) -> Result<Option<DocumentRecord>> {
        Ok(self.entries.get(id).map(|entry| DocumentRecord {
            id: id.to_string(),
            name: entry.name.clone(),
        }))
    }
}

#[async_trait]
impl StorageAddressResolver for ManifestCatalog {
    async fn storage_address(&self, id: &str) -> Result<StorageAddress> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| GleanError::NotFound(format!("no storage address for {id}")))?;

        if entry.bucket.is_empty() || entry.key.is_empty() {
            return Err(GleanError::Storage(format!(
                "incomplete storage address for {id}"
            )));
        }

        Ok(StorageAddress::new(&entry.bucket, &entry.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "doc-1": { "name": "receipt.png", "bucket": "kb-1", "key": "receipts/receipt.png" },
        "doc-2": { "name": "orphan.png", "bucket": "", "key": "orphan.png" }
    }"#;

    #[tokio::test]
    async fn test_lookup_known_and_unknown() {
        let catalog = ManifestCatalog::from_json(MANIFEST).unwrap();
        assert_eq!(catalog.len(), 2);

        let record = catalog.get_by_id("doc-1").await.unwrap().unwrap();
        assert_eq!(record.id, "doc-1");
        assert_eq!(record.name.as_deref(), Some("receipt.png"));

        assert!(catalog.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_storage_address() {
        let catalog = ManifestCatalog::from_json(MANIFEST).unwrap();

        let address = catalog.storage_address("doc-1").await.unwrap();
        assert_eq!(address, StorageAddress::new("kb-1", "receipts/receipt.png"));

        assert!(catalog.storage_address("doc-2").await.is_err());
        assert!(catalog.storage_address("missing").await.is_err());
    }

    #[test]
    fn test_invalid_manifest() {
        assert!(matches!(
            ManifestCatalog::from_json("[1, 2]"),
            Err(GleanError::Json(_))
        ));
    }
}
