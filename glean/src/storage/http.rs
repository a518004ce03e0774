use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::config::{ObjectStoreEndpoint, StorageConfig};
use crate::error::{GleanError, Result};

use super::ObjectStore;

/// Path-style object reads over HTTP: `GET {base}/{bucket}/{key}`.
///
/// Requests are unsigned; deployments that need SigV4 put a signing
/// `ObjectStore` implementation in front of the resolver instead.
#[derive(Clone, Debug)]
pub struct HttpObjectStore {
    client: Client,
    base_url: Url,
    access_key: String,
}

impl HttpObjectStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let endpoint = config.endpoint()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GleanError::Storage(format!("Failed to create HTTP client: {e}")))?;

        Self::with_client(client, &endpoint, &config.access_key)
    }

    pub fn with_client(client: Client, endpoint: &ObjectStoreEndpoint, access_key: &str) -> Result<Self> {
        let base_url = Url::parse(&endpoint.base_url())?;
        Ok(Self {
            client,
            base_url,
            access_key: access_key.to_string(),
        })
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GleanError::Storage(format!("cannot address objects under {}", self.base_url)))?
            .pop_if_empty()
            .push(bucket)
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(bucket, key)?;
        debug!(url = %url, "Fetching object");

        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

static SHARED_STORE: Mutex<Option<Arc<HttpObjectStore>>> = Mutex::new(None);

/// Process-wide client, built on first call from `config` and reused after.
pub fn shared_object_store(config: &StorageConfig) -> Result<Arc<HttpObjectStore>> {
    let mut slot = match SHARED_STORE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(store) = slot.as_ref() {
        return Ok(Arc::clone(store));
    }

    let store = Arc::new(HttpObjectStore::new(config)?);
    info!(base_url = %store.base_url, "Object store client initialized");
    *slot = Some(Arc::clone(&store));
    Ok(store)
}

/// Drop the shared client; the next call to [`shared_object_store`] rebuilds it.
pub fn reset_shared_object_store() {
    let mut slot = match SHARED_STORE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *slot = None;
}
