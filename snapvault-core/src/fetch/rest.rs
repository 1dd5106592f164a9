/*!
REST adapter for the remote collection store.

Each fetch is a single `GET {endpoint}/rest/v1/{collection}?select=*` carrying
the service credential in the `apikey` and `Authorization` headers. The
service credential must grant read access to every row regardless of row-level
policies.
*/

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::CollectionSource;
use crate::collection::Record;
use crate::{Result, SnapvaultError};

/// Remote collection source over HTTP
#[derive(Clone)]
pub struct RestCollectionSource {
    client: Client,
    endpoint: String,
    service_key: String,
}

impl fmt::Debug for RestCollectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestCollectionSource")
            .field("endpoint", &self.endpoint)
            .field("service_key", &"[REDACTED]")
            .finish()
    }
}

impl RestCollectionSource {
    /// Create a source bound to the store endpoint
    ///
    /// # Arguments
    /// * `endpoint` - Base URL of the store, e.g. `https://project.example.co`
    /// * `service_key` - Elevated service credential
    /// * `timeout` - Optional per-request timeout; `None` waits indefinitely
    ///
    /// # Errors
    /// Returns a configuration error if the endpoint is not an http(s) URL,
    /// the key is empty, or the HTTP client cannot be built.
    pub fn new(endpoint: &str, service_key: &str, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(SnapvaultError::configuration(format!(
                "store URL must start with http:// or https://, got '{endpoint}'"
            )));
        }
        if service_key.trim().is_empty() {
            return Err(SnapvaultError::configuration(
                "store service key cannot be empty",
            ));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            SnapvaultError::configuration(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            service_key: service_key.trim().to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// URL selecting every row of a collection
    pub fn collection_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}?select=*", self.endpoint, collection)
    }
}

/// Decode a response body into records
///
/// The body must be a JSON array of objects; anything else is a fetch error.
pub(crate) fn parse_rows(collection: &str, body: &[u8]) -> Result<Vec<Record>> {
    serde_json::from_slice::<Vec<Record>>(body).map_err(|e| {
        SnapvaultError::fetch(
            collection,
            format!("response is not an array of rows: {e}"),
        )
    })
}

#[async_trait]
impl CollectionSource for RestCollectionSource {
    async fn fetch(&self, collection: &str) -> Result<Vec<Record>> {
        let url = self.collection_url(collection);
        debug!(collection = %collection, url = %url, "Requesting collection");

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SnapvaultError::fetch(collection, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SnapvaultError::fetch(
                collection,
                format!("store returned {status}: {body}"),
            ));
        }

        let body = response.bytes().await.map_err(|e| {
            SnapvaultError::fetch(collection, format!("failed to read response body: {e}"))
        })?;

        parse_rows(collection, &body)
    }
}
