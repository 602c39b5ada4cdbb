//! HTTP backend abstraction for the registry API.
//!
//! A trait-based backend allows dependency injection and easy testing.
//! The production implementation uses reqwest with automatic retry for
//! transient errors.

use crate::config::RegistryClientConfig;
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Trait for HTTP backends that can fetch JSON or raw bytes from URLs.
///
/// This is an implementation detail - external code should use the
/// `RegistryPort` trait.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Fetch JSON from a URL and deserialize it.
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> ClientResult<T>;

    /// Fetch the raw body bytes of a URL.
    async fn get_bytes(&self, url: &Url) -> ClientResult<Vec<u8>>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest with retry logic.
///
/// Implements exponential backoff for transient server errors (5xx)
/// and network errors. 404s map to `NotFound` with the trailing path
/// segment as the id, which covers `/project/{id}/version` and
/// `/version/{id}` lookups.
pub struct ReqwestBackend {
    client: reqwest::Client,
    max_retries: u8,
    retry_base_delay_ms: u64,
}

impl ReqwestBackend {
    /// Create a new reqwest backend from the public configuration.
    pub fn new(config: &RegistryClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            max_retries: config.max_retries,
            retry_base_delay_ms: config.retry_base_delay.as_millis() as u64,
        }
    }

    /// Fetch a URL with automatic retry for transient errors.
    async fn fetch_with_retry(&self, url: &Url) -> ClientResult<reqwest::Response> {
        let mut last_error: Option<ClientError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(
                    self.retry_base_delay_ms * 2u64.pow(u32::from(attempt) - 1),
                );
                tokio::time::sleep(delay).await;
            }

            match self.client.get(url.as_str()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    // 5xx errors are retryable (server-side issues)
                    if status.is_server_error() && attempt < self.max_retries {
                        last_error = Some(ClientError::ApiRequestFailed {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                        continue;
                    }

                    // 404 is a special case
                    if status.as_u16() == 404 {
                        if let Some(id) = extract_id_from_path(url.path()) {
                            return Err(ClientError::NotFound { id });
                        }
                    }

                    // 4xx errors or final attempt - fail immediately
                    return Err(ClientError::ApiRequestFailed {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                Err(e) => {
                    // Network errors are retryable
                    if attempt < self.max_retries {
                        last_error = Some(e.into());
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ClientError::InvalidResponse {
            message: "unknown error during fetch".to_string(),
        }))
    }
}

/// Pull the package/version id out of an API path like
/// `/v2/project/{id}/version` or `/v2/version/{id}`.
fn extract_id_from_path(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let pos = segments
        .iter()
        .position(|s| *s == "project" || *s == "version")?;
    segments.get(pos + 1).map(|s| (*s).to_string())
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> ClientResult<T> {
        let response = self.fetch_with_retry(url).await?;
        let data: T = response.json().await?;
        Ok(data)
    }

    async fn get_bytes(&self, url: &Url) -> ClientResult<Vec<u8>> {
        let response = self.fetch_with_retry(url).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A fake HTTP backend that returns canned responses by URL substring.
    #[derive(Default)]
    pub struct FakeBackend {
        json_responses: Mutex<HashMap<String, serde_json::Value>>,
        byte_responses: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl FakeBackend {
        /// Create a new fake backend.
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a canned JSON response for a URL pattern.
        pub fn with_json(self, url_contains: &str, json: serde_json::Value) -> Self {
            self.json_responses
                .lock()
                .unwrap()
                .insert(url_contains.to_string(), json);
            self
        }

        /// Add a canned byte response for a URL pattern.
        pub fn with_bytes(self, url_contains: &str, bytes: Vec<u8>) -> Self {
            self.byte_responses
                .lock()
                .unwrap()
                .insert(url_contains.to_string(), bytes);
            self
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> ClientResult<T> {
            let found = {
                let responses = self.json_responses.lock().unwrap();
                responses
                    .iter()
                    .find(|(pattern, _)| url.as_str().contains(pattern.as_str()))
                    .map(|(_, json)| json.clone())
            };
            let json = found.ok_or_else(|| {
                extract_id_from_path(url.path()).map_or(
                    ClientError::ApiRequestFailed {
                        status: 404,
                        url: url.to_string(),
                    },
                    |id| ClientError::NotFound { id },
                )
            })?;
            serde_json::from_value(json).map_err(Into::into)
        }

        async fn get_bytes(&self, url: &Url) -> ClientResult<Vec<u8>> {
            let responses = self.byte_responses.lock().unwrap();
            responses
                .iter()
                .find(|(pattern, _)| url.as_str().contains(pattern.as_str()))
                .map(|(_, bytes)| bytes.clone())
                .ok_or_else(|| ClientError::ApiRequestFailed {
                    status: 404,
                    url: url.to_string(),
                })
        }
    }
}
