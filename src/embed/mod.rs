//! External embeds - snapshots of social posts inlined at build time

mod http;

pub use http::HttpEmbedProvider;

use async_trait::async_trait;
use futures::future::join_all;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::EmbedsConfig;

/// Snapshot of one external post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedData {
    pub id: String,
    pub text: Option<String>,
    pub author_name: Option<String>,
    pub author_handle: Option<String>,
    pub author_avatar: Option<String>,
    pub url: Option<String>,
    pub created_at: Option<String>,
    /// Ready-made markup from the provider, used verbatim when present
    pub html: Option<String>,
}

/// Why a single embed could not be fetched
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("no embed provider configured")]
    Unconfigured,

    #[error("invalid embed provider configuration: {0}")]
    Config(String),

    #[error("unknown embed id")]
    NotFound,

    #[error("rate limited by provider")]
    RateLimited,

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    Decode(String),
}

/// Source of embed snapshots
#[async_trait]
pub trait EmbedProvider: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<EmbedData, EmbedError>;
}

/// Stand-in used when no endpoint is configured; every fetch fails
pub struct UnconfiguredProvider;

#[async_trait]
impl EmbedProvider for UnconfiguredProvider {
    async fn fetch(&self, _id: &str) -> Result<EmbedData, EmbedError> {
        Err(EmbedError::Unconfigured)
    }
}

/// One failed embed ID and the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFailure {
    pub id: String,
    pub reason: String,
}

/// Some of the requested embeds could not be fetched
#[derive(Debug, Error)]
pub struct EmbedFetchError {
    pub failures: Vec<EmbedFailure>,
}

impl EmbedFetchError {
    /// IDs that failed, in request order
    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.id.as_str())
    }
}

impl fmt::Display for EmbedFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{:?}: {}", failure.id, failure.reason)?;
        }
        Ok(())
    }
}

/// Fetches embeds through a provider, a bounded number at a time.
///
/// Clones share one permit pool, so the bound holds across every post of a
/// build.
#[derive(Clone)]
pub struct EmbedFetcher {
    provider: Arc<dyn EmbedProvider>,
    permits: Arc<Semaphore>,
}

impl EmbedFetcher {
    pub fn new(provider: Arc<dyn EmbedProvider>, concurrency: usize) -> Self {
        Self {
            provider,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Build the fetcher described by the `embeds` config section
    pub fn from_config(config: &EmbedsConfig) -> Result<Self, EmbedError> {
        let provider: Arc<dyn EmbedProvider> = match config.endpoint.as_deref() {
            Some(endpoint) if !endpoint.trim().is_empty() => {
                Arc::new(HttpEmbedProvider::from_config(endpoint, config)?)
            }
            _ => Arc::new(UnconfiguredProvider),
        };
        Ok(Self::new(provider, config.concurrency))
    }

    /// Fetch every ID, keyed by ID in first-seen order.
    ///
    /// All IDs are attempted even after one fails, so the error lists every
    /// failure at once.
    pub async fn fetch_embeds(
        &self,
        ids: &[String],
    ) -> Result<IndexMap<String, EmbedData>, EmbedFetchError> {
        let unique: IndexSet<&str> = ids.iter().map(String::as_str).collect();

        let results = join_all(unique.iter().map(|&id| async move {
            // The pool is never closed, so acquiring only waits
            let _permit = self.permits.acquire().await.ok();
            (id, self.provider.fetch(id).await)
        }))
        .await;

        let mut embeds = IndexMap::with_capacity(results.len());
        let mut failures = Vec::new();
        for (id, result) in results {
            match result {
                Ok(mut data) => {
                    if data.id.is_empty() {
                        data.id = id.to_string();
                    }
                    embeds.insert(id.to_string(), data);
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch embed {}: {}", id, e);
                    failures.push(EmbedFailure {
                        id: id.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(embeds)
        } else {
            Err(EmbedFetchError { failures })
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory provider that fails for chosen IDs and records its load
    #[derive(Default)]
    pub struct FakeProvider {
        pub failing: HashSet<String>,
        pub calls: AtomicUsize,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl FakeProvider {
        pub fn failing(ids: &[&str]) -> Self {
            Self {
                failing: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl EmbedProvider for FakeProvider {
        async fn fetch(&self, id: &str) -> Result<EmbedData, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(id) {
                return Err(EmbedError::NotFound);
            }
            Ok(EmbedData {
                text: Some(format!("tweet {id}")),
                author_name: Some("Somebody".to_string()),
                author_handle: Some("somebody".to_string()),
                ..Default::default()
            })
        }
    }
}
