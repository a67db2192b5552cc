//! Content fetcher for the public listings.
//!
//! Reads a document from the deployed static copy first and, if that fails
//! for any reason, from the raw-file mirror of the repository. Exactly one
//! fallback attempt is made; there is no retry loop.

use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{EventEntry, EventsDocument, ResourceEntry, ResourcesDocument};

/// Why a single source could not supply the document.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid JSON: {0}")]
    Parse(String),
}

/// Every source failed.
#[derive(Debug, Error)]
#[error("{}mirror failed: {mirror}", primary_prefix(.primary))]
pub struct FetchError {
    /// `None` when no primary source is configured
    pub primary: Option<SourceError>,
    pub mirror: SourceError,
}

fn primary_prefix(primary: &Option<SourceError>) -> String {
    primary
        .as_ref()
        .map(|e| format!("primary failed: {}; ", e))
        .unwrap_or_default()
}

/// Fetches content documents with primary → mirror fallback.
#[derive(Clone)]
pub struct ContentFetcher {
    client: Client,
    primary_base: Option<String>,
    mirror_base: String,
}

impl ContentFetcher {
    pub fn new(client: Client, primary_base: Option<String>, mirror_base: impl Into<String>) -> Self {
        Self {
            client,
            primary_base,
            mirror_base: mirror_base.into(),
        }
    }

    /// Fetch and parse the document at `path`.
    pub async fn fetch_document<D: DeserializeOwned>(&self, path: &str) -> Result<D, FetchError> {
        let mut primary = None;

        if let Some(base) = &self.primary_base {
            match self.fetch_from(base, path).await {
                Ok(document) => return Ok(document),
                Err(e) => {
                    tracing::warn!("Primary fetch of {} failed, falling back to mirror: {}", path, e);
                    primary = Some(e);
                }
            }
        }

        match self.fetch_from(&self.mirror_base, path).await {
            Ok(document) => Ok(document),
            Err(mirror) => Err(FetchError { primary, mirror }),
        }
    }

    /// Resources with every icon reference resolved to a renderable icon.
    pub async fn fetch_resources(&self, path: &str) -> Result<Vec<ResourceEntry>, FetchError> {
        let document: ResourcesDocument = self.fetch_document(path).await?;
        Ok(document
            .resources
            .into_iter()
            .map(|mut resource| {
                resource.icon = resource.icon().as_str().to_string();
                resource
            })
            .collect())
    }

    /// Events in chronological order, each with an organization if one is known.
    pub async fn fetch_events(&self, path: &str) -> Result<Vec<EventEntry>, FetchError> {
        let document: EventsDocument = self.fetch_document(path).await?;
        let mut events: Vec<EventEntry> = document
            .events
            .into_iter()
            .map(|mut event| {
                event.organization = event.organizer().map(String::from);
                event
            })
            .collect();
        // YYYY-MM-DD sorts chronologically as text; sort is stable for same-day events.
        events.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(events)
    }

    async fn fetch_from<D: DeserializeOwned>(&self, base: &str, path: &str) -> Result<D, SourceError> {
        let url = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let cache_buster = Utc::now().timestamp_millis().to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("v", cache_buster.as_str())])
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Parse(e.to_string()))
    }
}
