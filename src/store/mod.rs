//! Versioned content store.
//!
//! The source-controlled JSON files are the source of truth. Every access goes
//! through a read that yields the current version token and a conditional write
//! that must present that token.

mod github;
mod memory;

pub use github::*;
pub use memory::*;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque revision identifier issued by the store (a git blob SHA for GitHub).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored file together with the token of the revision it was read at.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub sha: VersionToken,
    pub content: Vec<u8>,
}

/// Document bytes in the store's transport encoding (base64 of UTF-8 JSON).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedContent(String);

impl EncodedContent {
    pub fn encode(bytes: &[u8]) -> Self {
        Self(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<Vec<u8>, StoreError> {
        decode_content(&self.0)
    }
}

/// Decode base64 content, tolerating the line breaks GitHub inserts every 60 chars.
pub fn decode_content(encoded: &str) -> Result<Vec<u8>, StoreError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| StoreError::Malformed(format!("invalid base64 content: {}", e)))
}

/// A conditional replace of one file.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub content: EncodedContent,
    /// Token the caller read; the write fails if the file has moved on.
    pub sha: VersionToken,
    pub message: String,
}

/// Errors reported by a content store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path} not found in content store")]
    NotFound { path: String },

    #[error("version token is stale: {detail}")]
    Conflict { detail: String },

    #[error("content store answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("content store did not answer in time")]
    Timeout,

    #[error("malformed store response: {0}")]
    Malformed(String),
}

impl StoreError {
    /// HTTP-like status associated with the failure, if the store reported one.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::NotFound { .. } => Some(404),
            StoreError::Conflict { .. } => Some(409),
            StoreError::Rejected { status, .. } => Some(*status),
            StoreError::Transport(_) | StoreError::Timeout | StoreError::Malformed(_) => None,
        }
    }
}

/// Read-token / conditional-write access to stored documents.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Read a file and the token of its current revision.
    async fn read(&self, path: &str) -> Result<StoredFile, StoreError>;

    /// Replace a file if `request.sha` is still current; returns the new token.
    async fn write(&self, path: &str, request: WriteRequest) -> Result<VersionToken, StoreError>;

    /// Short name for logs and diagnostics.
    fn name(&self) -> &'static str;
}
