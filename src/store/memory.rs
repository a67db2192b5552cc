//! In-process store with the same token semantics as the remote one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::{ContentStore, StoreError, StoredFile, VersionToken, WriteRequest};

/// Files kept in memory; each write issues a fresh token.
#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<String, StoredFile>>,
    next_revision: AtomicU64,
    reads: AtomicUsize,
    writes: AtomicUsize,
    commits: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with empty resources and events documents.
    pub fn with_empty_documents(resources_path: &str, events_path: &str) -> Self {
        let store = Self::new();
        store.insert(resources_path, json!({ "resources": [] }).to_string().as_bytes());
        store.insert(events_path, json!({ "events": [] }).to_string().as_bytes());
        store
    }

    /// Put a file in place without a token check; returns its token.
    pub fn insert(&self, path: &str, content: &[u8]) -> VersionToken {
        let sha = self.issue_token();
        self.lock_files().insert(
            path.to_string(),
            StoredFile {
                sha: sha.clone(),
                content: content.to_vec(),
            },
        );
        sha
    }

    /// Same as [`insert`](Self::insert) with a caller-chosen token.
    pub fn insert_with_token(&self, path: &str, content: &[u8], sha: VersionToken) {
        self.lock_files().insert(
            path.to_string(),
            StoredFile {
                sha,
                content: content.to_vec(),
            },
        );
    }

    /// Current file, bypassing the call counters.
    pub fn snapshot(&self, path: &str) -> Option<StoredFile> {
        self.lock_files().get(path).cloned()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Commit messages of accepted writes, oldest first.
    pub fn commit_messages(&self) -> Vec<String> {
        self.commits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn issue_token(&self) -> VersionToken {
        let revision = self.next_revision.fetch_add(1, Ordering::SeqCst) + 1;
        VersionToken::new(format!("mem-{:08x}", revision))
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredFile>> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<StoredFile, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.lock_files()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })
    }

    async fn write(&self, path: &str, request: WriteRequest) -> Result<VersionToken, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let content = request.content.decode()?;

        let mut files = self.lock_files();
        let current = files.get(path).ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
        })?;
        if current.sha != request.sha {
            return Err(StoreError::Conflict {
                detail: format!(
                    "{} is at {} but expected {}",
                    path, current.sha, request.sha
                ),
            });
        }

        let sha = self.issue_token();
        files.insert(
            path.to_string(),
            StoredFile {
                sha: sha.clone(),
                content,
            },
        );
        drop(files);

        self.commits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.message);
        Ok(sha)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
