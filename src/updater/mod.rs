//! Content updater: the read-token / conditional-write save.
//!
//! A save authenticates, validates, reads the stored document's current
//! version token, and replaces the document conditionally on that token. The
//! token is never cached; each save reads its own.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::auth::verify_password;
use crate::errors::{AppError, UpstreamStep};
use crate::models::ContentDocument;
use crate::store::{ContentStore, EncodedContent, StoreError, VersionToken, WriteRequest};

/// Result of a successful save.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// Entries in the written document
    pub count: usize,
    /// Token of the revision just written
    pub version: VersionToken,
    pub saved_at: DateTime<Utc>,
}

/// Saves replacement documents into a [`ContentStore`].
#[derive(Clone)]
pub struct ContentUpdater {
    store: Option<Arc<dyn ContentStore>>,
    admin_password: Option<String>,
    timeout: Duration,
}

impl ContentUpdater {
    /// `store` is `None` when the server lacks the storage credential.
    pub fn new(
        store: Option<Arc<dyn ContentStore>>,
        admin_password: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            admin_password,
            timeout,
        }
    }

    /// Name of the configured store, if any.
    pub fn store_name(&self) -> Option<&'static str> {
        self.store.as_ref().map(|store| store.name())
    }

    /// Replace the document at `path` with `document`.
    pub async fn save<D: ContentDocument>(
        &self,
        path: &str,
        password: &str,
        document: &D,
    ) -> Result<SaveOutcome, AppError> {
        let kind = D::KIND;

        verify_password(self.admin_password.as_deref(), password)?;
        document.validate()?;

        let store = self.store.as_ref().ok_or_else(|| {
            AppError::Configuration(
                "GITHUB_TOKEN is not set; the content store is unavailable".to_string(),
            )
        })?;

        let current = self
            .bounded(UpstreamStep::Read, store.read(path))
            .await?;
        tracing::debug!(path, sha = %current.sha, "Read current version token");

        let json = serde_json::to_string_pretty(document)
            .map_err(|e| AppError::Internal(format!("Failed to serialize {}: {}", kind.key(), e)))?;

        let saved_at = Utc::now();
        let request = WriteRequest {
            content: EncodedContent::encode(json.as_bytes()),
            sha: current.sha,
            message: format!(
                "Update {} - {}",
                kind.key(),
                saved_at.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
        };

        let version = self
            .bounded(UpstreamStep::Write, store.write(path, request))
            .await?;

        let count = document.entry_count();
        tracing::info!(
            path,
            store = store.name(),
            count,
            sha = %version,
            "Saved {}",
            kind.key()
        );

        Ok(SaveOutcome {
            count,
            version,
            saved_at,
        })
    }

    async fn bounded<T>(
        &self,
        step: UpstreamStep,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, AppError> {
        // The HTTP client carries the same deadline and may report it first.
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(StoreError::Timeout)) | Err(_) => {
                tracing::error!("Content store {} timed out after {:?}", step.as_str(), self.timeout);
                Err(AppError::Timeout {
                    step,
                    after: self.timeout,
                })
            }
            Ok(Err(e)) => Err(AppError::from_store(step, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::errors::codes;
    use crate::models::{Color, ResourceEntry, ResourcesDocument};
    use crate::store::{MemoryStore, StoredFile};

    const PATH: &str = "src/data/resources.json";
    const PASSWORD: &str = "ebrtq2025";

    fn resource(id: &str, title: &str) -> ResourceEntry {
        ResourceEntry {
            id: id.to_string(),
            title: title.to_string(),
            url: format!("https://example.org/{}", id),
            provider: "Capital Area Pride".to_string(),
            category: "Community".to_string(),
            icon: "Users".to_string(),
            color: Color::Purple,
            description: None,
        }
    }

    fn document(titles: &[&str]) -> ResourcesDocument {
        ResourcesDocument {
            resources: titles
                .iter()
                .enumerate()
                .map(|(i, title)| resource(&(i + 1).to_string(), title))
                .collect(),
        }
    }

    fn updater(store: Arc<dyn ContentStore>) -> ContentUpdater {
        ContentUpdater::new(
            Some(store),
            Some(PASSWORD.to_string()),
            Duration::from_secs(10),
        )
    }

    fn stored_document(store: &MemoryStore) -> ResourcesDocument {
        let file = store.snapshot(PATH).unwrap();
        serde_json::from_slice(&file.content).unwrap()
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert_with_token(
            PATH,
            br#"{"resources":[{"id":"1","title":"Old","url":"https://old.example","provider":"P","type":"Housing","icon":"Home","color":"green"}]}"#,
            VersionToken::new("abc123"),
        );
        store
    }

    #[tokio::test]
    async fn test_save_two_entries_changes_token() {
        let store = seeded_store();
        let updater = updater(store.clone());

        let outcome = updater
            .save(PATH, PASSWORD, &document(&["Trevor Project", "HAART"]))
            .await
            .unwrap();

        assert_eq!(outcome.count, 2);
        assert_ne!(outcome.version, VersionToken::new("abc123"));
        assert_eq!(store.snapshot(PATH).unwrap().sha, outcome.version);
    }

    #[tokio::test]
    async fn test_round_trip_fidelity() {
        let store = seeded_store();
        let doc = document(&["Trevor Project", "HAART", "Open Health"]);

        updater(store.clone()).save(PATH, PASSWORD, &doc).await.unwrap();

        assert_eq!(stored_document(&store), doc);
        let raw = String::from_utf8(store.snapshot(PATH).unwrap().content).unwrap();
        assert_eq!(raw, serde_json::to_string_pretty(&doc).unwrap());
    }

    #[tokio::test]
    async fn test_commit_message_carries_timestamp() {
        let store = seeded_store();
        let outcome = updater(store.clone())
            .save(PATH, PASSWORD, &document(&["A"]))
            .await
            .unwrap();

        let messages = store.commit_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0],
            format!(
                "Update resources - {}",
                outcome.saved_at.to_rfc3339_opts(SecondsFormat::Millis, true)
            )
        );
    }

    #[tokio::test]
    async fn test_wrong_password_has_no_side_effect() {
        let store = seeded_store();
        let before = store.snapshot(PATH).unwrap();

        let err = updater(store.clone())
            .save(PATH, "guess", &document(&["A"]))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), codes::UNAUTHORIZED);
        assert_eq!(store.read_count(), 0);
        assert_eq!(store.write_count(), 0);
        let after = store.snapshot(PATH).unwrap();
        assert_eq!(after.sha, before.sha);
        assert_eq!(after.content, before.content);
    }

    #[tokio::test]
    async fn test_invalid_document_rejected_before_upstream() {
        let store = seeded_store();
        let err = updater(store.clone())
            .save(PATH, PASSWORD, &document(&["A", ""]))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), codes::VALIDATION_ERROR);
        assert_eq!(store.read_count(), 0);
    }

    #[tokio::test]
    async fn test_read_failure_never_writes() {
        let store = Arc::new(MemoryStore::new());

        let err = updater(store.clone())
            .save(PATH, PASSWORD, &document(&["A"]))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), codes::UPSTREAM_READ_ERROR);
        assert_eq!(store.read_count(), 1);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_store_is_configuration_error() {
        let updater = ContentUpdater::new(None, Some(PASSWORD.to_string()), Duration::from_secs(10));
        let err = updater
            .save(PATH, PASSWORD, &document(&["A"]))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), codes::CONFIGURATION_ERROR);
    }

    #[tokio::test]
    async fn test_empty_list_is_persisted() {
        let store = seeded_store();
        let outcome = updater(store.clone())
            .save(PATH, PASSWORD, &ResourcesDocument::default())
            .await
            .unwrap();

        assert_eq!(outcome.count, 0);
        assert!(stored_document(&store).resources.is_empty());
    }

    #[tokio::test]
    async fn test_sequential_saves_chain_tokens() {
        let store = seeded_store();
        let updater = updater(store.clone());
        let doc = document(&["Trevor Project", "HAART"]);

        let first = updater.save(PATH, PASSWORD, &doc).await.unwrap();
        let second = updater.save(PATH, PASSWORD, &doc).await.unwrap();

        assert_ne!(first.version, second.version);
        assert_eq!(store.snapshot(PATH).unwrap().sha, second.version);
        assert_eq!(stored_document(&store), doc);
        assert_eq!(store.write_count(), 2);
    }

    /// Lets another writer commit between this save's read and its write.
    struct InterleavingStore {
        inner: Arc<MemoryStore>,
        interloper: ResourcesDocument,
        fired: AtomicBool,
        interloper_token: std::sync::Mutex<Option<VersionToken>>,
    }

    #[async_trait]
    impl ContentStore for InterleavingStore {
        async fn read(&self, path: &str) -> Result<StoredFile, StoreError> {
            let file = self.inner.read(path).await?;
            if !self.fired.swap(true, Ordering::SeqCst) {
                let json = serde_json::to_string_pretty(&self.interloper).unwrap();
                let sha = self
                    .inner
                    .write(
                        path,
                        WriteRequest {
                            content: EncodedContent::encode(json.as_bytes()),
                            sha: file.sha.clone(),
                            message: "concurrent edit".to_string(),
                        },
                    )
                    .await?;
                *self.interloper_token.lock().unwrap() = Some(sha);
            }
            Ok(file)
        }

        async fn write(&self, path: &str, request: WriteRequest) -> Result<VersionToken, StoreError> {
            self.inner.write(path, request).await
        }

        fn name(&self) -> &'static str {
            "interleaving"
        }
    }

    #[tokio::test]
    async fn test_racing_writer_gets_conflict() {
        let inner = seeded_store();
        let winner = document(&["Written by A"]);
        let store = Arc::new(InterleavingStore {
            inner: inner.clone(),
            interloper: winner.clone(),
            fired: AtomicBool::new(false),
            interloper_token: std::sync::Mutex::new(None),
        });

        let err = updater(store.clone())
            .save(PATH, PASSWORD, &document(&["Written by B"]))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), codes::CONFLICT);
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
        assert_eq!(stored_document(&inner), winner);
        let a_token = store.interloper_token.lock().unwrap().clone().unwrap();
        assert_eq!(inner.snapshot(PATH).unwrap().sha, a_token);
    }

    /// Never answers.
    struct HangingStore {
        writes: AtomicUsize,
    }

    #[async_trait]
    impl ContentStore for HangingStore {
        async fn read(&self, _path: &str) -> Result<StoredFile, StoreError> {
            std::future::pending().await
        }

        async fn write(&self, _path: &str, _request: WriteRequest) -> Result<VersionToken, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn test_read_timeout_is_reported() {
        let store = Arc::new(HangingStore {
            writes: AtomicUsize::new(0),
        });
        let updater = ContentUpdater::new(
            Some(store.clone()),
            Some(PASSWORD.to_string()),
            Duration::from_millis(50),
        );

        let err = updater
            .save(PATH, PASSWORD, &document(&["A"]))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), codes::UPSTREAM_TIMEOUT);
        assert!(matches!(
            err,
            AppError::Timeout {
                step: UpstreamStep::Read,
                ..
            }
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    /// Reads normally; the write hits the client deadline.
    struct ClientTimeoutStore {
        inner: Arc<MemoryStore>,
    }

    #[async_trait]
    impl ContentStore for ClientTimeoutStore {
        async fn read(&self, path: &str) -> Result<StoredFile, StoreError> {
            self.inner.read(path).await
        }

        async fn write(&self, _path: &str, _request: WriteRequest) -> Result<VersionToken, StoreError> {
            Err(StoreError::Timeout)
        }

        fn name(&self) -> &'static str {
            "client-timeout"
        }
    }

    #[tokio::test]
    async fn test_client_deadline_is_reported_as_timeout() {
        let inner = seeded_store();
        let store = Arc::new(ClientTimeoutStore {
            inner: inner.clone(),
        });

        let err = updater(store)
            .save(PATH, PASSWORD, &document(&["A"]))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::GATEWAY_TIMEOUT);
        assert!(matches!(
            err,
            AppError::Timeout {
                step: UpstreamStep::Write,
                ..
            }
        ));
        assert_eq!(inner.snapshot(PATH).unwrap().sha, VersionToken::new("abc123"));
    }
}
