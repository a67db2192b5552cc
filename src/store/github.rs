//! GitHub contents API store.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{decode_content, ContentStore, StoreError, StoredFile, VersionToken, WriteRequest};

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Repository coordinates for the content files.
#[derive(Debug, Clone)]
pub struct GitHubRepo {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

/// Store backed by one branch of a GitHub repository.
pub struct GitHubStore {
    client: Client,
    repo: GitHubRepo,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateContentsBody<'a> {
    message: &'a str,
    content: &'a str,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct UpdateContentsResponse {
    content: UpdatedFile,
}

#[derive(Debug, Deserialize)]
struct UpdatedFile {
    sha: String,
}

impl GitHubStore {
    pub fn new(client: Client, repo: GitHubRepo, token: impl Into<String>) -> Self {
        Self {
            client,
            repo,
            token: token.into(),
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.repo.api_url.trim_end_matches('/'),
            self.repo.owner,
            self.repo.repo,
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, ACCEPT)
            .header(header::USER_AGENT, "ebrtq-backend")
            .header("X-GitHub-Api-Version", API_VERSION)
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Transport(err.to_string())
    }
}

fn malformed(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Malformed(err.to_string())
    }
}

/// Files above 1 MB come back with `encoding: "none"` and no inline
/// content; only the sha is needed to write over them.
fn stored_file(file: ContentsResponse) -> Result<StoredFile, StoreError> {
    let content = match file.encoding.as_deref() {
        Some("base64") | None => decode_content(&file.content)?,
        Some("none") => Vec::new(),
        Some(other) => {
            return Err(StoreError::Malformed(format!(
                "unsupported content encoding '{}'",
                other
            )))
        }
    };

    Ok(StoredFile {
        sha: VersionToken::new(file.sha),
        content,
    })
}

#[async_trait]
impl ContentStore for GitHubStore {
    async fn read(&self, path: &str) -> Result<StoredFile, StoreError> {
        let response = self
            .authorized(self.client.get(self.contents_url(path)))
            .query(&[("ref", self.repo.branch.as_str())])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let file: ContentsResponse = response
            .json()
            .await
            .map_err(malformed)?;

        stored_file(file)
    }

    async fn write(&self, path: &str, request: WriteRequest) -> Result<VersionToken, StoreError> {
        let body = UpdateContentsBody {
            message: &request.message,
            content: request.content.as_str(),
            sha: request.sha.as_str(),
            branch: &self.repo.branch,
        };

        let response = self
            .authorized(self.client.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            let detail = response.text().await.unwrap_or_default();
            return Err(StoreError::Conflict { detail });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let updated: UpdateContentsResponse = response
            .json()
            .await
            .map_err(malformed)?;

        Ok(VersionToken::new(updated.content.sha))
    }

    fn name(&self) -> &'static str {
        "github"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(api_url: &str) -> GitHubStore {
        GitHubStore::new(
            Client::new(),
            GitHubRepo {
                api_url: api_url.to_string(),
                owner: "JaneAdora".to_string(),
                repo: "ebrtq".to_string(),
                branch: "main".to_string(),
            },
            "ghp_test",
        )
    }

    #[test]
    fn test_contents_url() {
        let store = store("https://api.github.com/");
        assert_eq!(
            store.contents_url("/src/data/resources.json"),
            "https://api.github.com/repos/JaneAdora/ebrtq/contents/src/data/resources.json"
        );
    }

    #[test]
    fn test_update_body_shape() {
        let body = UpdateContentsBody {
            message: "Update resources - 2025-10-04T12:00:00Z",
            content: "e30=",
            sha: "abc123",
            branch: "main",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["sha"], "abc123");
        assert_eq!(json["content"], "e30=");
        assert_eq!(json["branch"], "main");
    }

    #[test]
    fn test_contents_response_parses_github_payload() {
        let payload = r#"{
            "type": "file",
            "encoding": "base64",
            "size": 16,
            "name": "resources.json",
            "path": "src/data/resources.json",
            "content": "eyJyZXNvdXJj\nZXMiOltdfQ==\n",
            "sha": "abc123"
        }"#;
        let parsed: ContentsResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.sha, "abc123");
        assert_eq!(
            decode_content(&parsed.content).unwrap(),
            br#"{"resources":[]}"#
        );
    }

    #[test]
    fn test_large_file_without_inline_content_keeps_sha() {
        let payload = r#"{"type": "file", "encoding": "none", "content": "", "sha": "big001"}"#;
        let file = stored_file(serde_json::from_str(payload).unwrap()).unwrap();
        assert_eq!(file.sha, VersionToken::new("big001"));
        assert!(file.content.is_empty());
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let payload = r#"{"encoding": "utf-16", "content": "", "sha": "x"}"#;
        let err = stored_file(serde_json::from_str(payload).unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_client_deadline_maps_to_timeout() {
        use std::time::Duration;

        let app = axum::Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            "late"
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let store = GitHubStore::new(
            client,
            GitHubRepo {
                api_url: format!("http://{}", addr),
                owner: "JaneAdora".to_string(),
                repo: "ebrtq".to_string(),
                branch: "main".to_string(),
            },
            "ghp_test",
        );

        let err = store.read("src/data/resources.json").await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout));
    }
}
