//! Deployment diagnostics.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Report from `GET /api/test-env`. Never contains the token itself.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvReport {
    pub has_github_token: bool,
    pub github_token_length: usize,
    pub github_token_prefix: String,
    pub has_admin_password: bool,
    pub store: String,
    pub env_keys: Vec<String>,
}

impl EnvReport {
    pub fn new(token: Option<&str>, has_admin_password: bool, store: Option<&str>) -> Self {
        let mut env_keys: Vec<String> = std::env::vars_os()
            .filter_map(|(key, _)| key.into_string().ok())
            .filter(|key| key.contains("GITHUB") || key.starts_with("CONTENT_"))
            .collect();
        env_keys.sort();

        Self {
            has_github_token: token.is_some(),
            github_token_length: token.map_or(0, |t| t.chars().count()),
            github_token_prefix: token
                .map(|t| t.chars().take(4).collect())
                .unwrap_or_else(|| "none".to_string()),
            has_admin_password,
            store: store.unwrap_or("none").to_string(),
            env_keys,
        }
    }
}

/// GET /api/test-env
pub async fn test_env(State(state): State<AppState>) -> Json<EnvReport> {
    Json(EnvReport::new(
        state.config.github_token.as_deref(),
        state.config.admin_password.is_some(),
        state.updater.store_name(),
    ))
}
