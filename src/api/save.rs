//! Save endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::{
    ContentDocument, ContentKind, SaveEventsRequest, SaveRequest, SaveResourcesRequest,
};
use crate::updater::SaveOutcome;
use crate::AppState;

/// Body returned after a successful save.
///
/// The entry count is keyed by the document kind:
/// `{"success":true,"message":"Resources saved successfully","resources":2,...}`.
#[derive(Debug)]
pub struct SaveResponse {
    pub kind: ContentKind,
    pub outcome: SaveOutcome,
}

impl SaveResponse {
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(true));
        body.insert(
            "message".to_string(),
            Value::String(format!("{} saved successfully", self.kind.title())),
        );
        body.insert(self.kind.key().to_string(), Value::from(self.outcome.count));
        body.insert(
            "savedAt".to_string(),
            Value::String(self.outcome.saved_at.to_rfc3339()),
        );
        body.insert(
            "version".to_string(),
            Value::String(self.outcome.version.to_string()),
        );
        Value::Object(body)
    }
}

impl IntoResponse for SaveResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self.to_json())).into_response()
    }
}

/// POST /api/save-content - Replace the resources document.
pub async fn save_resources(
    State(state): State<AppState>,
    body: Result<Json<SaveResourcesRequest>, JsonRejection>,
) -> Result<SaveResponse, AppError> {
    save(&state, body).await
}

/// POST /api/save-events - Replace the events document.
pub async fn save_events(
    State(state): State<AppState>,
    body: Result<Json<SaveEventsRequest>, JsonRejection>,
) -> Result<SaveResponse, AppError> {
    save(&state, body).await
}

/// Any other method on a save endpoint.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn save<R>(
    state: &AppState,
    body: Result<Json<R>, JsonRejection>,
) -> Result<SaveResponse, AppError>
where
    R: SaveRequest + DeserializeOwned,
{
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!("Rejected save body: {}", rejection.body_text());
        AppError::BadRequest(rejection.body_text())
    })?;

    let kind = <R::Document as ContentDocument>::KIND;
    let (password, document) = request.into_parts();
    let path = state.config.document_path(kind);

    let outcome = state.updater.save(path, &password, &document).await?;

    Ok(SaveResponse { kind, outcome })
}
