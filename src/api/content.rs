//! Public listing endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::{ContentKind, EventEntry, ResourceEntry};
use crate::AppState;

/// GET /api/resources - Resources via the content fetcher.
pub async fn list_resources(State(state): State<AppState>) -> ApiResult<Vec<ResourceEntry>> {
    let path = state.config.document_path(ContentKind::Resources);
    let resources = state.fetcher.fetch_resources(path).await?;
    success(resources)
}

/// GET /api/events - Events via the content fetcher, oldest first.
pub async fn list_events(State(state): State<AppState>) -> ApiResult<Vec<EventEntry>> {
    let path = state.config.document_path(ContentKind::Events);
    let events = state.fetcher.fetch_events(path).await?;
    success(events)
}
