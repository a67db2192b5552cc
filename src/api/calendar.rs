//! Calendar export endpoints for single events.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;

use super::{success, ApiResult};
use crate::calendar::{google_calendar_url, icalendar_document, EventSchedule};
use crate::errors::AppError;
use crate::models::{ContentKind, EventEntry};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CalendarLink {
    pub url: String,
}

/// GET /api/events/{id}/calendar.ics
pub async fn event_ics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let event = find_event(&state, &id).await?;
    let schedule = EventSchedule::from_event(&event)?;
    let body = icalendar_document(&event, &schedule, Utc::now());

    let disposition = format!("attachment; filename=\"{}.ics\"", file_stem(&event.title));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// GET /api/events/{id}/google-calendar
pub async fn google_calendar_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CalendarLink> {
    let event = find_event(&state, &id).await?;
    let schedule = EventSchedule::from_event(&event)?;
    let url = google_calendar_url(&event, &schedule, &state.config.calendar_timezone);
    success(CalendarLink { url })
}

async fn find_event(state: &AppState, id: &str) -> Result<EventEntry, AppError> {
    let path = state.config.document_path(ContentKind::Events);
    state
        .fetcher
        .fetch_events(path)
        .await?
        .into_iter()
        .find(|event| event.id == id)
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))
}

/// ASCII-only download name derived from the event title.
fn file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let stem = stem
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if stem.is_empty() {
        "event".to_string()
    } else {
        stem
    }
}
