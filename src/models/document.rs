//! Content documents and the save request/response bodies.
//!
//! Each concern lives in its own JSON file: `{"resources": [...]}` and
//! `{"events": [...]}`.

use std::collections::HashSet;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{EventEntry, ResourceEntry};
use crate::calendar::check_event_times;
use crate::errors::AppError;

/// Which document a request concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Resources,
    Events,
}

impl ContentKind {
    /// Top-level key of the document, also used in responses and commit messages.
    pub fn key(&self) -> &'static str {
        match self {
            ContentKind::Resources => "resources",
            ContentKind::Events => "events",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ContentKind::Resources => "Resources",
            ContentKind::Events => "Events",
        }
    }
}

/// A whole stored document.
pub trait ContentDocument: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ContentKind;

    /// Number of entries in the document.
    fn entry_count(&self) -> usize;

    /// Schema checks beyond what deserialization enforces.
    fn validate(&self) -> Result<(), AppError>;
}

/// `{"resources": [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourcesDocument {
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
}

/// `{"events": [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventsDocument {
    #[serde(default)]
    pub events: Vec<EventEntry>,
}

impl ContentDocument for ResourcesDocument {
    const KIND: ContentKind = ContentKind::Resources;

    fn entry_count(&self) -> usize {
        self.resources.len()
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        for resource in &self.resources {
            check_entry(&mut seen, &resource.id, &resource.title, &resource.url)?;
            if resource.provider.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "Resource {} needs a provider",
                    resource.id
                )));
            }
            if resource.category.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "Resource {} needs a type",
                    resource.id
                )));
            }
        }
        Ok(())
    }
}

impl ContentDocument for EventsDocument {
    const KIND: ContentKind = ContentKind::Events;

    fn entry_count(&self) -> usize {
        self.events.len()
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        for event in &self.events {
            check_entry(&mut seen, &event.id, &event.title, &event.url)?;
            check_event_times(event)
                .map_err(|e| AppError::Validation(format!("Event {}: {}", event.id, e)))?;
        }
        Ok(())
    }
}

const URL_SCHEMES: [&str; 4] = ["https://", "http://", "mailto:", "tel:"];

fn check_entry<'a>(
    seen: &mut HashSet<&'a str>,
    id: &'a str,
    title: &str,
    url: &str,
) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::Validation("Every entry needs an id".to_string()));
    }
    if !seen.insert(id) {
        return Err(AppError::Validation(format!("Duplicate id {}", id)));
    }
    if title.trim().is_empty() {
        return Err(AppError::Validation(format!("Entry {} needs a title", id)));
    }
    let lower = url.trim().to_ascii_lowercase();
    if !URL_SCHEMES
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
    {
        return Err(AppError::Validation(format!(
            "Entry {} has an invalid url '{}'",
            id, url
        )));
    }
    Ok(())
}

/// Body of `POST /api/save-content`.
#[derive(Debug, Deserialize)]
pub struct SaveResourcesRequest {
    pub resources: Vec<ResourceEntry>,
    pub password: String,
}

/// Body of `POST /api/save-events`.
#[derive(Debug, Deserialize)]
pub struct SaveEventsRequest {
    pub events: Vec<EventEntry>,
    pub password: String,
}

/// A save request split into the credential and the replacement document.
pub trait SaveRequest {
    type Document: ContentDocument;

    fn into_parts(self) -> (String, Self::Document);
}

impl SaveRequest for SaveResourcesRequest {
    type Document = ResourcesDocument;

    fn into_parts(self) -> (String, ResourcesDocument) {
        (
            self.password,
            ResourcesDocument {
                resources: self.resources,
            },
        )
    }
}

impl SaveRequest for SaveEventsRequest {
    type Document = EventsDocument;

    fn into_parts(self) -> (String, EventsDocument) {
        (self.password, EventsDocument { events: self.events })
    }
}
