//! Event listing entries.

use serde::{Deserialize, Serialize};

use super::Color;

/// An entry in the events listing.
///
/// Older documents carry a combined `time` display string such as
/// `"6:00 PM - 8:00 PM"`; newer ones use `timeFrom`/`timeTo` in `HH:mm`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EventEntry {
    /// Organization shown for the event, falling back to the provider.
    pub fn organizer(&self) -> Option<&str> {
        self.organization
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.provider.as_deref())
    }
}
