//! Data models for the community directory content.
//!
//! These models match the JSON documents the site reads, field for field.

mod document;
mod event;
mod resource;

pub use document::*;
pub use event::*;
pub use resource::*;

use serde::{Deserialize, Serialize};

/// Display color from the site's fixed palette.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Blue,
    Pink,
    White,
    Purple,
    Magenta,
    Cyan,
    Green,
}
