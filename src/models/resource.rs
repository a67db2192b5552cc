//! Resource directory entries.

use serde::{Deserialize, Serialize};

use super::Color;

/// Icons the site can render for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Icon {
    Heart,
    Home,
    #[default]
    Users,
    Phone,
    BookOpen,
    Activity,
    Briefcase,
    GraduationCap,
    Shield,
}

impl Icon {
    pub const ALL: [Icon; 9] = [
        Icon::Heart,
        Icon::Home,
        Icon::Users,
        Icon::Phone,
        Icon::BookOpen,
        Icon::Activity,
        Icon::Briefcase,
        Icon::GraduationCap,
        Icon::Shield,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Icon::Heart => "Heart",
            Icon::Home => "Home",
            Icon::Users => "Users",
            Icon::Phone => "Phone",
            Icon::BookOpen => "BookOpen",
            Icon::Activity => "Activity",
            Icon::Briefcase => "Briefcase",
            Icon::GraduationCap => "GraduationCap",
            Icon::Shield => "Shield",
        }
    }

    /// Exact icon name, if it is one of the renderable set.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|icon| icon.as_str() == name)
    }

    /// Resolve a symbolic reference, falling back to [`Icon::Users`].
    pub fn resolve(reference: &str) -> Self {
        Self::parse(reference).unwrap_or_default()
    }
}

/// A link in the resource directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub provider: String,
    #[serde(rename = "type")]
    pub category: String,
    pub icon: String,
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceEntry {
    pub fn icon(&self) -> Icon {
        Icon::resolve(&self.icon)
    }
}
