//! Wire payloads pushed by the backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an event row. The backend sends database ids as integers,
/// but any string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One incident/error notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: Option<EventId>,
    /// Service that raised the incident
    pub source: String,
    /// Short error text, may contain inline markup
    pub error_description: String,
    /// Markup-bearing analysis body, streamed into the chat
    pub response: String,
    #[serde(default)]
    pub search_keyword: Option<String>,
}

/// Styling variant of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Unsolicited incident from the live feed
    Live,
    /// Row matched by a keyword search
    SearchMatch(String),
}

impl Event {
    pub fn new(
        source: impl Into<String>,
        error_description: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            source: source.into(),
            error_description: error_description.into(),
            response: response.into(),
            search_keyword: None,
        }
    }

    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.search_keyword = Some(keyword.into());
        self
    }

    /// A blank or missing keyword means the event is styled as live.
    pub fn kind(&self) -> EventKind {
        match self.search_keyword.as_deref().map(str::trim) {
            Some(keyword) if !keyword.is_empty() => EventKind::SearchMatch(keyword.to_string()),
            _ => EventKind::Live,
        }
    }
}

/// Reply of the search channel.
///
/// Rows stay as raw JSON until dispatch so that one malformed row does not
/// reject the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultSet {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

impl SearchResultSet {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
