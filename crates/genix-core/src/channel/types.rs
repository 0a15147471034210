//! Channel types
//!
//! Identifiers, connection state and user-facing notices shared by both
//! channels.

use serde::{Deserialize, Serialize};

/// Which backend feed a listener serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Unsolicited incident feed
    Live,
    /// Keyword queries and their result batches
    Search,
}

impl ChannelKind {
    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Live => "Live",
            Self::Search => "Search",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Connection lifecycle of one listener. There is no reconnect, so
/// `Disconnected` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    Failed(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed(_))
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    #[default]
    Info,
    Warning,
    Error,
}

/// User-facing signal that is not rendered on the chat surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub channel: ChannelKind,
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(channel: ChannelKind, level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            channel,
            level,
            message: message.into(),
        }
    }

    pub fn info(channel: ChannelKind, message: impl Into<String>) -> Self {
        Self::new(channel, NoticeLevel::Info, message)
    }

    pub fn warning(channel: ChannelKind, message: impl Into<String>) -> Self {
        Self::new(channel, NoticeLevel::Warning, message)
    }

    pub fn error(channel: ChannelKind, message: impl Into<String>) -> Self {
        Self::new(channel, NoticeLevel::Error, message)
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.channel, self.message)
    }
}
