//! Overlay configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{OverlayError, Result};
use crate::queue::{QueueConfig, QueuePolicy};
use crate::render::RendererConfig;

pub const DEFAULT_LIVE_URL: &str = "ws://localhost:8000/ws";
pub const DEFAULT_SEARCH_URL: &str = "ws://localhost:8000/ws/search";
pub const DEFAULT_TYPING_INTERVAL_MS: u64 = 100;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;
pub const DEFAULT_ASSISTANT_NAME: &str = "Genix Support";

/// Endpoints and timing of the overlay. Every field has a default, so a
/// partial file deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub live_url: String,
    pub search_url: String,
    pub typing_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub queue_policy: QueuePolicy,
    pub assistant_name: String,
    pub show_feedback: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            live_url: DEFAULT_LIVE_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            typing_interval_ms: DEFAULT_TYPING_INTERVAL_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            queue_policy: QueuePolicy::default(),
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            show_feedback: true,
        }
    }
}

impl OverlayConfig {
    pub fn validate(&self) -> Result<()> {
        validate_ws_url("live_url", &self.live_url)?;
        validate_ws_url("search_url", &self.search_url)?;
        if self.assistant_name.trim().is_empty() {
            return Err(OverlayError::InvalidConfig(
                "assistant_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn typing_interval(&self) -> Duration {
        Duration::from_millis(self.typing_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            interval: self.typing_interval(),
            show_feedback: self.show_feedback,
        }
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            settle_delay: self.settle_delay(),
            policy: self.queue_policy,
            assistant_name: self.assistant_name.clone(),
        }
    }
}

fn validate_ws_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| OverlayError::InvalidConfig(format!("{} '{}': {}", field, value, e)))?;
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(OverlayError::InvalidConfig(format!(
            "{} must use ws:// or wss://, got '{}://'",
            field, other
        ))),
    }
}
