//! Dispatch policy trait
//!
//! A listener owns the connection; its policy owns the payload shape. The
//! live and search channels differ only in their policy.

use super::types::{ChannelKind, Notice};
use crate::error::Result;
use crate::queue::{JobTarget, RenderJob};

/// What one inbound payload turned into.
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Jobs to enqueue, in payload order
    pub jobs: Vec<RenderJob>,
    /// Signal for the user that is not rendered on the surface
    pub notice: Option<Notice>,
    /// Whether the chat panel should be opened
    pub open_panel: bool,
}

impl Dispatch {
    pub fn jobs(jobs: Vec<RenderJob>) -> Self {
        Self {
            jobs,
            ..Default::default()
        }
    }

    pub fn notice(notice: Notice) -> Self {
        Self {
            notice: Some(notice),
            ..Default::default()
        }
    }

    pub fn with_open_panel(mut self) -> Self {
        self.open_panel = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.notice.is_none()
    }
}

/// Decodes the payloads of one channel.
///
/// # Example
///
/// ```ignore
/// struct EchoPolicy;
///
/// impl DispatchPolicy for EchoPolicy {
///     fn channel(&self) -> ChannelKind {
///         ChannelKind::Live
///     }
///
///     fn dispatch(&self, payload: &str) -> Result<Dispatch> {
///         let event: Event = serde_json::from_str(payload)?;
///         Ok(Dispatch::jobs(vec![RenderJob::fresh(event)]))
///     }
/// }
/// ```
pub trait DispatchPolicy: Send + Sync + 'static {
    fn channel(&self) -> ChannelKind;

    /// Decode one text frame. An error means the frame is dropped; the
    /// connection stays open.
    fn dispatch(&self, payload: &str) -> Result<Dispatch>;

    /// Called just before a text frame is written to the connection.
    fn before_send(&self, _payload: &str) {}

    /// Called for the target of a dispatched job that could not be enqueued.
    fn discard(&self, _target: &JobTarget) {}
}
