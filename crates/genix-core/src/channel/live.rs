//! Live feed policy.

use super::traits::{Dispatch, DispatchPolicy};
use super::types::ChannelKind;
use crate::error::Result;
use crate::models::Event;
use crate::queue::RenderJob;

/// One event per frame, rendered into fresh containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LivePolicy;

impl DispatchPolicy for LivePolicy {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Live
    }

    fn dispatch(&self, payload: &str) -> Result<Dispatch> {
        let event: Event = serde_json::from_str(payload)?;
        Ok(Dispatch::jobs(vec![RenderJob::fresh(event)]).with_open_panel())
    }
}
