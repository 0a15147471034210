//! Render job definition.

use crate::models::Event;
use crate::surface::ContainerId;

/// Where a job's header and body land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTarget {
    /// New top-level containers are created for header and body
    Fresh,
    /// Container pre-allocated by the search channel
    Keyed(ContainerId),
}

/// One queued unit of work: a header derived from the event, then its body.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub event: Event,
    pub target: JobTarget,
}

impl RenderJob {
    pub fn fresh(event: Event) -> Self {
        Self {
            event,
            target: JobTarget::Fresh,
        }
    }

    pub fn keyed(event: Event, container: ContainerId) -> Self {
        Self {
            event,
            target: JobTarget::Keyed(container),
        }
    }

    /// Markup streamed after the header.
    pub fn body(&self) -> &str {
        &self.event.response
    }
}
