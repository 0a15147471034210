//! Search channel policy.
//!
//! A result batch becomes one job per usable row. Rows carrying a keyword
//! get a keyed `search-result` container allocated up front, so that their
//! place on the surface follows arrival order even though their headers are
//! rendered later by the queue.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::{debug, warn};
use uuid::Uuid;

use super::traits::{Dispatch, DispatchPolicy};
use super::types::{ChannelKind, Notice};
use crate::error::{OverlayError, Result};
use crate::models::{Event, EventKind, SearchResultSet};
use crate::queue::{JobTarget, RenderJob, SEARCH_RESULT_CLASS};
use crate::surface::{ContainerSpec, SurfaceHandle};

const NO_MATCHES: &str = "No matching records found.";

pub struct SearchPolicy {
    surface: SurfaceHandle,
    /// Keywords sent and not yet answered, oldest first
    pending: Mutex<VecDeque<String>>,
}

impl SearchPolicy {
    pub fn new(surface: SurfaceHandle) -> Self {
        Self {
            surface,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of sent queries still waiting for a reply.
    pub fn pending_queries(&self) -> usize {
        self.pending.lock().len()
    }

    fn row_job(&self, index: usize, row: serde_json::Value) -> Result<RenderJob> {
        let event: Event = serde_json::from_value(row)?;
        if event.kind() == EventKind::Live {
            return Ok(RenderJob::fresh(event));
        }

        let row_id = event
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("row{}", index));
        let container = self.surface.create_container(
            ContainerSpec::new(SEARCH_RESULT_CLASS).keyed(container_key(&row_id)),
        )?;
        Ok(RenderJob::keyed(event, container))
    }

    fn empty_notice(&self, keyword: Option<String>, message: Option<String>) -> Notice {
        let message = match keyword {
            Some(keyword) => OverlayError::EmptyResult(keyword).to_string(),
            None => message.unwrap_or_else(|| NO_MATCHES.to_string()),
        };
        Notice::info(ChannelKind::Search, message)
    }
}

/// Collision-resistant key for a result row container.
pub fn container_key(row_id: &str) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!(
        "analysis-{}-{}-{}",
        row_id,
        Utc::now().timestamp_millis(),
        &nonce[..8]
    )
}

impl DispatchPolicy for SearchPolicy {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Search
    }

    fn dispatch(&self, payload: &str) -> Result<Dispatch> {
        // The server answers queries in order, one reply each.
        let keyword = self.pending.lock().pop_front();
        let result: SearchResultSet = serde_json::from_str(payload)?;

        if !result.is_success() {
            let reason = result
                .message
                .unwrap_or_else(|| format!("status '{}'", result.status));
            warn!("Search failed: {}", reason);
            return Ok(Dispatch::notice(Notice::error(
                ChannelKind::Search,
                format!("Search failed: {}", reason),
            )));
        }

        if result.results.is_empty() {
            debug!("Search returned no rows");
            return Ok(Dispatch::notice(self.empty_notice(keyword, result.message)));
        }

        let total = result.results.len();
        let mut jobs = Vec::with_capacity(total);
        for (index, row) in result.results.into_iter().enumerate() {
            match self.row_job(index, row) {
                Ok(job) => jobs.push(job),
                Err(e) => warn!("Skipping search row {}: {}", index, e),
            }
        }

        if jobs.is_empty() {
            return Ok(Dispatch::notice(Notice::warning(
                ChannelKind::Search,
                format!("All {} search results were malformed", total),
            )));
        }

        let dispatch = Dispatch::jobs(jobs).with_open_panel();
        if dispatch.jobs.len() < total {
            let skipped = total - dispatch.jobs.len();
            return Ok(Dispatch {
                notice: Some(Notice::warning(
                    ChannelKind::Search,
                    format!("Skipped {} malformed search results", skipped),
                )),
                ..dispatch
            });
        }
        Ok(dispatch)
    }

    fn before_send(&self, payload: &str) {
        self.pending.lock().push_back(payload.to_string());
    }

    fn discard(&self, target: &JobTarget) {
        if let JobTarget::Keyed(container) = target {
            self.surface.remove_container(container);
        }
    }
}
