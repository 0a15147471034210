//! Session queue
//!
//! Serializes render jobs for one channel. Each job runs in two phases: the
//! header is materialised and the settle delay elapses, then the body is
//! handed to the typing renderer. Headers and delays are strictly ordered by
//! enqueue time; whether the next header waits for the previous body is
//! decided by [`QueuePolicy`].

mod header;
mod job;

pub use header::{
    CHAT_MESSAGE_CLASS, ERROR_BOX_CLASS, SEARCH_BOX_CLASS, header_block, header_class,
    header_nodes,
};
pub use job::{JobTarget, RenderJob};

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{OverlayError, Result};
use crate::render::chrome::byline;
use crate::render::{StreamHandle, TypingRenderer};
use crate::surface::{ContainerId, ContainerSpec, SurfaceHandle};

pub const RESPONSE_BOX_CLASS: &str = "response-box";
pub const SEARCH_RESULT_CLASS: &str = "search-result";
pub const ANALYSIS_BOX_CLASS: &str = "analysis-box";

/// Whether a job's body must finish before the next job's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicy {
    /// Await the full body stream before the next job
    #[default]
    Sequential,
    /// Start the body and move on once the settle delay has elapsed
    Overlapping,
}

impl QueuePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Overlapping => "overlapping",
        }
    }
}

impl fmt::Display for QueuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueuePolicy {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "overlapping" => Ok(Self::Overlapping),
            other => Err(OverlayError::InvalidConfig(format!(
                "unknown queue policy '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Pause between a header and its body
    pub settle_delay: Duration,
    pub policy: QueuePolicy,
    pub assistant_name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1000),
            policy: QueuePolicy::default(),
            assistant_name: "Genix Support".to_string(),
        }
    }
}

#[derive(Debug)]
enum Command {
    Render(Box<RenderJob>),
    Close,
}

/// Cloneable handle for submitting jobs.
#[derive(Debug, Clone)]
pub struct JobSender {
    tx: mpsc::UnboundedSender<Command>,
    closed: Arc<AtomicBool>,
}

impl JobSender {
    pub fn send(&self, job: RenderJob) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(OverlayError::QueueClosed);
        }
        self.tx
            .send(Command::Render(Box::new(job)))
            .map_err(|_| OverlayError::QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}

/// FIFO of render jobs drained by one worker task.
pub struct SessionQueue {
    name: String,
    sender: JobSender,
    worker: Option<JoinHandle<()>>,
}

impl SessionQueue {
    /// Start the worker task.
    pub fn spawn(
        name: impl Into<String>,
        surface: SurfaceHandle,
        renderer: TypingRenderer,
        config: QueueConfig,
    ) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            name: name.clone(),
            surface,
            renderer,
            config,
        };
        let handle = tokio::spawn(worker.run(rx));

        Self {
            name,
            sender: JobSender {
                tx,
                closed: Arc::new(AtomicBool::new(false)),
            },
            worker: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enqueue(&self, job: RenderJob) -> Result<()> {
        self.sender.send(job)
    }

    pub fn sender(&self) -> JobSender {
        self.sender.clone()
    }

    /// Stop accepting jobs, finish the ones already queued and wait for any
    /// body still streaming.
    pub async fn close(mut self) {
        self.sender.closed.store(true, Ordering::SeqCst);
        let _ = self.sender.tx.send(Command::Close);
        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.await
        {
            warn!(queue = %self.name, "Queue worker ended abnormally: {}", e);
        }
    }
}

impl Drop for SessionQueue {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

struct Worker {
    name: String,
    surface: SurfaceHandle,
    renderer: TypingRenderer,
    config: QueueConfig,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Command>) {
        info!(queue = %self.name, policy = %self.config.policy, "Session queue started");
        let mut in_flight: Vec<StreamHandle> = Vec::new();

        while let Some(command) = rx.recv().await {
            let job = match command {
                Command::Render(job) => job,
                Command::Close => break,
            };

            match self.process(*job).await {
                Ok(Some(handle)) => in_flight.push(handle),
                Ok(None) => {}
                Err(e) => warn!(queue = %self.name, "Skipping render job: {}", e),
            }
            in_flight.retain(|handle| !handle.is_finished());
        }

        for handle in in_flight {
            handle.wait().await;
        }
        info!(queue = %self.name, "Session queue stopped");
    }

    async fn process(&self, job: RenderJob) -> Result<Option<StreamHandle>> {
        let event = &job.event;
        let now = Local::now();

        let nested = match &job.target {
            JobTarget::Fresh => {
                let header = self
                    .surface
                    .create_container(ContainerSpec::new(header_class(&event.kind())))?;
                for node in header_nodes(event, &now, &self.config.assistant_name) {
                    self.surface.append(&header, node)?;
                }
                None
            }
            JobTarget::Keyed(container) => {
                if !self.surface.contains(container) {
                    return Err(OverlayError::MissingTarget(container.to_string()));
                }
                let block = header_block(event, &now, &self.config.assistant_name);
                self.surface.append(container, block.into())?;
                let analysis = self.surface.create_container(
                    ContainerSpec::new(ANALYSIS_BOX_CLASS).nested_in(container.clone()),
                )?;
                Some(analysis)
            }
        };
        self.surface.scroll_to_bottom();
        debug!(queue = %self.name, source = %event.source, "Header inserted");

        tokio::time::sleep(self.config.settle_delay).await;

        let body = match nested {
            Some(analysis) => analysis,
            None => self.response_box()?,
        };

        match self.config.policy {
            QueuePolicy::Sequential => {
                let outcome = self.renderer.render(body, job.body()).await;
                debug!(
                    queue = %self.name,
                    appended = outcome.appended,
                    completed = outcome.completed,
                    "Body streamed"
                );
                Ok(None)
            }
            QueuePolicy::Overlapping => Ok(Some(self.renderer.spawn(body, job.body()))),
        }
    }

    fn response_box(&self) -> Result<ContainerId> {
        let id = self
            .surface
            .create_container(ContainerSpec::new(RESPONSE_BOX_CLASS))?;
        for node in byline(&self.config.assistant_name) {
            self.surface.append(&id, node)?;
        }
        Ok(id)
    }
}
