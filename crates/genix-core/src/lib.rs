//! Genix overlay core
//!
//! Live support-chat overlay engine: incident events and keyword search
//! results arrive over two websocket channels and are "typed" into a chat
//! surface one content node at a time.
//!
//! # Modules
//!
//! - [`content`]: markup parsing and segmentation into render steps
//! - [`surface`]: the shared display surface and the panel controller
//! - [`render`]: the paced typing renderer
//! - [`queue`]: per-channel FIFO of render jobs
//! - [`channel`]: websocket listeners with live and search policies
//! - [`overlay`]: wiring of all of the above

pub mod channel;
pub mod config;
pub mod content;
pub mod error;
pub mod models;
pub mod overlay;
pub mod queue;
pub mod render;
pub mod surface;

pub use channel::{ChannelKind, ConnectionState, Notice, NoticeLevel};
pub use config::OverlayConfig;
pub use error::{OverlayError, Result};
pub use models::{Event, EventId, EventKind, SearchResultSet};
pub use overlay::Overlay;
pub use queue::{QueuePolicy, RenderJob, SessionQueue};
pub use render::{StreamOutcome, TypingRenderer};
pub use surface::{
    ContainerId, DisplaySurface, MemorySurface, PanelController, PanelState, SurfaceHandle,
};
