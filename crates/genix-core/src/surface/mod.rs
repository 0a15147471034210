//! Display surface and panel
//!
//! The chat surface is the one piece of shared mutable display state. It is
//! passed explicitly as a [`SurfaceHandle`] to every component that writes to
//! it (queue workers, typing sessions, the search dispatcher), never looked up
//! ambiently.
//!
//! # Architecture
//!
//! ```text
//! surface (roots, in append order)
//!  ├── container "chat-message"      <- job header
//!  ├── container "response-box"      <- streamed body
//!  └── container "search-result" (keyed)
//!       ├── header nodes
//!       └── container "analysis-box" <- streamed body
//! ```

mod document;
mod panel;

pub use document::{ContainerSnapshot, MemorySurface, ScrollState, SnapshotNode};
pub use panel::{PanelController, PanelState};

use std::fmt;
use std::sync::Arc;

use crate::content::MarkupNode;
use crate::error::Result;

/// Handle of a container on the surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options for creating a container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub class: String,
    /// Fixed key; a generated id is used when absent
    pub key: Option<String>,
    /// Parent container; top-level when absent
    pub parent: Option<ContainerId>,
}

impl ContainerSpec {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            key: None,
            parent: None,
        }
    }

    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn nested_in(mut self, parent: ContainerId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Container lifecycle primitives the render engine needs.
pub trait DisplaySurface: Send + Sync {
    /// Create a container and append it to its parent (or the surface root).
    fn create_container(&self, spec: ContainerSpec) -> Result<ContainerId>;

    /// Whether the container is still attached.
    fn contains(&self, id: &ContainerId) -> bool;

    /// Append a node to a container. Text merges into trailing text.
    fn append(&self, id: &ContainerId, node: MarkupNode) -> Result<()>;

    /// Remove the first direct child element carrying `class`.
    fn remove_by_class(&self, id: &ContainerId, class: &str) -> bool;

    /// Detach a container and everything nested in it.
    fn remove_container(&self, id: &ContainerId) -> bool;

    /// Force the enclosing scroll region to its maximum offset.
    fn scroll_to_bottom(&self);
}

/// Shared handle to the display surface.
pub type SurfaceHandle = Arc<dyn DisplaySurface>;
