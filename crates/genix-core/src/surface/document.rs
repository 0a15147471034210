//! In-memory chat surface.

use parking_lot::Mutex;
use std::collections::HashMap;

use super::{ContainerId, ContainerSpec, DisplaySurface};
use crate::content::{MarkupNode, escape_attr};
use crate::error::{OverlayError, Result};

/// Scroll position of the surface, measured in rows from the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollState {
    pub offset_from_bottom: usize,
}

impl ScrollState {
    pub fn is_following(&self) -> bool {
        self.offset_from_bottom == 0
    }
}

#[derive(Debug)]
enum Slot {
    Node(MarkupNode),
    Container(ContainerId),
}

#[derive(Debug)]
struct Container {
    class: String,
    parent: Option<ContainerId>,
    slots: Vec<Slot>,
}

#[derive(Debug, Default)]
struct DocumentState {
    containers: HashMap<ContainerId, Container>,
    roots: Vec<ContainerId>,
    next_id: u64,
    scroll: ScrollState,
    revision: u64,
}

/// Read-only copy of a container subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSnapshot {
    pub id: ContainerId,
    pub class: String,
    pub children: Vec<SnapshotNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotNode {
    Markup(MarkupNode),
    Container(ContainerSnapshot),
}

impl ContainerSnapshot {
    /// Direct markup children, skipping nested containers.
    pub fn markup(&self) -> Vec<MarkupNode> {
        self.children
            .iter()
            .filter_map(|child| match child {
                SnapshotNode::Markup(node) => Some(node.clone()),
                SnapshotNode::Container(_) => None,
            })
            .collect()
    }

    /// Nested container snapshots in order.
    pub fn nested(&self) -> Vec<&ContainerSnapshot> {
        self.children
            .iter()
            .filter_map(|child| match child {
                SnapshotNode::Container(container) => Some(container),
                SnapshotNode::Markup(_) => None,
            })
            .collect()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class.split_whitespace().any(|c| c == class)
    }

    /// Serialize the subtree, rendering containers as `div`s.
    pub fn to_html(&self) -> String {
        let mut out = format!(
            "<div class=\"{}\" data-container=\"{}\">",
            escape_attr(&self.class),
            escape_attr(self.id.as_str())
        );
        for child in &self.children {
            match child {
                SnapshotNode::Markup(node) => out.push_str(&node.to_html()),
                SnapshotNode::Container(container) => out.push_str(&container.to_html()),
            }
        }
        out.push_str("</div>");
        out
    }
}

/// Surface kept entirely in memory; front ends draw from [`snapshot`].
///
/// [`snapshot`]: MemorySurface::snapshot
#[derive(Debug, Default)]
pub struct MemorySurface {
    state: Mutex<DocumentState>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every top-level container, in append order.
    pub fn snapshot(&self) -> Vec<ContainerSnapshot> {
        let state = self.state.lock();
        state
            .roots
            .iter()
            .filter_map(|id| snapshot_of(&state, id))
            .collect()
    }

    pub fn container(&self, id: &ContainerId) -> Option<ContainerSnapshot> {
        let state = self.state.lock();
        snapshot_of(&state, id)
    }

    /// Number of top-level containers.
    pub fn len(&self) -> usize {
        self.state.lock().roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped on every mutation; lets front ends skip redundant redraws.
    pub fn revision(&self) -> u64 {
        self.state.lock().revision
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.state.lock().scroll
    }

    /// Move the viewport; positive `rows` scroll up, away from the bottom.
    pub fn scroll_by(&self, rows: isize) {
        let mut state = self.state.lock();
        let offset = state.scroll.offset_from_bottom;
        state.scroll.offset_from_bottom = offset.saturating_add_signed(rows);
        state.revision += 1;
    }
}

impl DisplaySurface for MemorySurface {
    fn create_container(&self, spec: ContainerSpec) -> Result<ContainerId> {
        let mut state = self.state.lock();

        let id = match spec.key {
            Some(key) => ContainerId::new(key),
            None => {
                state.next_id += 1;
                ContainerId::new(format!("container-{}", state.next_id))
            }
        };
        if state.containers.contains_key(&id) {
            return Err(OverlayError::ContainerExists(id.to_string()));
        }

        match &spec.parent {
            Some(parent) => {
                let parent_container = state
                    .containers
                    .get_mut(parent)
                    .ok_or_else(|| OverlayError::MissingTarget(parent.to_string()))?;
                parent_container.slots.push(Slot::Container(id.clone()));
            }
            None => state.roots.push(id.clone()),
        }

        state.containers.insert(
            id.clone(),
            Container {
                class: spec.class,
                parent: spec.parent,
                slots: Vec::new(),
            },
        );
        state.revision += 1;
        Ok(id)
    }

    fn contains(&self, id: &ContainerId) -> bool {
        self.state.lock().containers.contains_key(id)
    }

    fn append(&self, id: &ContainerId, node: MarkupNode) -> Result<()> {
        let mut state = self.state.lock();
        let container = state
            .containers
            .get_mut(id)
            .ok_or_else(|| OverlayError::MissingTarget(id.to_string()))?;

        match (container.slots.last_mut(), node) {
            (Some(Slot::Node(MarkupNode::Text(trailing))), MarkupNode::Text(text)) => {
                trailing.push_str(&text);
            }
            (_, node) => container.slots.push(Slot::Node(node)),
        }
        state.revision += 1;
        Ok(())
    }

    fn remove_by_class(&self, id: &ContainerId, class: &str) -> bool {
        let mut state = self.state.lock();
        let Some(container) = state.containers.get_mut(id) else {
            return false;
        };

        let position = container.slots.iter().position(|slot| {
            matches!(slot, Slot::Node(MarkupNode::Element(element)) if element.has_class(class))
        });
        let Some(position) = position else {
            return false;
        };

        container.slots.remove(position);
        state.revision += 1;
        true
    }

    fn remove_container(&self, id: &ContainerId) -> bool {
        let mut state = self.state.lock();
        let Some(parent) = state.containers.get(id).map(|c| c.parent.clone()) else {
            return false;
        };

        match parent {
            Some(parent) => {
                if let Some(parent_container) = state.containers.get_mut(&parent) {
                    parent_container
                        .slots
                        .retain(|slot| !matches!(slot, Slot::Container(child) if child == id));
                }
            }
            None => state.roots.retain(|root| root != id),
        }

        let mut pending = vec![id.clone()];
        while let Some(next) = pending.pop() {
            if let Some(container) = state.containers.remove(&next) {
                pending.extend(container.slots.into_iter().filter_map(|slot| match slot {
                    Slot::Container(child) => Some(child),
                    Slot::Node(_) => None,
                }));
            }
        }
        state.revision += 1;
        true
    }

    fn scroll_to_bottom(&self) {
        let mut state = self.state.lock();
        state.scroll.offset_from_bottom = 0;
        state.revision += 1;
    }
}

fn snapshot_of(state: &DocumentState, id: &ContainerId) -> Option<ContainerSnapshot> {
    let container = state.containers.get(id)?;
    let children = container
        .slots
        .iter()
        .filter_map(|slot| match slot {
            Slot::Node(node) => Some(SnapshotNode::Markup(node.clone())),
            Slot::Container(child) => snapshot_of(state, child).map(SnapshotNode::Container),
        })
        .collect();

    Some(ContainerSnapshot {
        id: id.clone(),
        class: container.class.clone(),
        children,
    })
}
