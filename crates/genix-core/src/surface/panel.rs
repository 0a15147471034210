//! Chat panel visibility.

use std::sync::atomic::{AtomicBool, Ordering};

/// Open/close/maximize controls of the chat panel.
///
/// The channel listener calls [`open`](PanelController::open) when an event
/// arrives; everything else is driven by the front end.
pub trait PanelController: Send + Sync {
    /// Make the chat surface visible (hides the bubble). Idempotent.
    fn open(&self);

    /// Hide the chat surface and show the bubble.
    fn close(&self);

    fn is_open(&self) -> bool;

    fn is_maximized(&self) -> bool;

    /// Flip the maximized layout and return the new value.
    fn toggle_maximized(&self) -> bool;

    /// Bubble click: open when closed, close when open. Returns the new value.
    fn toggle(&self) -> bool {
        if self.is_open() {
            self.close();
            false
        } else {
            self.open();
            true
        }
    }
}

/// Panel state held in atomics so it can be shared between the listener
/// tasks and the front end without locking.
#[derive(Debug, Default)]
pub struct PanelState {
    open: AtomicBool,
    maximized: AtomicBool,
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened() -> Self {
        let state = Self::default();
        state.open();
        state
    }
}

impl PanelController for PanelState {
    fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn is_maximized(&self) -> bool {
        self.maximized.load(Ordering::SeqCst)
    }

    fn toggle_maximized(&self) -> bool {
        !self.maximized.fetch_xor(true, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_starts_closed() {
        let panel = PanelState::new();
        assert!(!panel.is_open());
        assert!(!panel.is_maximized());
        assert!(PanelState::opened().is_open());
    }

    #[test]
    fn test_open_is_idempotent() {
        let panel = PanelState::new();
        panel.open();
        panel.open();
        assert!(panel.is_open());
    }

    #[test]
    fn test_toggle_flips_visibility() {
        let panel = PanelState::new();
        assert!(panel.toggle());
        assert!(panel.is_open());
        assert!(!panel.toggle());
        assert!(!panel.is_open());
    }

    #[test]
    fn test_toggle_maximized_returns_new_value() {
        let panel = PanelState::new();
        assert!(panel.toggle_maximized());
        assert!(panel.is_maximized());
        assert!(!panel.toggle_maximized());
        assert!(!panel.is_maximized());
    }
}
