use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use genix_core::{
    ChannelKind, ConnectionState, DisplaySurface, MemorySurface, Notice, NoticeLevel,
    PanelController, PanelState,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use unicode_width::UnicodeWidthChar;

use crate::config::TuiConfig;

const SCROLL_STEP: isize = 5;

/// What the event loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    None,
    Search(String),
    Quit,
}

pub struct OverlayApp {
    pub surface: Arc<MemorySurface>,
    pub panel: Arc<PanelState>,
    pub config: TuiConfig,
    pub input: String,
    pub cursor_position: usize,
    pub latest_notice: Option<Notice>,
    /// Animation frame, advanced once per tick
    pub frame: usize,
    notices: mpsc::UnboundedReceiver<Notice>,
    live_state: watch::Receiver<ConnectionState>,
    search_state: watch::Receiver<ConnectionState>,
}

impl OverlayApp {
    pub fn new(
        surface: Arc<MemorySurface>,
        panel: Arc<PanelState>,
        config: TuiConfig,
        notices: mpsc::UnboundedReceiver<Notice>,
        live_state: watch::Receiver<ConnectionState>,
        search_state: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self {
            surface,
            panel,
            config,
            input: String::new(),
            cursor_position: 0,
            latest_notice: None,
            frame: 0,
            notices,
            live_state,
            search_state,
        }
    }

    pub fn live_state(&self) -> ConnectionState {
        self.live_state.borrow().clone()
    }

    pub fn search_state(&self) -> ConnectionState {
        self.search_state.borrow().clone()
    }

    pub fn tick(&mut self) {
        self.frame = self.frame.wrapping_add(1);
        while let Ok(notice) = self.notices.try_recv() {
            self.latest_notice = Some(notice);
        }
    }

    /// Show a notice raised by the front end itself.
    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.latest_notice = Some(Notice::new(ChannelKind::Search, level, message));
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return AppAction::Quit;
        }

        match key.code {
            KeyCode::Esc => {
                self.panel.toggle();
            }
            _ if !self.panel.is_open() => {}
            KeyCode::F(2) => {
                self.panel.toggle_maximized();
            }
            KeyCode::PageUp => self.surface.scroll_by(SCROLL_STEP),
            KeyCode::PageDown => self.surface.scroll_by(-SCROLL_STEP),
            KeyCode::End => self.surface.scroll_to_bottom(),
            KeyCode::Enter => return self.submit(),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Char(c) => self.enter_char(c),
            _ => {}
        }
        AppAction::None
    }

    fn submit(&mut self) -> AppAction {
        if self.input.trim().is_empty() {
            self.notify(NoticeLevel::Warning, "Type a keyword to search");
            return AppAction::None;
        }
        let keyword = std::mem::take(&mut self.input);
        self.cursor_position = 0;
        AppAction::Search(keyword)
    }

    pub fn enter_char(&mut self, c: char) {
        let index = self.byte_index();
        self.input.insert(index, c);
        self.cursor_position += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        let index = self
            .input
            .char_indices()
            .nth(self.cursor_position - 1)
            .map(|(i, _)| i);
        if let Some(index) = index {
            self.input.remove(index);
            self.cursor_position -= 1;
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor_position = (self.cursor_position + 1).min(self.input.chars().count());
    }

    /// Display column of the cursor.
    pub fn cursor_column(&self) -> u16 {
        let width: usize = self
            .input
            .chars()
            .take(self.cursor_position)
            .map(|c| c.width().unwrap_or(0))
            .sum();
        u16::try_from(width).unwrap_or(u16::MAX)
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> (OverlayApp, mpsc::UnboundedSender<Notice>) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (_live_tx, live_rx) = watch::channel(ConnectionState::Connecting);
        let (_search_tx, search_rx) = watch::channel(ConnectionState::Connected);
        let app = OverlayApp::new(
            Arc::new(MemorySurface::new()),
            Arc::new(PanelState::new()),
            TuiConfig::default(),
            notice_rx,
            live_rx,
            search_rx,
        );
        (app, notice_tx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_escape_toggles_panel() {
        let (mut app, _tx) = app();
        assert!(!app.panel.is_open());
        app.handle_key(key(KeyCode::Esc));
        assert!(app.panel.is_open());
        app.handle_key(key(KeyCode::Esc));
        assert!(!app.panel.is_open());
    }

    #[test]
    fn test_typing_ignored_while_closed() {
        let (mut app, _tx) = app();
        app.handle_key(key(KeyCode::Char('x')));
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_enter_submits_keyword() {
        let (mut app, _tx) = app();
        app.panel.open();
        for c in "timeout".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(
            app.handle_key(key(KeyCode::Enter)),
            AppAction::Search("timeout".to_string())
        );
        assert!(app.input.is_empty());
        assert_eq!(app.cursor_position, 0);
    }

    #[test]
    fn test_blank_enter_shows_notice() {
        let (mut app, _tx) = app();
        app.panel.open();
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.handle_key(key(KeyCode::Enter)), AppAction::None);
        assert_eq!(
            app.latest_notice.as_ref().map(|n| n.level),
            Some(NoticeLevel::Warning)
        );
    }

    #[test]
    fn test_ctrl_c_quits_even_when_closed() {
        let (mut app, _tx) = app();
        let action = app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(action, AppAction::Quit);
    }

    #[test]
    fn test_editing_in_the_middle() {
        let (mut app, _tx) = app();
        app.panel.open();
        for c in "tmeout".chars() {
            app.enter_char(c);
        }
        for _ in 0..5 {
            app.move_cursor_left();
        }
        app.enter_char('i');
        assert_eq!(app.input, "timeout");
        assert_eq!(app.cursor_column(), 2);
        app.delete_char();
        assert_eq!(app.input, "tmeout");
    }

    #[test]
    fn test_scroll_and_maximize_keys() {
        let (mut app, _tx) = app();
        app.panel.open();
        app.handle_key(key(KeyCode::PageUp));
        assert_eq!(app.surface.scroll_state().offset_from_bottom, 5);
        app.handle_key(key(KeyCode::End));
        assert!(app.surface.scroll_state().is_following());
        app.handle_key(key(KeyCode::F(2)));
        assert!(app.panel.is_maximized());
    }

    #[test]
    fn test_tick_keeps_latest_notice() {
        let (mut app, tx) = app();
        tx.send(Notice::info(ChannelKind::Search, "first")).unwrap();
        tx.send(Notice::info(ChannelKind::Search, "second")).unwrap();
        app.tick();
        assert_eq!(app.latest_notice.unwrap().message, "second");
        assert_eq!(app.frame, 1);
    }
}
