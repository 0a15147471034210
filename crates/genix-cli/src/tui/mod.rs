mod app;
mod markup;
mod theme;
mod ui;

use anyhow::Result;
use app::{AppAction, OverlayApp};
use crossterm::event::{self, Event, KeyEventKind};
use genix_core::{MemorySurface, NoticeLevel, Overlay, PanelState};
use ratatui::DefaultTerminal;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::CliConfig;

/// How long queued answers may keep typing after exit is requested
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Start the overlay and run the full-screen chat front end until Ctrl+C.
pub async fn run(config: &CliConfig) -> Result<()> {
    let surface = Arc::new(MemorySurface::new());
    let panel = Arc::new(if config.tui.start_open {
        PanelState::opened()
    } else {
        PanelState::new()
    });
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();

    let overlay = Overlay::start(
        &config.overlay,
        surface.clone(),
        panel.clone(),
        Some(notice_tx),
    )?;

    let mut app = OverlayApp::new(
        surface,
        panel,
        config.tui.clone(),
        notice_rx,
        overlay.live_state(),
        overlay.search_state(),
    );

    let mut terminal = ratatui::init();
    let res = run_app(&mut terminal, &mut app, &overlay).await;
    ratatui::restore();

    if tokio::time::timeout(SHUTDOWN_GRACE, overlay.shutdown())
        .await
        .is_err()
    {
        warn!("Render queues still busy at exit");
    }

    res
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    app: &mut OverlayApp,
    overlay: &Overlay,
) -> Result<()> {
    let tick_rate = Duration::from_millis(app.config.tick_rate_ms.max(10));

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(tick_rate)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match app.handle_key(key) {
                AppAction::Quit => return Ok(()),
                AppAction::Search(keyword) => match overlay.search(&keyword) {
                    Ok(()) => {
                        info!(keyword = %keyword, "Search sent");
                        app.notify(
                            NoticeLevel::Info,
                            format!("Searching for '{}'", keyword.trim()),
                        );
                    }
                    Err(e) => app.notify(NoticeLevel::Error, e.to_string()),
                },
                AppAction::None => {}
            }
        }

        app.tick();
    }
}
