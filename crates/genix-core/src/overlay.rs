//! Overlay runtime
//!
//! Wires one surface, one renderer, two session queues and two channel
//! listeners:
//!
//! ```text
//! live socket   -> ChannelListener<LivePolicy>   -> SessionQueue "live"   \
//!                                                                          -> TypingRenderer -> surface
//! search socket -> ChannelListener<SearchPolicy> -> SessionQueue "search" /
//! ```

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::channel::{
    ChannelListener, ConnectionState, LivePolicy, Notice, OutboundSender, SearchPolicy,
};
use crate::config::OverlayConfig;
use crate::error::Result;
use crate::queue::SessionQueue;
use crate::render::TypingRenderer;
use crate::surface::{PanelController, SurfaceHandle};

/// Running overlay. Must be started inside a tokio runtime.
pub struct Overlay {
    surface: SurfaceHandle,
    panel: Arc<dyn PanelController>,
    renderer: TypingRenderer,
    live_queue: SessionQueue,
    search_queue: SessionQueue,
    live_task: JoinHandle<()>,
    search_task: JoinHandle<()>,
    shutdown: CancellationToken,
    live_state: watch::Receiver<ConnectionState>,
    search_state: watch::Receiver<ConnectionState>,
    search_outbound: OutboundSender,
}

impl Overlay {
    /// Validate `config`, then start both queues and connect both channels.
    pub fn start(
        config: &OverlayConfig,
        surface: SurfaceHandle,
        panel: Arc<dyn PanelController>,
        notices: Option<mpsc::UnboundedSender<Notice>>,
    ) -> Result<Self> {
        config.validate()?;

        let renderer = TypingRenderer::new(surface.clone(), config.renderer_config());
        let live_queue = SessionQueue::spawn(
            "live",
            surface.clone(),
            renderer.clone(),
            config.queue_config(),
        );
        let search_queue = SessionQueue::spawn(
            "search",
            surface.clone(),
            renderer.clone(),
            config.queue_config(),
        );

        let mut live = ChannelListener::new(
            config.live_url.clone(),
            LivePolicy,
            live_queue.sender(),
            panel.clone(),
        );
        let mut search = ChannelListener::new(
            config.search_url.clone(),
            SearchPolicy::new(surface.clone()),
            search_queue.sender(),
            panel.clone(),
        );
        if let Some(notices) = notices {
            live = live.with_notices(notices.clone());
            search = search.with_notices(notices);
        }

        // Both listeners stop on one token.
        let shutdown = CancellationToken::new();
        let live = live.with_shutdown(shutdown.child_token());
        let search = search.with_shutdown(shutdown.child_token());

        let live_state = live.state();
        let search_state = search.state();
        let search_outbound = search.outbound();

        info!(
            live = %config.live_url,
            search = %config.search_url,
            policy = %config.queue_policy,
            "Starting overlay"
        );

        Ok(Self {
            surface,
            panel,
            renderer,
            live_queue,
            search_queue,
            live_task: live.spawn(),
            search_task: search.spawn(),
            shutdown,
            live_state,
            search_state,
            search_outbound,
        })
    }

    /// Send a keyword on the search channel.
    pub fn search(&self, keyword: &str) -> Result<()> {
        self.search_outbound.send_keyword(keyword)
    }

    pub fn live_state(&self) -> watch::Receiver<ConnectionState> {
        self.live_state.clone()
    }

    pub fn search_state(&self) -> watch::Receiver<ConnectionState> {
        self.search_state.clone()
    }

    pub fn surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    pub fn panel(&self) -> &Arc<dyn PanelController> {
        &self.panel
    }

    pub fn renderer(&self) -> &TypingRenderer {
        &self.renderer
    }

    /// Close both connections and let the queues finish what they hold.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for (name, task) in [("live", self.live_task), ("search", self.search_task)] {
            if let Err(e) = task.await {
                warn!("{} listener ended abnormally: {}", name, e);
            }
        }
        self.live_queue.close().await;
        self.search_queue.close().await;
        info!("Overlay stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OverlayError;
    use crate::surface::{MemorySurface, PanelState};
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = OverlayConfig {
            search_url: "https://localhost/search".to_string(),
            ..Default::default()
        };
        let result = Overlay::start(
            &config,
            Arc::new(MemorySurface::new()),
            Arc::new(PanelState::new()),
            None,
        );
        assert!(matches!(result, Err(OverlayError::InvalidConfig(_))));
    }

    /// Accept websocket clients and hold them open until they close.
    async fn idle_server() -> String {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = server.accept().await {
                tokio::spawn(async move {
                    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                    while let Some(Ok(message)) = ws.next().await {
                        if message.is_close() {
                            break;
                        }
                    }
                });
            }
        });
        format!("ws://{}", addr)
    }

    #[tokio::test]
    async fn test_shutdown_marks_channels_disconnected() {
        let base = idle_server().await;
        let config = OverlayConfig {
            live_url: format!("{}/ws", base),
            search_url: format!("{}/ws/search", base),
            ..Default::default()
        };
        let overlay = Overlay::start(
            &config,
            Arc::new(MemorySurface::new()),
            Arc::new(PanelState::new()),
            None,
        )
        .unwrap();

        let mut live = overlay.live_state();
        let mut search = overlay.search_state();
        tokio::time::timeout(Duration::from_secs(5), async {
            live.wait_for(ConnectionState::is_connected).await.unwrap();
            search.wait_for(ConnectionState::is_connected).await.unwrap();
        })
        .await
        .unwrap();
        overlay.search("timeout").unwrap();

        tokio::time::timeout(Duration::from_secs(5), overlay.shutdown())
            .await
            .unwrap();
        assert_eq!(*live.borrow(), ConnectionState::Disconnected);
        assert_eq!(*search.borrow(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_unreachable_endpoints_fail_without_panic() {
        let config = OverlayConfig {
            live_url: "ws://127.0.0.1:1/ws".to_string(),
            search_url: "ws://127.0.0.1:1/ws/search".to_string(),
            ..Default::default()
        };
        let surface = Arc::new(MemorySurface::new());
        let overlay = Overlay::start(&config, surface.clone(), Arc::new(PanelState::new()), None)
            .unwrap();

        let mut live = overlay.live_state();
        let mut search = overlay.search_state();
        tokio::time::timeout(Duration::from_secs(10), async {
            live.wait_for(ConnectionState::is_terminal).await.unwrap();
            search.wait_for(ConnectionState::is_terminal).await.unwrap();
        })
        .await
        .unwrap();

        assert!(matches!(*overlay.live_state().borrow(), ConnectionState::Failed(_)));
        assert!(matches!(overlay.search("timeout"), Err(OverlayError::Connection(_))));
        assert!(matches!(overlay.search(" "), Err(OverlayError::InvalidKeyword)));
        assert!(surface.is_empty());

        overlay.shutdown().await;
    }
}
