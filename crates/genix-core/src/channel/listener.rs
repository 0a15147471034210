//! Channel listener
//!
//! Owns one websocket connection. Inbound text frames go through the
//! listener's [`DispatchPolicy`]; the resulting jobs are submitted to the
//! session queue, notices to the notice sink. Outbound text (search
//! keywords) is written by a separate task fed from an mpsc channel.
//! Cancelling the listener's shutdown token sends a close frame and ends
//! both halves with the state `Disconnected`.

use futures::{SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::traits::DispatchPolicy;
use super::types::{ConnectionState, Notice};
use crate::error::{OverlayError, Result};
use crate::queue::JobSender;
use crate::surface::PanelController;

/// Writes text frames to a listener's connection.
#[derive(Debug, Clone)]
pub struct OutboundSender {
    tx: mpsc::UnboundedSender<String>,
}

impl OutboundSender {
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        self.tx
            .send(text.into())
            .map_err(|_| OverlayError::Connection("connection is closed".to_string()))
    }

    /// Send a search keyword. Blank keywords are rejected without touching
    /// the connection.
    pub fn send_keyword(&self, keyword: &str) -> Result<()> {
        if keyword.trim().is_empty() {
            return Err(OverlayError::InvalidKeyword);
        }
        self.send(keyword)
    }
}

pub struct ChannelListener<P: DispatchPolicy> {
    url: String,
    policy: Arc<P>,
    jobs: JobSender,
    panel: Arc<dyn PanelController>,
    notices: Option<mpsc::UnboundedSender<Notice>>,
    state: watch::Sender<ConnectionState>,
    outbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
    shutdown: CancellationToken,
}

/// How long the writer may take to flush the close frame
const CLOSE_GRACE: Duration = Duration::from_secs(1);

impl<P: DispatchPolicy> ChannelListener<P> {
    pub fn new(
        url: impl Into<String>,
        policy: P,
        jobs: JobSender,
        panel: Arc<dyn PanelController>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            url: url.into(),
            policy: Arc::new(policy),
            jobs,
            panel,
            notices: None,
            state,
            outbound_tx,
            outbound_rx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Forward notices to `notices` instead of only logging them.
    pub fn with_notices(mut self, notices: mpsc::UnboundedSender<Notice>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn policy(&self) -> &Arc<P> {
        &self.policy
    }

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn outbound(&self) -> OutboundSender {
        OutboundSender {
            tx: self.outbound_tx.clone(),
        }
    }

    /// Stop on `token` instead of a private token.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Token that stops the listener when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the listener on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Connect and process frames until the connection ends.
    pub async fn run(self) {
        let channel = self.policy.channel();
        self.state.send_replace(ConnectionState::Connecting);
        info!("Connecting {} channel: {}", channel, self.url);

        let shutdown = self.shutdown.clone();
        let connected = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            result = tokio_tungstenite::connect_async(self.url.as_str()) => Some(result),
        };
        let ws_stream = match connected {
            Some(Ok((stream, _))) => stream,
            Some(Err(e)) => {
                warn!("Failed to connect {} channel: {}", channel, e);
                self.state
                    .send_replace(ConnectionState::Failed(e.to_string()));
                return;
            }
            None => {
                info!("{} channel stopped before connecting", channel);
                self.state.send_replace(ConnectionState::Disconnected);
                return;
            }
        };

        let (mut ws_write, ws_read) = ws_stream.split();

        let writer_policy = self.policy.clone();
        let writer_stop = shutdown.child_token();
        let stop = writer_stop.clone();
        let (listener, mut outbound_rx) = self.detach_outbound();
        let writer = WriterTask(tokio::spawn(async move {
            loop {
                let text = tokio::select! {
                    _ = stop.cancelled() => {
                        if let Err(e) = ws_write.send(Message::Close(None)).await {
                            debug!("{} channel close frame not sent: {}", channel, e);
                        }
                        break;
                    }
                    text = outbound_rx.recv() => match text {
                        Some(text) => text,
                        None => break,
                    },
                };
                writer_policy.before_send(&text);
                let len = text.len();
                if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                    warn!("{} channel send failed: {}", channel, e);
                    break;
                }
                debug!("{} channel sent {} bytes", channel, len);
            }
        }));

        listener.read_frames(ws_read, &shutdown).await;
        writer_stop.cancel();
        writer.finish().await;
    }

    /// Process frames from an already open stream.
    pub async fn run_with_stream<S>(self, frames: S)
    where
        S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
    {
        let shutdown = self.shutdown.clone();
        let (listener, _outbound_rx) = self.detach_outbound();
        listener.read_frames(frames, &shutdown).await;
    }

    /// Decode one payload and submit its jobs. Returns the number of jobs
    /// enqueued.
    pub fn handle_payload(&self, payload: &str) -> usize {
        handle_payload(
            self.policy.as_ref(),
            &self.jobs,
            self.panel.as_ref(),
            self.notices.as_ref(),
            payload,
        )
    }

    fn detach_outbound(self) -> (FrameReader<P>, mpsc::UnboundedReceiver<String>) {
        let reader = FrameReader {
            policy: self.policy,
            jobs: self.jobs,
            panel: self.panel,
            notices: self.notices,
            state: self.state,
        };
        (reader, self.outbound_rx)
    }
}

/// Aborts the writer if the listener future is dropped before it finishes.
struct WriterTask(JoinHandle<()>);

impl WriterTask {
    async fn finish(mut self) {
        if tokio::time::timeout(CLOSE_GRACE, &mut self.0).await.is_err() {
            debug!("Writer task still busy after close, aborting");
        }
    }
}

impl Drop for WriterTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Listener half that consumes inbound frames.
struct FrameReader<P: DispatchPolicy> {
    policy: Arc<P>,
    jobs: JobSender,
    panel: Arc<dyn PanelController>,
    notices: Option<mpsc::UnboundedSender<Notice>>,
    state: watch::Sender<ConnectionState>,
}

impl<P: DispatchPolicy> FrameReader<P> {
    async fn read_frames<S>(&self, mut frames: S, shutdown: &CancellationToken)
    where
        S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
    {
        let channel = self.policy.channel();
        self.state.send_replace(ConnectionState::Connected);
        info!("{} channel connected", channel);

        loop {
            let frame = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("{} channel shutting down", channel);
                    break;
                }
                frame = frames.next() => frame,
            };
            let Some(frame) = frame else { break };
            let message = match frame {
                Ok(message) => message,
                Err(e) => {
                    warn!("{} channel error: {}", channel, e);
                    self.state
                        .send_replace(ConnectionState::Failed(e.to_string()));
                    return;
                }
            };

            match message {
                Message::Text(text) => {
                    handle_payload(
                        self.policy.as_ref(),
                        &self.jobs,
                        self.panel.as_ref(),
                        self.notices.as_ref(),
                        text.as_str(),
                    );
                }
                Message::Close(_) => break,
                _ => continue,
            }
        }

        self.state.send_replace(ConnectionState::Disconnected);
        info!("{} channel connection ended", channel);
    }
}

fn handle_payload<P: DispatchPolicy>(
    policy: &P,
    jobs: &JobSender,
    panel: &dyn PanelController,
    notices: Option<&mpsc::UnboundedSender<Notice>>,
    payload: &str,
) -> usize {
    let channel = policy.channel();
    let dispatch = match policy.dispatch(payload) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            warn!("Dropping {} channel message: {}", channel, e);
            return 0;
        }
    };

    if dispatch.open_panel {
        panel.open();
    }

    if let Some(notice) = dispatch.notice {
        info!("{}", notice);
        if let Some(sink) = notices
            && sink.send(notice).is_err()
        {
            debug!("Notice sink closed");
        }
    }

    let mut enqueued = 0;
    let mut pending = dispatch.jobs.into_iter();
    while let Some(job) = pending.next() {
        let target = job.target.clone();
        if let Err(e) = jobs.send(job) {
            warn!("{} channel cannot enqueue: {}", channel, e);
            policy.discard(&target);
            pending.by_ref().for_each(|job| policy.discard(&job.target));
            break;
        }
        enqueued += 1;
    }
    enqueued
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelKind, LivePolicy, NoticeLevel, SearchPolicy};
    use crate::queue::{QueueConfig, SessionQueue};
    use crate::render::{RendererConfig, TypingRenderer};
    use crate::surface::{MemorySurface, PanelState};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct RecordingPanel {
        state: PanelState,
        opens: AtomicUsize,
    }

    impl PanelController for RecordingPanel {
        fn open(&self) {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.state.open();
        }

        fn close(&self) {
            self.state.close();
        }

        fn is_open(&self) -> bool {
            self.state.is_open()
        }

        fn is_maximized(&self) -> bool {
            self.state.is_maximized()
        }

        fn toggle_maximized(&self) -> bool {
            self.state.toggle_maximized()
        }
    }

    fn queue(surface: &Arc<MemorySurface>) -> SessionQueue {
        queue_with(surface, Duration::from_millis(100), Duration::from_millis(1000))
    }

    fn queue_with(
        surface: &Arc<MemorySurface>,
        interval: Duration,
        settle_delay: Duration,
    ) -> SessionQueue {
        let renderer = TypingRenderer::new(
            surface.clone(),
            RendererConfig {
                interval,
                show_feedback: false,
            },
        );
        SessionQueue::spawn(
            "test",
            surface.clone(),
            renderer,
            QueueConfig {
                settle_delay,
                ..Default::default()
            },
        )
    }

    /// Accept one websocket client, report every text frame it sends and
    /// answer each with the next canned reply.
    async fn search_server(
        replies: Vec<&'static str>,
    ) -> (String, mpsc::UnboundedReceiver<String>, JoinHandle<()>) {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/search", server.local_addr().unwrap());
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let (stream, _) = server.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let mut replies = replies.into_iter();
            while let Some(Ok(message)) = ws.next().await {
                match message {
                    Message::Text(text) => {
                        let _ = seen_tx.send(text.as_str().to_string());
                        if let Some(reply) = replies.next() {
                            ws.send(Message::Text(reply.to_string().into())).await.unwrap();
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });
        (url, seen_rx, task)
    }

    fn text(payload: &str) -> std::result::Result<Message, tungstenite::Error> {
        Ok(Message::Text(payload.to_string().into()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_live_message_does_not_stop_channel() {
        let surface = Arc::new(MemorySurface::new());
        let queue = queue(&surface);
        let panel = Arc::new(RecordingPanel::default());
        let listener = ChannelListener::new("ws://test/ws", LivePolicy, queue.sender(), panel.clone());
        let state = listener.state();

        let frames = futures::stream::iter(vec![
            text(r#"{"source":"broken"}"#),
            text(r#"{"source":"OrderProcessingService","error_description":"500","response":"<b>Hi</b> there"}"#),
        ]);
        listener.run_with_stream(frames).await;
        queue.close().await;

        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
        assert_eq!(panel.opens.load(Ordering::SeqCst), 1);
        assert!(panel.is_open());

        let snapshot = surface.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot[1].to_html().contains("<b>Hi</b> there"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_search_appends_nothing() {
        let surface = Arc::new(MemorySurface::new());
        let queue = queue(&surface);
        let panel = Arc::new(PanelState::new());
        let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
        let listener = ChannelListener::new(
            "ws://test/ws/search",
            SearchPolicy::new(surface.clone()),
            queue.sender(),
            panel.clone(),
        )
        .with_notices(notice_tx);
        listener.policy().before_send("timeout");

        let frames = futures::stream::iter(vec![text(
            r#"{"status":"success","message":"No matching records found.","results":[]}"#,
        )]);
        listener.run_with_stream(frames).await;
        queue.close().await;

        assert!(surface.is_empty());
        assert!(!panel.is_open());
        let notice = notice_rx.recv().await.unwrap();
        assert_eq!(notice.channel, ChannelKind::Search);
        assert_eq!(notice.level, NoticeLevel::Info);
        assert!(notice.message.contains("timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_rows_render_in_keyed_containers() {
        let surface = Arc::new(MemorySurface::new());
        let queue = queue(&surface);
        let listener = ChannelListener::new(
            "ws://test/ws/search",
            SearchPolicy::new(surface.clone()),
            queue.sender(),
            Arc::new(PanelState::new()),
        );

        let enqueued = listener.handle_payload(
            r#"{"status":"success","results":[
                {"id":1,"source":"a","error_description":"e","response":"<p>one</p>","search_keyword":"timeout"},
                {"id":2,"source":"b","error_description":"e","response":"<p>two</p>","search_keyword":"timeout"}
            ]}"#,
        );
        assert_eq!(enqueued, 2);
        // containers exist before any header is rendered
        assert_eq!(surface.len(), 2);

        queue.close().await;
        let snapshot = surface.snapshot();
        assert!(snapshot[0].to_html().contains("<p>one</p>"));
        assert!(snapshot[1].to_html().contains("<p>two</p>"));
    }

    #[tokio::test]
    async fn test_search_keywords_round_trip_over_socket() {
        let (url, mut seen, server) = search_server(vec![
            r#"{"status":"success","message":"No matching records found.","results":[]}"#,
            r#"{"status":"success","results":[
                {"id":3,"source":"db","error_description":"e","response":"<b>x</b> y","search_keyword":"deadlock"}
            ]}"#,
        ])
        .await;

        let surface = Arc::new(MemorySurface::new());
        let queue = queue_with(&surface, Duration::from_millis(5), Duration::from_millis(10));
        let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
        let listener = ChannelListener::new(
            url,
            SearchPolicy::new(surface.clone()),
            queue.sender(),
            Arc::new(PanelState::new()),
        )
        .with_notices(notice_tx);
        let outbound = listener.outbound();
        let mut state = listener.state();
        let shutdown = listener.shutdown_token();
        let task = listener.spawn();

        let within = Duration::from_secs(5);
        tokio::time::timeout(within, state.wait_for(ConnectionState::is_connected))
            .await
            .unwrap()
            .unwrap();

        outbound.send_keyword("timeout").unwrap();
        assert_eq!(seen.recv().await.unwrap(), "timeout");
        let notice = tokio::time::timeout(within, notice_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notice.message, "No results for search: timeout");
        assert!(surface.is_empty());

        outbound.send_keyword("deadlock").unwrap();
        assert_eq!(seen.recv().await.unwrap(), "deadlock");
        tokio::time::timeout(within, async {
            while !surface.snapshot().iter().any(|c| c.to_html().contains(r#"<b>x</b> y<span class="timestamp">"#)) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let snapshot = surface.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].has_class("search-result"));
        let html = snapshot[0].to_html();
        assert!(html.contains(r#"class="analysis-box""#));
        assert!(html.contains("<b>x</b> y"));

        shutdown.cancel();
        tokio::time::timeout(within, task).await.unwrap().unwrap();
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
        // the server saw our close frame
        tokio::time::timeout(within, server).await.unwrap().unwrap();
        queue.close().await;
    }

    #[tokio::test]
    async fn test_shutdown_before_connect_is_disconnected() {
        let surface = Arc::new(MemorySurface::new());
        let queue = queue(&surface);
        let listener = ChannelListener::new(
            "ws://127.0.0.1:1/ws",
            LivePolicy,
            queue.sender(),
            Arc::new(PanelState::new()),
        );
        let state = listener.state();
        listener.shutdown_token().cancel();

        listener.run().await;
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
        queue.close().await;
    }

    #[tokio::test]
    async fn test_unqueued_search_rows_release_their_containers() {
        let surface = Arc::new(MemorySurface::new());
        let queue = queue(&surface);
        let listener = ChannelListener::new(
            "ws://test/ws/search",
            SearchPolicy::new(surface.clone()),
            queue.sender(),
            Arc::new(PanelState::new()),
        );
        queue.close().await;

        let enqueued = listener.handle_payload(
            r#"{"status":"success","results":[
                {"id":1,"source":"a","error_description":"e","response":"<p>one</p>","search_keyword":"timeout"},
                {"id":2,"source":"b","error_description":"e","response":"<p>two</p>","search_keyword":"timeout"}
            ]}"#,
        );
        assert_eq!(enqueued, 0);
        assert!(surface.is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_marks_failed() {
        let surface = Arc::new(MemorySurface::new());
        let queue = queue(&surface);
        let listener =
            ChannelListener::new("ws://test/ws", LivePolicy, queue.sender(), Arc::new(PanelState::new()));
        let state = listener.state();

        let frames = futures::stream::iter(vec![
            Ok(Message::Ping(Default::default())),
            Err(tungstenite::Error::ConnectionClosed),
        ]);
        listener.run_with_stream(frames).await;

        assert!(matches!(*state.borrow(), ConnectionState::Failed(_)));
        queue.close().await;
    }

    #[tokio::test]
    async fn test_blank_keyword_rejected_locally() {
        let surface = Arc::new(MemorySurface::new());
        let queue = queue(&surface);
        let listener = ChannelListener::new(
            "ws://test/ws/search",
            SearchPolicy::new(surface.clone()),
            queue.sender(),
            Arc::new(PanelState::new()),
        );
        let outbound = listener.outbound();

        assert!(matches!(
            outbound.send_keyword("   "),
            Err(OverlayError::InvalidKeyword)
        ));
        assert!(outbound.send_keyword("timeout").is_ok());

        drop(listener);
        assert!(matches!(
            outbound.send_keyword("timeout"),
            Err(OverlayError::Connection(_))
        ));
        queue.close().await;
    }
}
