//! Typing renderer.
//!
//! A typing session appends a segmented body into one container, one node
//! per tick, between a typing indicator and a timestamp footer:
//!
//! ```text
//! tick 0      append indicator
//! tick 1..=n  append node[i], scroll to bottom
//! tick n+1    (deferred images) timestamp, feedback, remove indicator, scroll
//! ```
//!
//! The session stops silently once its container disappears from the
//! surface. Sessions targeting the same container run one after another.

use chrono::Local;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use super::chrome::{
    TYPING_INDICATOR_CLASS, feedback_footer, image_frame, timestamp_footer, typing_indicator,
};
use super::pacing::{Step, paced};
use crate::content::{ContentNode, MarkupElement, segment, segment_with_images};
use crate::surface::{ContainerId, SurfaceHandle};

/// Renderer settings.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Delay between two appended nodes
    pub interval: Duration,
    /// Append thumbs up/down icons after the timestamp
    pub show_feedback: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            show_feedback: true,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamOutcome {
    /// Nodes appended (deferred images not included)
    pub appended: usize,
    /// Whether the completion step ran
    pub completed: bool,
}

impl StreamOutcome {
    fn detached(appended: usize) -> Self {
        Self {
            appended,
            completed: false,
        }
    }
}

/// Transient state of one in-flight body stream.
#[derive(Debug)]
pub struct StreamSession {
    container: ContainerId,
    nodes: Vec<ContentNode>,
    images: Vec<MarkupElement>,
    cursor: usize,
    active: bool,
}

impl StreamSession {
    pub fn new(container: ContainerId, nodes: Vec<ContentNode>) -> Self {
        Self {
            container,
            nodes,
            images: Vec::new(),
            cursor: 0,
            active: false,
        }
    }

    /// Images appended after the last node, before the completion step.
    pub fn with_deferred_images(mut self, images: Vec<MarkupElement>) -> Self {
        self.images = images;
        self
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Handle to a fire-and-continue session.
#[derive(Debug)]
pub struct StreamHandle {
    handle: JoinHandle<StreamOutcome>,
}

impl StreamHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the session to end.
    pub async fn wait(self) -> StreamOutcome {
        self.handle.await.unwrap_or_default()
    }
}

type ContainerLocks = Arc<Mutex<HashMap<ContainerId, Arc<tokio::sync::Mutex<()>>>>>;

/// Paces segmented bodies into surface containers.
#[derive(Clone)]
pub struct TypingRenderer {
    surface: SurfaceHandle,
    config: RendererConfig,
    locks: ContainerLocks,
}

impl TypingRenderer {
    pub fn new(surface: SurfaceHandle, config: RendererConfig) -> Self {
        Self {
            surface,
            config,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Fire-and-continue: stream `markup` on a spawned task.
    ///
    /// Images stay inline and are appended with their enclosing nodes.
    pub fn spawn(&self, container: ContainerId, markup: &str) -> StreamHandle {
        let session = StreamSession::new(container, segment(markup));
        let renderer = self.clone();
        StreamHandle {
            handle: tokio::spawn(async move { renderer.run(session).await }),
        }
    }

    /// Sequential-await: stream `markup` and return once it is complete.
    ///
    /// Images are detached from the body and appended, framed, after every
    /// other node.
    pub async fn render(&self, container: ContainerId, markup: &str) -> StreamOutcome {
        let segmented = segment_with_images(markup);
        let session =
            StreamSession::new(container, segmented.nodes).with_deferred_images(segmented.images);
        self.run(session).await
    }

    /// Run a prepared session to its end.
    pub async fn run(&self, mut session: StreamSession) -> StreamOutcome {
        let lock = self.container_lock(&session.container);
        let outcome = {
            let _guard = lock.lock().await;
            self.drive(&mut session).await
        };
        drop(lock);
        self.release_lock(&session.container);
        outcome
    }

    async fn drive(&self, session: &mut StreamSession) -> StreamOutcome {
        let container = session.container.clone();
        if self
            .surface
            .append(&container, typing_indicator().into())
            .is_err()
        {
            debug!(container = %container, "Container missing before stream start");
            return StreamOutcome::detached(0);
        }
        session.active = true;

        let nodes = std::mem::take(&mut session.nodes);
        let total = nodes.len();
        let mut steps = std::pin::pin!(paced(nodes, self.config.interval));

        while let Some(step) = steps.next().await {
            if !self.surface.contains(&container) {
                debug!(
                    container = %container,
                    appended = session.cursor,
                    total,
                    "Container detached; stopping stream"
                );
                session.active = false;
                return StreamOutcome::detached(session.cursor);
            }

            match step {
                Step::Item(node) => {
                    if self.surface.append(&container, node.into_markup()).is_err() {
                        session.active = false;
                        return StreamOutcome::detached(session.cursor);
                    }
                    session.cursor += 1;
                    self.surface.scroll_to_bottom();
                }
                Step::Done => {
                    let images = std::mem::take(&mut session.images);
                    self.complete(&container, &images);
                    session.active = false;
                    debug!(container = %container, appended = session.cursor, "Stream complete");
                    return StreamOutcome {
                        appended: session.cursor,
                        completed: true,
                    };
                }
            }
        }

        session.active = false;
        StreamOutcome::detached(session.cursor)
    }

    fn complete(&self, container: &ContainerId, images: &[MarkupElement]) {
        for image in images {
            let _ = self.surface.append(container, image_frame(image).into());
        }
        let _ = self
            .surface
            .append(container, timestamp_footer(&Local::now()).into());
        if self.config.show_feedback {
            let _ = self.surface.append(container, feedback_footer().into());
        }
        self.surface
            .remove_by_class(container, TYPING_INDICATOR_CLASS);
        self.surface.scroll_to_bottom();
    }

    fn container_lock(&self, container: &ContainerId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(container.clone())
            .or_default()
            .clone()
    }

    fn release_lock(&self, container: &ContainerId) {
        let mut locks = self.locks.lock();
        if locks
            .get(container)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(container);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{MarkupNode, parse_fragment, to_html};
    use crate::render::chrome::{FEEDBACK_CLASS, IMAGE_FRAME_CLASS, TIMESTAMP_CLASS};
    use crate::surface::{ContainerSpec, DisplaySurface, MemorySurface};

    const TICK: Duration = Duration::from_millis(100);

    fn setup(show_feedback: bool) -> (Arc<MemorySurface>, TypingRenderer) {
        let surface = Arc::new(MemorySurface::new());
        let renderer = TypingRenderer::new(
            surface.clone(),
            RendererConfig {
                interval: TICK,
                show_feedback,
            },
        );
        (surface, renderer)
    }

    fn has_indicator(surface: &MemorySurface, id: &ContainerId) -> bool {
        surface
            .container(id)
            .unwrap()
            .markup()
            .iter()
            .any(|node| matches!(node, MarkupNode::Element(el) if el.has_class(TYPING_INDICATOR_CLASS)))
    }

    fn body_nodes(surface: &MemorySurface, id: &ContainerId) -> Vec<MarkupNode> {
        surface
            .container(id)
            .unwrap()
            .markup()
            .into_iter()
            .filter(|node| match node {
                MarkupNode::Element(el) => {
                    !el.has_class(TYPING_INDICATOR_CLASS)
                        && !el.has_class(TIMESTAMP_CLASS)
                        && !el.has_class(FEEDBACK_CLASS)
                }
                MarkupNode::Text(_) => true,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_bold_then_text() {
        let (surface, renderer) = setup(false);
        let id = surface.create_container(ContainerSpec::new("response-box")).unwrap();

        let handle = renderer.spawn(id.clone(), "<b>Hi</b> there");

        tokio::task::yield_now().await;
        assert!(has_indicator(&surface, &id));
        assert!(body_nodes(&surface, &id).is_empty());

        tokio::time::sleep(TICK + Duration::from_millis(1)).await;
        assert_eq!(to_html(&body_nodes(&surface, &id)), "<b>Hi</b>");
        assert!(has_indicator(&surface, &id));

        tokio::time::sleep(TICK).await;
        assert_eq!(to_html(&body_nodes(&surface, &id)), "<b>Hi</b> there");
        assert!(has_indicator(&surface, &id));

        let outcome = handle.wait().await;
        assert_eq!(
            outcome,
            StreamOutcome {
                appended: 2,
                completed: true
            }
        );

        let markup = surface.container(&id).unwrap().markup();
        assert!(!has_indicator(&surface, &id));
        assert_eq!(markup.len(), 3);
        assert!(matches!(&markup[2], MarkupNode::Element(el) if el.has_class(TIMESTAMP_CLASS)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_n_appends_then_one_completion() {
        let (surface, renderer) = setup(true);
        let id = surface.create_container(ContainerSpec::new("box")).unwrap();
        let markup = "<p>one</p><p>two</p><p>three</p><p>four</p>";

        let start = tokio::time::Instant::now();
        let outcome = renderer.render(id.clone(), markup).await;

        assert_eq!(outcome.appended, 4);
        assert!(outcome.completed);
        assert_eq!(start.elapsed(), TICK * 5);

        let markup_nodes = surface.container(&id).unwrap().markup();
        let timestamps = markup_nodes
            .iter()
            .filter(|node| matches!(node, MarkupNode::Element(el) if el.has_class(TIMESTAMP_CLASS)))
            .count();
        assert_eq!(timestamps, 1);
        assert!(matches!(markup_nodes.last(), Some(MarkupNode::Element(el)) if el.has_class(FEEDBACK_CLASS)));
        assert!(!has_indicator(&surface, &id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_body_still_completes() {
        let (surface, renderer) = setup(false);
        let id = surface.create_container(ContainerSpec::new("box")).unwrap();

        let outcome = renderer.render(id.clone(), "   ").await;

        assert_eq!(outcome.appended, 0);
        assert!(outcome.completed);
        let markup = surface.container(&id).unwrap().markup();
        assert_eq!(markup.len(), 1);
        assert!(!has_indicator(&surface, &id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_structural_round_trip() {
        let samples = [
            "<b>Checking Recent Trends...</b>This error has occurred 5 times in the last hour.",
            "Looking at data, <b>85%</b> correlated with <b>database timeouts</b>.<div class='highlight-box'><b>Genix AI model predicts that</b><br><br>If latency exceeds <b>3s</b>, expect <b>92%</b> more errors.</div>",
            "plain text only",
            "<ul><li>a</li><li>b <i>c</i></li></ul>tail &amp; more",
        ];

        for sample in samples {
            let (surface, renderer) = setup(false);
            let id = surface.create_container(ContainerSpec::new("box")).unwrap();
            renderer.render(id.clone(), sample).await;

            assert_eq!(
                to_html(&body_nodes(&surface, &id)),
                to_html(&parse_fragment(sample)),
                "round trip failed for {sample}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_div_block_appended_in_one_step() {
        let (surface, renderer) = setup(false);
        let id = surface.create_container(ContainerSpec::new("box")).unwrap();
        let markup = "before <div class='highlight-box'><b>x</b><div>deep <span>y</span></div></div> after";

        let handle = renderer.spawn(id.clone(), markup);

        tokio::time::sleep(TICK + Duration::from_millis(1)).await;
        assert_eq!(to_html(&body_nodes(&surface, &id)), "before ");

        tokio::time::sleep(TICK).await;
        let nodes = body_nodes(&surface, &id);
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes[1].to_html(),
            r#"<div class="highlight-box"><b>x</b><div>deep <span>y</span></div></div>"#
        );

        handle.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_images_follow_body() {
        let (surface, renderer) = setup(false);
        let id = surface.create_container(ContainerSpec::new("box")).unwrap();
        let markup = r#"<p>chart <img src="a.png"></p>text<img src="b.png">"#;

        let outcome = renderer.render(id.clone(), markup).await;
        assert_eq!(outcome.appended, 2);

        let markup_nodes = surface.container(&id).unwrap().markup();
        let frames: Vec<&MarkupElement> = markup_nodes
            .iter()
            .filter_map(MarkupNode::as_element)
            .filter(|el| el.has_class(IMAGE_FRAME_CLASS))
            .collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].children[0].as_element().unwrap().attr("src"), Some("a.png"));
        assert_eq!(frames[1].children[0].as_element().unwrap().attr("src"), Some("b.png"));

        // body first, then frames, then the timestamp
        assert_eq!(markup_nodes[0].to_html(), "<p>chart </p>");
        assert!(matches!(markup_nodes.last(), Some(MarkupNode::Element(el)) if el.has_class(TIMESTAMP_CLASS)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_container_stops_silently() {
        let (surface, renderer) = setup(false);
        let id = surface.create_container(ContainerSpec::new("box")).unwrap();

        let handle = renderer.spawn(id.clone(), "<p>1</p><p>2</p><p>3</p>");
        tokio::time::sleep(TICK + Duration::from_millis(1)).await;
        assert!(surface.remove_container(&id));

        let outcome = handle.wait().await;
        assert_eq!(outcome.appended, 1);
        assert!(!outcome.completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_container_is_noop() {
        let (surface, renderer) = setup(false);
        let outcome = renderer
            .render(ContainerId::new("never-created"), "<b>x</b>")
            .await;
        assert_eq!(outcome, StreamOutcome::default());
        assert!(surface.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_on_same_container_do_not_interleave() {
        let (surface, renderer) = setup(false);
        let id = surface.create_container(ContainerSpec::new("box")).unwrap();

        let first = renderer.spawn(id.clone(), "<i>a1</i><i>a2</i><i>a3</i>");
        let second = renderer.spawn(id.clone(), "<u>b1</u><u>b2</u>");
        first.wait().await;
        second.wait().await;

        let names: Vec<String> = surface
            .container(&id)
            .unwrap()
            .markup()
            .iter()
            .filter_map(MarkupNode::as_element)
            .map(|el| el.name.clone())
            .filter(|name| name == "i" || name == "u")
            .collect();
        assert_eq!(names, vec!["i", "i", "i", "u", "u"]);
        assert!(renderer.locks.lock().is_empty());
    }
}
