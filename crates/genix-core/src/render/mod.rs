//! Typing renderer
//!
//! Streams segmented bodies into surface containers at a fixed cadence,
//! framed by a typing indicator and a timestamp footer. Two disciplines share
//! one implementation:
//!
//! - [`TypingRenderer::spawn`] starts a session and returns immediately
//! - [`TypingRenderer::render`] awaits the session, appending images last

pub mod chrome;
mod pacing;
mod typing;

pub use pacing::{Pacer, Step, paced};
pub use typing::{RendererConfig, StreamHandle, StreamOutcome, StreamSession, TypingRenderer};
