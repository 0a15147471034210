//! Channel listeners
//!
//! Two long-lived websocket connections feed the overlay:
//!
//! - **Live**: unsolicited incident events, one per frame
//! - **Search**: keyword queries out, result batches in
//!
//! Both are a [`ChannelListener`] parameterised by a [`DispatchPolicy`]
//! that turns a text frame into render jobs and notices.

mod listener;
mod live;
mod search;
mod traits;
mod types;

pub use listener::{ChannelListener, OutboundSender};
pub use live::LivePolicy;
pub use search::{SearchPolicy, container_key};
pub use traits::{Dispatch, DispatchPolicy};
pub use types::{ChannelKind, ConnectionState, Notice, NoticeLevel};
