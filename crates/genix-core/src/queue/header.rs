//! Message header built from an event.

use chrono::{DateTime, TimeZone};
use std::fmt;

use crate::content::{MarkupElement, MarkupNode, parse_fragment};
use crate::models::{Event, EventKind};
use crate::render::chrome::{byline, timestamp_footer};

pub const CHAT_MESSAGE_CLASS: &str = "chat-message";
pub const SEARCH_BOX_CLASS: &str = "search-box";
pub const ERROR_BOX_CLASS: &str = "error-box";

/// Class list of the header block.
pub fn header_class(kind: &EventKind) -> String {
    match kind {
        EventKind::Live => CHAT_MESSAGE_CLASS.to_string(),
        EventKind::SearchMatch(_) => format!("{} {}", CHAT_MESSAGE_CLASS, SEARCH_BOX_CLASS),
    }
}

/// Header contents: timestamp, byline, source (and keyword), error box.
///
/// `source` and the keyword are kept as plain text; `error_description` is
/// parsed as markup.
pub fn header_nodes<Tz: TimeZone>(
    event: &Event,
    at: &DateTime<Tz>,
    assistant_name: &str,
) -> Vec<MarkupNode>
where
    Tz::Offset: fmt::Display,
{
    let mut nodes: Vec<MarkupNode> = vec![timestamp_footer(at).into()];
    nodes.extend(byline(assistant_name));

    nodes.push(MarkupNode::text(format!("Source: {}", event.source)));
    nodes.push(MarkupElement::new("br").into());
    if let EventKind::SearchMatch(keyword) = event.kind() {
        nodes.push(MarkupNode::text(format!("Keyword: {}", keyword)));
        nodes.push(MarkupElement::new("br").into());
    }

    let mut error_box = MarkupElement::new("div")
        .with_class(ERROR_BOX_CLASS)
        .with_text("Error: '");
    error_box
        .children
        .extend(parse_fragment(&event.error_description));
    nodes.push(error_box.with_text("'").into());

    nodes
}

/// Header wrapped in its own block, for appending into an existing container.
pub fn header_block<Tz: TimeZone>(
    event: &Event,
    at: &DateTime<Tz>,
    assistant_name: &str,
) -> MarkupElement
where
    Tz::Offset: fmt::Display,
{
    let mut block = MarkupElement::new("div").with_class(header_class(&event.kind()));
    block.children = header_nodes(event, at, assistant_name);
    block
}
