//! Fixed markup the renderer adds around a streamed body.

use chrono::{DateTime, TimeZone};
use std::fmt;

use crate::content::{MarkupElement, MarkupNode};

pub const TYPING_INDICATOR_CLASS: &str = "typing-indicator";
pub const TIMESTAMP_CLASS: &str = "timestamp";
pub const FEEDBACK_CLASS: &str = "chat-icons";
pub const IMAGE_FRAME_CLASS: &str = "image-wrapper";

/// en-US short date and 12-hour time, e.g. `03/14/2025, 02:05 PM`.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y, %I:%M %p";

const LOGO_SRC: &str = "/static/images/logo.png";

pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Three-dot placeholder shown while a body is streaming.
pub fn typing_indicator() -> MarkupElement {
    (0..3).fold(
        MarkupElement::new("div").with_class(TYPING_INDICATOR_CLASS),
        |indicator, _| indicator.with_child(MarkupElement::new("span")),
    )
}

pub fn timestamp_footer<Tz: TimeZone>(at: &DateTime<Tz>) -> MarkupElement
where
    Tz::Offset: fmt::Display,
{
    MarkupElement::new("span")
        .with_class(TIMESTAMP_CLASS)
        .with_text(format_timestamp(at))
}

/// Thumbs up/down icons appended under a finished answer.
pub fn feedback_footer() -> MarkupElement {
    let icon = |name: &str| {
        MarkupElement::new("span").with_class("icon").with_child(
            MarkupElement::new("i")
                .with_class(format!("fa {}", name))
                .with_attr("style", "color:gray"),
        )
    };

    MarkupElement::new("div")
        .with_class(FEEDBACK_CLASS)
        .with_child(icon("fa-thumbs-o-up"))
        .with_child(icon("fa-thumbs-o-down"))
}

/// Centered, width-fitted copy of a deferred image. The original is left
/// untouched.
pub fn image_frame(image: &MarkupElement) -> MarkupElement {
    let mut scaled = image.clone();
    scaled.set_attr("style", "max-width: 100%; height: auto;");
    MarkupElement::new("div")
        .with_class(IMAGE_FRAME_CLASS)
        .with_attr("style", "text-align: center;")
        .with_child(scaled)
}

/// Logo and assistant name heading a response.
pub fn byline(assistant_name: &str) -> Vec<MarkupNode> {
    vec![
        MarkupElement::new("span")
            .with_class("inner-logo")
            .with_child(
                MarkupElement::new("img")
                    .with_attr("src", LOGO_SRC)
                    .with_attr("alt", "logo")
                    .with_attr("height", "10px")
                    .with_attr("width", "10px"),
            )
            .into(),
        MarkupElement::new("span")
            .with_class("inner-logo-text")
            .with_text(assistant_name)
            .into(),
        MarkupElement::new("br").into(),
        MarkupElement::new("br").into(),
    ]
}
