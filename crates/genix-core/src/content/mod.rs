//! Content segmentation
//!
//! Turns markup-bearing payload text into an ordered sequence of render
//! steps. Parsing uses a full HTML5 fragment parser so nested blocks stay
//! intact; the result is copied into an owned tree ([`MarkupNode`]) that
//! the display surface stores and the renderer clones from.

mod markup;
mod segment;

pub use markup::{MarkupElement, MarkupNode, escape_attr, escape_text, to_html};
pub use segment::{ContentNode, Segmented, parse_fragment, segment, segment_with_images};
