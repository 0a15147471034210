//! Markup segmentation.
//!
//! Splits a markup body into the units a typing session appends one per
//! tick. Only the fragment's immediate children are split, so a block
//! element (however deeply nested) is always a single unit.

use scraper::{ElementRef, Html, Node};

use super::markup::{MarkupElement, MarkupNode};

/// One atomic render step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNode {
    /// Appended as a whole, cloned structural node
    Element(MarkupElement),
    /// Appended as raw text, merged into the container's trailing text
    Text(String),
}

impl ContentNode {
    pub fn into_markup(self) -> MarkupNode {
        match self {
            Self::Element(element) => MarkupNode::Element(element),
            Self::Text(text) => MarkupNode::Text(text),
        }
    }
}

impl From<MarkupNode> for ContentNode {
    fn from(node: MarkupNode) -> Self {
        match node {
            MarkupNode::Element(element) => Self::Element(element),
            MarkupNode::Text(text) => Self::Text(text),
        }
    }
}

/// Segmented body with its images pulled out for deferred appending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmented {
    pub nodes: Vec<ContentNode>,
    /// `img` elements in document order
    pub images: Vec<MarkupElement>,
}

/// Parse a markup fragment into an owned node list.
///
/// Comments, doctypes and processing instructions are dropped.
pub fn parse_fragment(markup: &str) -> Vec<MarkupNode> {
    let fragment = Html::parse_fragment(markup);
    copy_children(fragment.root_element())
}

/// Split `markup` into content nodes, one per top-level child.
pub fn segment(markup: &str) -> Vec<ContentNode> {
    if markup.trim().is_empty() {
        return Vec::new();
    }

    parse_fragment(markup)
        .into_iter()
        .map(ContentNode::from)
        .collect()
}

/// Like [`segment`], but detaches every `img` descendant first and returns
/// the images separately.
pub fn segment_with_images(markup: &str) -> Segmented {
    if markup.trim().is_empty() {
        return Segmented::default();
    }

    let mut images = Vec::new();
    let nodes = detach_images(parse_fragment(markup), &mut images)
        .into_iter()
        .map(ContentNode::from)
        .collect();

    Segmented { nodes, images }
}

fn copy_children(element: ElementRef<'_>) -> Vec<MarkupNode> {
    element
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(MarkupNode::Text(text.to_string())),
            Node::Element(_) => ElementRef::wrap(child).map(|el| MarkupNode::Element(copy_element(el))),
            _ => None,
        })
        .collect()
}

fn copy_element(element: ElementRef<'_>) -> MarkupElement {
    let value = element.value();
    MarkupElement {
        name: value.name().to_string(),
        attrs: value
            .attrs()
            .map(|(key, val)| (key.to_string(), val.to_string()))
            .collect(),
        children: copy_children(element),
    }
}

/// Remove `img` elements from the tree, pushing them to `images` in
/// pre-order.
fn detach_images(nodes: Vec<MarkupNode>, images: &mut Vec<MarkupElement>) -> Vec<MarkupNode> {
    let mut kept = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            MarkupNode::Element(element) if element.name == "img" => images.push(element),
            MarkupNode::Element(mut element) => {
                element.children = detach_images(std::mem::take(&mut element.children), images);
                kept.push(MarkupNode::Element(element));
            }
            text => kept.push(text),
        }
    }
    kept
}
