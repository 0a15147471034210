//! Surface snapshot to terminal lines.

use genix_core::content::{MarkupElement, MarkupNode};
use genix_core::surface::{ContainerSnapshot, SnapshotNode};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

use super::theme;

const BLOCK_ELEMENTS: &[&str] = &[
    "div", "p", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6", "table", "tr", "pre",
    "blockquote",
];

/// Render every top-level container, separated by a blank line.
///
/// `frame` drives the typing indicator animation.
pub fn render_snapshot(containers: &[ContainerSnapshot], frame: usize) -> Vec<Line<'static>> {
    let mut builder = LineBuilder::new(frame);
    for (index, container) in containers.iter().enumerate() {
        if index > 0 {
            builder.blank_line();
        }
        builder.container(container, Style::default());
    }
    builder.finish()
}

/// Hard-wrap lines to `width` columns, keeping span styles.
pub fn wrap_lines(lines: Vec<Line<'static>>, width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width.max(1));
    let mut wrapped = Vec::with_capacity(lines.len());

    for line in lines {
        let mut row: Vec<Span<'static>> = Vec::new();
        let mut row_width = 0;

        for span in line.spans {
            let style = span.style;
            let mut chunk = String::new();
            for ch in span.content.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if row_width + ch_width > width && row_width > 0 {
                    if !chunk.is_empty() {
                        row.push(Span::styled(std::mem::take(&mut chunk), style));
                    }
                    wrapped.push(Line::from(std::mem::take(&mut row)));
                    row_width = 0;
                }
                chunk.push(ch);
                row_width += ch_width;
            }
            if !chunk.is_empty() {
                row.push(Span::styled(chunk, style));
            }
        }
        wrapped.push(Line::from(row));
    }

    wrapped
}

struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    frame: usize,
}

impl LineBuilder {
    fn new(frame: usize) -> Self {
        Self {
            lines: Vec::new(),
            current: Vec::new(),
            frame,
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.break_line();
        self.lines
    }

    fn is_line_empty(&self) -> bool {
        self.current.iter().all(|span| span.content.trim().is_empty())
    }

    fn push(&mut self, text: impl Into<String>, style: Style) {
        let text = text.into();
        if !text.is_empty() {
            self.current.push(Span::styled(text, style));
        }
    }

    /// End the current line if it has content.
    fn break_line(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
        }
    }

    /// Unconditional line break, as for `<br>`.
    fn hard_break(&mut self) {
        self.lines.push(Line::from(std::mem::take(&mut self.current)));
    }

    fn blank_line(&mut self) {
        self.break_line();
        self.lines.push(Line::default());
    }

    fn container(&mut self, container: &ContainerSnapshot, inherited: Style) {
        self.break_line();
        let style = container_style(&container.class, inherited);
        for child in &container.children {
            match child {
                SnapshotNode::Markup(node) => self.node(node, style),
                SnapshotNode::Container(nested) => self.container(nested, style),
            }
        }
        self.break_line();
    }

    fn node(&mut self, node: &MarkupNode, style: Style) {
        match node {
            MarkupNode::Text(text) => self.text(text, style),
            MarkupNode::Element(element) => self.element(element, style),
        }
    }

    fn text(&mut self, text: &str, style: Style) {
        let collapsed = collapse_whitespace(text);
        if collapsed.trim().is_empty() && self.is_line_empty() {
            return;
        }
        let collapsed = if self.is_line_empty() {
            collapsed.trim_start().to_string()
        } else {
            collapsed
        };
        self.push(collapsed, style);
    }

    fn element(&mut self, element: &MarkupElement, inherited: Style) {
        if element.has_class("typing-indicator") {
            self.break_line();
            let dots = "•".repeat(self.frame % 3 + 1);
            self.push(dots, theme::dim_style());
            self.break_line();
            return;
        }
        if element.has_class("chat-icons") {
            self.break_line();
            self.push("[+] [-]", theme::dim_style());
            self.break_line();
            return;
        }
        if element.has_class("inner-logo") {
            self.push("◉ ", Style::default().fg(theme::ASSISTANT_FG));
            return;
        }

        match element.name.as_str() {
            "br" => {
                self.hard_break();
                return;
            }
            "img" => {
                let label = element
                    .attr("alt")
                    .filter(|alt| !alt.is_empty())
                    .or_else(|| element.attr("src"))
                    .unwrap_or("image");
                self.push(format!("[image: {}]", label), Style::default().fg(theme::IMAGE_FG));
                return;
            }
            _ => {}
        }

        let style = element_style(element, inherited);
        let is_block = BLOCK_ELEMENTS.contains(&element.name.as_str());
        if is_block {
            self.break_line();
        }
        if element.name == "li" {
            self.push("• ", style);
        }
        if element.has_class("timestamp") {
            self.break_line();
        }

        for child in &element.children {
            self.node(child, style);
        }

        if is_block || element.has_class("timestamp") {
            self.break_line();
        }
    }
}

fn container_style(class: &str, inherited: Style) -> Style {
    let has = |name: &str| class.split_whitespace().any(|c| c == name);
    if has("search-box") || has("search-result") {
        inherited.fg(theme::SEARCH_FG)
    } else {
        inherited
    }
}

fn element_style(element: &MarkupElement, inherited: Style) -> Style {
    let mut style = match element.name.as_str() {
        "b" | "strong" => inherited.add_modifier(Modifier::BOLD),
        "i" | "em" => inherited.add_modifier(Modifier::ITALIC),
        "u" => inherited.add_modifier(Modifier::UNDERLINED),
        "code" | "pre" => inherited.fg(theme::HIGHLIGHT_FG),
        _ => inherited,
    };

    if element.has_class("error-box") {
        style = style.fg(theme::ERROR_FG);
    } else if element.has_class("highlight-box") {
        style = style.fg(theme::HIGHLIGHT_FG);
    } else if element.has_class("timestamp") {
        style = theme::dim_style();
    } else if element.has_class("inner-logo-text") {
        style = style.fg(theme::ASSISTANT_FG).add_modifier(Modifier::BOLD);
    }
    style
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}
