use crate::tui::{
    app::OverlayApp,
    markup::{render_snapshot, wrap_lines},
    theme,
};
use genix_core::{ConnectionState, NoticeLevel, PanelController};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

const INPUT_HEIGHT: u16 = 3;
const BUBBLE_WIDTH: u16 = 22;
const BUBBLE_HEIGHT: u16 = 3;
/// Ticks per typing indicator step
const INDICATOR_TICKS: usize = 5;

pub fn draw(f: &mut Frame, app: &OverlayApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(f.area());

    draw_backdrop(f, chunks[0]);
    draw_status(f, chunks[1], app);

    if app.panel.is_open() {
        let area = panel_rect(chunks[0], app.panel.is_maximized(), app.config.panel_width);
        draw_panel(f, area, app);
    } else {
        draw_bubble(f, chunks[0]);
    }
}

/// Panel area: the right-hand column, or everything when maximized.
pub fn panel_rect(area: Rect, maximized: bool, panel_width: u16) -> Rect {
    if maximized {
        return area;
    }
    let width = panel_width.clamp(1, area.width.max(1)).min(area.width);
    Rect {
        x: area.x + area.width - width,
        y: area.y,
        width,
        height: area.height,
    }
}

fn draw_backdrop(f: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(" Genix overlay", theme::header_style())),
        Line::from(""),
        Line::from(" Esc: open/close chat   F2: maximize   PgUp/PgDn/End: scroll"),
        Line::from(" Enter: search keyword   Ctrl+C: exit"),
    ];
    f.render_widget(Paragraph::new(lines).style(theme::status_style()), area);
}

fn draw_bubble(f: &mut Frame, area: Rect) {
    if area.width < BUBBLE_WIDTH || area.height < BUBBLE_HEIGHT {
        return;
    }
    let bubble = Rect {
        x: area.x + area.width - BUBBLE_WIDTH,
        y: area.y + area.height - BUBBLE_HEIGHT,
        width: BUBBLE_WIDTH,
        height: BUBBLE_HEIGHT,
    };
    let widget = Paragraph::new(" 💬 Genix Support").block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme::HEADER_BG)),
    );
    f.render_widget(Clear, bubble);
    f.render_widget(widget, bubble);
}

fn draw_panel(f: &mut Frame, area: Rect, app: &OverlayApp) {
    let hint = if app.panel.is_maximized() {
        " F2 restore | Esc close "
    } else {
        " F2 maximize | Esc close "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::border_style())
        .title(Span::styled(" Genix Support ", theme::header_style()))
        .title_top(Line::from(hint).right_aligned());

    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(INPUT_HEIGHT)])
        .split(inner);

    draw_messages(f, chunks[0], app);
    draw_input(f, chunks[1], app);
}

fn draw_messages(f: &mut Frame, area: Rect, app: &OverlayApp) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let snapshot = app.surface.snapshot();
    if snapshot.is_empty() {
        let waiting = Paragraph::new("Waiting for incidents...").style(theme::dim_style());
        f.render_widget(waiting, area);
        return;
    }

    let lines = wrap_lines(
        render_snapshot(&snapshot, app.frame / INDICATOR_TICKS),
        area.width,
    );
    let top = scroll_top(
        lines.len(),
        usize::from(area.height),
        app.surface.scroll_state().offset_from_bottom,
    );
    let widget = Paragraph::new(lines).scroll((u16::try_from(top).unwrap_or(u16::MAX), 0));
    f.render_widget(widget, area);
}

/// First visible row, given a scroll offset counted from the bottom.
pub fn scroll_top(total: usize, height: usize, offset_from_bottom: usize) -> usize {
    let max_top = total.saturating_sub(height);
    max_top.saturating_sub(offset_from_bottom.min(max_top))
}

fn draw_input(f: &mut Frame, area: Rect, app: &OverlayApp) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::border_style())
        .title(" Search ");

    let content_area = block.inner(area);
    f.render_widget(block, area);

    if content_area.height == 0 || content_area.width == 0 {
        return;
    }

    let input = Paragraph::new(app.input.as_str()).style(theme::input_style());
    f.render_widget(input, content_area);

    let clamped_col = app
        .cursor_column()
        .min(content_area.width.saturating_sub(1));
    f.set_cursor_position((content_area.x + clamped_col, content_area.y));
}

fn draw_status(f: &mut Frame, area: Rect, app: &OverlayApp) {
    let mut spans = vec![Span::styled(" live: ", theme::status_style())];
    spans.push(state_span(&app.live_state()));
    spans.push(Span::styled(" | search: ", theme::status_style()));
    spans.push(state_span(&app.search_state()));

    if let Some(notice) = &app.latest_notice {
        let style = match notice.level {
            NoticeLevel::Info => theme::status_style(),
            NoticeLevel::Warning => Style::default().fg(Color::Yellow),
            NoticeLevel::Error => Style::default().fg(theme::ERROR_FG),
        };
        spans.push(Span::styled(" | ", theme::status_style()));
        spans.push(Span::styled(notice.to_string(), style));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn state_span(state: &ConnectionState) -> Span<'static> {
    Span::styled(state.to_string(), theme::connection_style(state.is_connected()))
}
