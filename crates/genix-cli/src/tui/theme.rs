use ratatui::style::{Color, Modifier, Style};

pub const HEADER_BG: Color = Color::Blue;
pub const HEADER_FG: Color = Color::White;
pub const STATUS_FG: Color = Color::DarkGray;
pub const INPUT_FG: Color = Color::Yellow;
pub const BORDER_FG: Color = Color::DarkGray;
pub const ERROR_FG: Color = Color::Red;
pub const HIGHLIGHT_FG: Color = Color::Yellow;
pub const SEARCH_FG: Color = Color::Cyan;
pub const ASSISTANT_FG: Color = Color::LightBlue;
pub const IMAGE_FG: Color = Color::Magenta;

pub fn header_style() -> Style {
    Style::default().bg(HEADER_BG).fg(HEADER_FG)
}

pub fn status_style() -> Style {
    Style::default().fg(STATUS_FG)
}

pub fn input_style() -> Style {
    Style::default().fg(INPUT_FG)
}

pub fn border_style() -> Style {
    Style::default().fg(BORDER_FG)
}

pub fn dim_style() -> Style {
    Style::default().fg(STATUS_FG).add_modifier(Modifier::DIM)
}

pub fn connection_style(connected: bool) -> Style {
    if connected {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(ERROR_FG)
    }
}
