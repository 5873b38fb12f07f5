//! Terminal User Interface
//!
//! Green-on-black hacking terminal built with ratatui

pub mod app;
pub mod widgets;

pub use app::App;

use crate::data::Severity;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders},
};

/// Color scheme for the console
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub accent: Color,
    pub alert: Color,
    pub success: Color,
    pub warning: Color,
    pub muted: Color,
    pub border: Color,
    pub selected: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::Green,
            accent: Color::Cyan,
            alert: Color::Red,
            success: Color::LightGreen,
            warning: Color::Yellow,
            muted: Color::DarkGray,
            border: Color::Green,
            selected: Color::LightCyan,
        }
    }
}

/// Style for a log line of the given severity
pub fn severity_style(severity: &Severity) -> Style {
    match severity {
        Severity::Success => Style::default().fg(Color::LightGreen),
        Severity::Error => Style::default().fg(Color::Red),
        Severity::Narrative => Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        Severity::Warning => Style::default().fg(Color::Yellow),
        Severity::Info => Style::default().fg(Color::Gray),
    }
}

/// Create a styled border block
pub fn styled_block<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title_style(Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))
}

/// Header title
pub const TITLE: &str = "SMA06F SUBJUGATION PROTOCOL";

/// Footer disclaimer
pub const DISCLAIMER: &str = "FICTIONAL INTERFACE - FOR ARTISTIC PURPOSES ONLY";

/// Help text
pub const HELP_TEXT: &str = r#"
╔══════════════════════════════════════════╗
║                CONTROLS                  ║
╠══════════════════════════════════════════╣
║  ↑/↓ k/j   Move through the USB scan     ║
║  Enter     Select device                 ║
║  s/Space   Initiate protocol             ║
║  ?         Toggle this help              ║
║  q/Esc     Quit                          ║
╚══════════════════════════════════════════╝
"#;

/// Header, body, footer
pub fn create_main_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header
            Constraint::Min(10),   // Body
            Constraint::Length(1), // Footer
        ])
        .split(area)
        .to_vec()
}

/// Left column (controls + scanner) and live log
pub fn create_content_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
        .split(area)
        .to_vec()
}

/// Control panel above the device scanner
pub fn create_side_layout(area: Rect, device_count: usize) -> Vec<Rect> {
    let scanner_height = (device_count as u16).saturating_mul(2).saturating_add(2);
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(18), Constraint::Length(scanner_height)])
        .split(area)
        .to_vec()
}

/// Rect of the given size centred in `area`, clipped to fit
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
