//! Custom widgets for the console UI

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Stage progress bar with a percentage readout
pub struct ProgressMeter {
    percent: f64,
    color: Color,
}

impl ProgressMeter {
    pub fn new(percent: f64) -> Self {
        Self {
            percent: percent.clamp(0.0, 100.0),
            color: Color::Green,
        }
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Cells to fill out of `inner_width`
    pub fn filled_cells(&self, inner_width: u16) -> u16 {
        ((self.percent / 100.0) * f64::from(inner_width)).floor() as u16
    }
}

impl Widget for ProgressMeter {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 || area.height < 1 {
            return;
        }

        let inner = area.width - 2;
        let filled = self.filled_cells(inner);

        buf.set_string(area.x, area.y, "[", Style::default().fg(self.color));
        buf.set_string(area.x + area.width - 1, area.y, "]", Style::default().fg(self.color));
        for x in 0..filled {
            buf.set_string(area.x + 1 + x, area.y, "█", Style::default().fg(self.color));
        }
        for x in filled..inner {
            buf.set_string(area.x + 1 + x, area.y, "░", Style::default().fg(Color::DarkGray));
        }

        if area.height > 1 {
            let label = format!("{}%", self.percent.round() as u32);
            let x = area.x + area.width.saturating_sub(label.len() as u16);
            buf.set_string(x, area.y + 1, &label, Style::default().fg(self.color));
        }
    }
}

/// Reveals the newest log line one character at a time
#[derive(Debug, Clone, Default)]
pub struct Typewriter {
    seen_lines: usize,
    started_ms: u64,
}

impl Typewriter {
    /// Restart the effect whenever a new line shows up
    pub fn observe(&mut self, line_count: usize, now_ms: u64) {
        if line_count != self.seen_lines {
            self.seen_lines = line_count;
            self.started_ms = now_ms;
        }
    }

    /// How many characters of a `total`-char line are visible
    pub fn visible_chars(&self, total: usize, now_ms: u64, char_ms: u64) -> usize {
        if char_ms == 0 {
            return total;
        }
        let elapsed = now_ms.saturating_sub(self.started_ms);
        ((elapsed / char_ms) as usize + 1).min(total)
    }
}

/// First `n` characters of `text`, respecting char boundaries
pub fn char_prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Break a styled line into rows of at most `width` characters.
///
/// Breaks fall on character boundaries, so the row count is exact and the
/// caller can keep the newest rows in view.
pub fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![Line::from(spans)];
    }
    let mut rows = Vec::new();
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut used = 0;
    for span in spans {
        let mut rest: &str = &span.content;
        while !rest.is_empty() {
            if used == width {
                rows.push(Line::from(std::mem::take(&mut row)));
                used = 0;
            }
            let take = (width - used).min(rest.chars().count());
            let head = char_prefix(rest, take);
            row.push(Span::styled(head.to_string(), span.style));
            used += take;
            rest = &rest[head.len()..];
        }
    }
    if !row.is_empty() || rows.is_empty() {
        rows.push(Line::from(row));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_fills_proportionally() {
        assert_eq!(ProgressMeter::new(50.0).filled_cells(20), 10);
        assert_eq!(ProgressMeter::new(150.0).filled_cells(20), 20);
        assert_eq!(ProgressMeter::new(-3.0).filled_cells(20), 0);
    }

    #[test]
    fn meter_renders_bar_and_label() {
        let area = Rect::new(0, 0, 12, 2);
        let mut buf = Buffer::empty(area);
        ProgressMeter::new(50.0).render(area, &mut buf);

        assert_eq!(buf[(0, 0)].symbol(), "[");
        assert_eq!(buf[(1, 0)].symbol(), "█");
        assert_eq!(buf[(10, 0)].symbol(), "░");
        assert_eq!(buf[(11, 0)].symbol(), "]");
        assert_eq!(buf[(9, 1)].symbol(), "5");
    }

    #[test]
    fn typewriter_restarts_on_new_line() {
        let mut tw = Typewriter::default();
        tw.observe(1, 1000);
        assert_eq!(tw.visible_chars(40, 1000, 15), 1);
        assert_eq!(tw.visible_chars(40, 1150, 15), 11);
        assert_eq!(tw.visible_chars(40, 9000, 15), 40);

        tw.observe(1, 2000);
        assert_eq!(tw.visible_chars(40, 2000, 15), 40);

        tw.observe(2, 2000);
        assert_eq!(tw.visible_chars(40, 2000, 15), 1);
    }

    #[test]
    fn wrap_spans_splits_across_styles() {
        let red = Style::default().fg(Color::Red);
        let spans = vec![Span::raw("12:00  "), Span::styled("abcdefgh", red)];
        let rows = wrap_spans(spans, 6);

        let text: Vec<String> = rows
            .iter()
            .map(|row| row.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, ["12:00 ", " abcde", "fgh"]);
        assert_eq!(rows[1].spans[1].style, red);
        assert_eq!(wrap_spans(Vec::new(), 6).len(), 1);
    }

    #[test]
    fn char_prefix_handles_multibyte() {
        assert_eq!(char_prefix("héllo", 2), "hé");
        assert_eq!(char_prefix("abc", 10), "abc");
        assert_eq!(char_prefix("abc", 0), "");
    }
}
