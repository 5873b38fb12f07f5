//! Main application state and rendering

use crate::game::{Session, Telemetry};
use crate::data::LogEntry;
use crate::tui::widgets::{char_prefix, wrap_spans, ProgressMeter, Typewriter};
use crate::tui::{
    centered_rect, create_content_layout, create_main_layout, create_side_layout, severity_style,
    styled_block, Theme, DISCLAIMER, HELP_TEXT, TITLE,
};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::time::Duration;
use tracing::debug;

/// Application state
pub struct App {
    pub session: Session,
    pub theme: Theme,
    pub running: bool,
    pub show_help: bool,
    pub device_state: ListState,
    typewriter: Typewriter,
}

impl App {
    pub fn new(session: Session) -> Self {
        let mut device_state = ListState::default();
        device_state.select(Some(0));

        Self {
            session,
            theme: Theme::default(),
            running: true,
            show_help: false,
            device_state,
            typewriter: Typewriter::default(),
        }
    }

    /// Advance the protocol clock
    pub fn tick(&mut self) {
        self.session.advance();
        self.typewriter
            .observe(self.session.timeline().len(), self.session.now_ms());
    }

    /// Handle keyboard input; `false` means quit
    pub fn handle_input(&mut self) -> std::io::Result<bool> {
        let poll = Duration::from_millis(self.session.config().timing.frame_poll_ms);
        if event::poll(poll)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(true);
                }
                self.handle_key(key.code);
            }
        }
        Ok(self.running)
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        if self.show_help {
            self.show_help = false;
            return;
        }
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Up | KeyCode::Char('k') => self.navigate_up(),
            KeyCode::Down | KeyCode::Char('j') => self.navigate_down(),
            KeyCode::Enter => self.select_highlighted(),
            KeyCode::Char('s') | KeyCode::Char(' ') => self.initiate(),
            _ => {}
        }
    }

    fn navigate_up(&mut self) {
        let i = self.device_state.selected().unwrap_or(0);
        self.device_state.select(Some(i.saturating_sub(1)));
    }

    fn navigate_down(&mut self) {
        let last = self.session.devices().len().saturating_sub(1);
        let i = self.device_state.selected().unwrap_or(0);
        self.device_state.select(Some((i + 1).min(last)));
    }

    fn select_highlighted(&mut self) {
        let Some(i) = self.device_state.selected() else {
            return;
        };
        if let Some(id) = self.session.devices().get(i).map(|d| d.id.clone()) {
            // Only unknown ids fail and the list never contains one
            let _ = self.session.select_device(&id);
        }
    }

    fn initiate(&mut self) {
        if self.session.run_state().running {
            return;
        }
        // A rejected start already printed its own error line
        if let Err(err) = self.session.start_protocol() {
            debug!(error = %err, "initiate rejected");
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.bg)),
            area,
        );

        let layout = create_main_layout(area);
        self.render_header(frame, layout[0]);

        let content = create_content_layout(layout[1]);
        let side = create_side_layout(content[0], self.session.devices().len());
        self.render_control_panel(frame, side[0]);
        self.render_scanner(frame, side[1]);
        self.render_log(frame, content[1]);

        let footer = Paragraph::new(DISCLAIMER)
            .style(Style::default().fg(self.theme.muted))
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[2]);

        if self.show_help {
            self.render_help_overlay(frame);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let text = vec![
            Line::from(Span::styled(
                TITLE,
                Style::default().fg(self.theme.accent).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!(
                    "SYSTEM INTERFACE // OPERATOR: {}",
                    self.session.config().operator.to_uppercase()
                ),
                Style::default().fg(self.theme.fg),
            )),
        ];
        let header = Paragraph::new(text).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.accent)),
        );
        frame.render_widget(header, area);
    }

    fn render_control_panel(&self, frame: &mut Frame, area: Rect) {
        let block = styled_block("CONTROL PANEL", &self.theme);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Initiate button
                Constraint::Length(5), // Target info
                Constraint::Length(4), // Current stage
                Constraint::Min(5),    // System status
            ])
            .split(inner);

        let state = self.session.run_state();
        let (label, style) = if state.running {
            ("[ PROTOCOL RUNNING ]", Style::default().fg(self.theme.muted))
        } else if self.session.can_start() {
            (
                "[ INITIATE PROTOCOL ]",
                Style::default().fg(self.theme.alert).add_modifier(Modifier::BOLD),
            )
        } else {
            ("[ INITIATE PROTOCOL ]", Style::default().fg(self.theme.muted))
        };
        frame.render_widget(
            Paragraph::new(label).style(style).alignment(Alignment::Center),
            chunks[0],
        );

        let mut target = vec![Line::from(Span::styled("TARGET INFO:", Style::default().fg(self.theme.fg)))];
        match self.session.current_device() {
            Some(device) => {
                let status_color = if device.is_target { self.theme.alert } else { self.theme.fg };
                target.push(field_line("MODEL", &device.model, self.theme.accent));
                target.push(field_line("ID", &device.id, self.theme.accent));
                target.push(field_line("STATUS", &device.status.to_string(), status_color));
            }
            None => target.push(Line::from(Span::styled(
                "No target selected...",
                Style::default().fg(self.theme.muted),
            ))),
        }
        frame.render_widget(Paragraph::new(target), chunks[1]);

        self.render_stage(frame, chunks[2]);
        self.render_system_status(frame, chunks[3]);
    }

    fn render_stage(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let state = self.session.run_state();
        let stage_line = match (state.running, self.session.current_stage()) {
            (true, Some(stage)) => Span::styled(
                stage.name.clone(),
                Style::default().fg(self.theme.accent).add_modifier(Modifier::SLOW_BLINK),
            ),
            (true, None) => Span::styled("Preparing...", Style::default().fg(self.theme.accent)),
            (false, _) => Span::styled("Awaiting initiation...", Style::default().fg(self.theme.muted)),
        };
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled("CURRENT STAGE:", Style::default().fg(self.theme.fg))),
                Line::from(stage_line),
            ]),
            rows[0],
        );

        if state.running {
            frame.render_widget(ProgressMeter::new(state.progress).color(self.theme.fg), rows[1]);
        }
    }

    fn render_system_status(&self, frame: &mut Frame, area: Rect) {
        let t = self.session.telemetry();
        let running = self.session.run_state().running;
        let live = |on: bool| if on { self.theme.accent } else { self.theme.muted };

        let lines = vec![
            Line::from(Span::styled("SYSTEM STATUS", Style::default().fg(self.theme.fg).add_modifier(Modifier::BOLD))),
            status_line(
                "CORE TEMP",
                format!("{:.1}°C", t.core_temp),
                if t.core_overheating() { self.theme.alert } else { self.theme.fg },
            ),
            status_line(
                "NETWORK",
                format!("{:.1}%", t.network_integrity),
                if t.network_degraded() { self.theme.warning } else { self.theme.fg },
            ),
            status_line("STEALTH MODE", Telemetry::stealth_mode(running).to_string(), live(running)),
            status_line("C2 CONNECTION", Telemetry::c2_connection(running).to_string(), live(running)),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_scanner(&mut self, frame: &mut Frame, area: Rect) {
        let selected_id = self.session.current_device().map(|d| d.id.clone());
        let items: Vec<ListItem> = self
            .session
            .devices()
            .iter()
            .map(|device| {
                let picked = selected_id.as_deref() == Some(device.id.as_str());
                let model_style = if picked {
                    Style::default().fg(self.theme.selected).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.fg).add_modifier(Modifier::BOLD)
                };
                let status_style = if device.is_target {
                    Style::default().fg(self.theme.alert)
                } else {
                    Style::default().fg(Color::Gray)
                };
                ListItem::new(vec![
                    Line::from(Span::styled(device.model.clone(), model_style)),
                    Line::from(vec![
                        Span::styled(format!("{} - ", device.id), Style::default().fg(Color::Gray)),
                        Span::styled(device.status.to_string(), status_style),
                    ]),
                ])
            })
            .collect();

        let list = List::new(items)
            .block(styled_block("USB DEVICE SCAN", &self.theme))
            .highlight_style(Style::default().bg(Color::Rgb(0, 40, 40)))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, area, &mut self.device_state);
    }

    fn render_log(&self, frame: &mut Frame, area: Rect) {
        let block = styled_block(
            &format!("LIVE LOG // {}", self.session.timeline().summary()),
            &self.theme,
        );
        let inner = block.inner(area);
        let rows = self.log_rows(inner.width as usize, inner.height as usize);
        frame.render_widget(Paragraph::new(rows).block(block), area);
    }

    /// The newest `height` wrapped rows of the log, oldest first
    fn log_rows(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let entries = self.session.timeline().snapshot();
        let mut rows: Vec<Line<'static>> = Vec::new();
        for (index, entry) in entries.iter().enumerate().rev() {
            if rows.len() >= height {
                break;
            }
            let is_last = index + 1 == entries.len();
            let mut wrapped = wrap_spans(self.entry_spans(entry, is_last), width);
            wrapped.append(&mut rows);
            rows = wrapped;
        }
        let overflow = rows.len().saturating_sub(height);
        rows.split_off(overflow)
    }

    fn entry_spans(&self, entry: &LogEntry, is_last: bool) -> Vec<Span<'static>> {
        let style = severity_style(&entry.severity);
        let mut spans = vec![Span::styled(
            format!("{}  ", entry.clock_time()),
            Style::default().fg(Color::Rgb(0, 120, 0)),
        )];
        if !is_last {
            spans.push(Span::styled(entry.text.clone(), style));
            return spans;
        }
        let total = entry.text.chars().count();
        let char_ms = self.session.config().timing.typewriter_char_ms;
        let shown = self
            .typewriter
            .visible_chars(total, self.session.now_ms(), char_ms);
        spans.push(Span::styled(char_prefix(&entry.text, shown).to_string(), style));
        if shown < total {
            spans.push(Span::styled("▌", style));
        }
        spans
    }

    fn render_help_overlay(&self, frame: &mut Frame) {
        let popup = centered_rect(46, 12, frame.area());
        frame.render_widget(Clear, popup);
        let help = Paragraph::new(HELP_TEXT).style(Style::default().fg(self.theme.accent));
        frame.render_widget(help, popup);
    }
}

fn field_line(label: &str, value: &str, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(value.to_string(), Style::default().fg(color)),
    ])
}

fn status_line(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ])
}
