use crate::core::grade_state::GradeState;
use crate::core::{AppCore, InputResult, StatusKind, StatusMessage};
use crate::frontend::tui::grade_form::{GradeFormWidget, FORM_HEIGHT};
use crate::frontend::tui::preview::StampPreview;
use crate::frontend::{Frontend, FrontendEvent};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Terminal,
};
use std::io;
use std::time::Duration;

const HELP: &str = "Tab:Next  Shift+Tab:Prev  Ctrl+E:Copy  Esc:Quit";

/// TUI Frontend using ratatui
///
/// Owns the terminal, the grade form and the preview cache. Grade state
/// lives in `AppCore`; the form only mirrors it.
pub struct TuiFrontend {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    poll_timeout: Duration,
    form: GradeFormWidget,
    preview: StampPreview,
    show_preview: bool,
    restored: bool,
}

impl TuiFrontend {
    /// Create a new TUI frontend
    ///
    /// Initializes terminal in raw mode, enables bracketed paste, and enters
    /// the alternate screen.
    pub fn new(state: &GradeState, show_preview: bool) -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
            .context("Failed to setup terminal")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor()?;

        Ok(Self {
            terminal,
            poll_timeout: Duration::from_millis(16), // ~60 FPS
            form: GradeFormWidget::new(state),
            preview: StampPreview::new(),
            show_preview,
            restored: false,
        })
    }

    /// Set poll timeout (for controlling frame rate)
    pub fn set_poll_timeout(&mut self, timeout: Duration) {
        self.poll_timeout = timeout;
    }

    /// Route an event to the form
    pub fn handle_event(&mut self, event: &FrontendEvent) -> InputResult {
        self.form.handle_event(event)
    }

    /// Mirror accepted values back into the form fields
    pub fn sync_form(&mut self, state: &GradeState) {
        self.form.sync_from(state);
    }

    /// Convert crossterm event to FrontendEvent
    fn convert_event(event: Event) -> Option<FrontendEvent> {
        match event {
            Event::Key(key_event) => {
                // Only process key press events (ignore repeats and releases)
                if key_event.kind != KeyEventKind::Press {
                    return None;
                }
                Some(FrontendEvent::Key {
                    code: key_event.code,
                    modifiers: key_event.modifiers,
                })
            }
            Event::Resize(w, h) => Some(FrontendEvent::Resize {
                width: w,
                height: h,
            }),
            Event::Paste(text) => Some(FrontendEvent::Paste { text }),
            _ => None,
        }
    }
}

impl Frontend for TuiFrontend {
    fn poll_events(&mut self) -> Result<Vec<FrontendEvent>> {
        let mut events = Vec::new();

        // Wait up to one frame for the first event, then drain the rest
        let mut timeout = self.poll_timeout;
        while event::poll(timeout)? {
            if let Some(frontend_event) = Self::convert_event(event::read()?) {
                events.push(frontend_event);
            }
            timeout = Duration::ZERO;
        }

        Ok(events)
    }

    fn render(&mut self, core: &mut AppCore) -> Result<()> {
        let scene = core.model.scene();
        let fonts = core.fonts().clone();
        let title = format!(
            " Grade Stamp  {} / {} ",
            core.model.display_grade(),
            core.model.state().max_grade()
        );
        let status = core.status.clone();
        let show_preview = self.show_preview;
        let form = &mut self.form;
        let preview = &mut self.preview;

        let mut preview_result = Ok(());
        self.terminal.draw(|f| {
            let area = f.area();
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    title,
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ));
            let inner = block.inner(area);
            f.render_widget(block, area);

            let preview_height = if show_preview { Constraint::Min(4) } else { Constraint::Length(0) };
            let [preview_area, form_area, status_area, help_area] = Layout::vertical([
                preview_height,
                Constraint::Length(FORM_HEIGHT),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(inner);

            let buf = f.buffer_mut();
            if show_preview {
                preview_result = preview.render(&scene, &fonts, preview_area, buf);
            }
            form.render(inset(form_area), buf);
            render_status(status.as_ref(), inset(status_area), buf);
            buf.set_string(
                help_area.x + 1,
                help_area.y,
                HELP,
                Style::default().fg(Color::Gray),
            );
        })?;

        if let Err(e) = preview_result {
            tracing::warn!("Failed to draw preview: {:#}", e);
        }
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        let size = self.terminal.size().unwrap_or_default();
        (size.width, size.height)
    }
}

impl Drop for TuiFrontend {
    fn drop(&mut self) {
        // Ensure terminal is restored even if cleanup() wasn't called
        let _ = self.cleanup();
    }
}

/// One column of left padding
fn inset(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(1),
        width: area.width.saturating_sub(1),
        ..area
    }
}

fn render_status(status: Option<&StatusMessage>, area: Rect, buf: &mut Buffer) {
    let Some(status) = status else {
        return;
    };
    let style = match status.kind {
        StatusKind::Info => Style::default().fg(Color::Green),
        StatusKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    };
    Paragraph::new(Line::from(Span::styled(status.text.as_str(), style))).render(area, buf);
}
