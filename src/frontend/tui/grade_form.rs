//! Form for editing the grade, the max grade and the export scale.
//!
//! The form never validates; every edit is reported as an `InputResult` and
//! the field text is resynced from the accepted state afterwards, so a
//! rejected keystroke simply does not stick.

use crate::core::grade_state::GradeState;
use crate::core::input_result::{Field, InputResult};
use crate::frontend::events::FrontendEvent;
use crate::frontend::tui::event_bridge::to_textarea_input;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget as RatatuiWidget},
};
use tui_textarea::{CursorMove, TextArea};

const FIELDS: [Field; 3] = [Field::Grade, Field::MaxGrade, Field::ExportScale];
/// Focus slot of the copy button, after the three fields
const BUTTON: usize = FIELDS.len();
const LABEL_WIDTH: u16 = 14;
const INPUT_WIDTH: u16 = 12;
const BUTTON_LABEL: &str = "[ Copy to clipboard ]";

/// Rows the form occupies
pub const FORM_HEIGHT: u16 = 5;

pub struct GradeFormWidget {
    focused: usize,
    grade: TextArea<'static>,
    max_grade: TextArea<'static>,
    export_scale: TextArea<'static>,
}

impl GradeFormWidget {
    pub fn new(state: &GradeState) -> Self {
        Self {
            focused: 0,
            grade: field_area(&state.display_grade()),
            max_grade: field_area(state.max_grade()),
            export_scale: field_area(state.export_scale()),
        }
    }

    /// The field with keyboard focus, or `None` on the copy button
    pub fn focused_field(&self) -> Option<Field> {
        FIELDS.get(self.focused).copied()
    }

    pub fn value(&self, field: Field) -> String {
        self.textarea(field).lines().join("")
    }

    fn textarea(&self, field: Field) -> &TextArea<'static> {
        match field {
            Field::Grade => &self.grade,
            Field::MaxGrade => &self.max_grade,
            Field::ExportScale => &self.export_scale,
        }
    }

    fn textarea_mut(&mut self, field: Field) -> &mut TextArea<'static> {
        match field {
            Field::Grade => &mut self.grade,
            Field::MaxGrade => &mut self.max_grade,
            Field::ExportScale => &mut self.export_scale,
        }
    }

    pub fn handle_event(&mut self, event: &FrontendEvent) -> InputResult {
        match event {
            FrontendEvent::Key { code, modifiers } => self.handle_key(*code, *modifiers),
            FrontendEvent::Paste { text } => {
                let Some(field) = self.focused_field() else {
                    return InputResult::Continue;
                };
                // Fields are single-line
                let line = text.lines().next().unwrap_or_default();
                if line.is_empty() {
                    return InputResult::Continue;
                }
                self.textarea_mut(field).insert_str(line);
                self.edited(field)
            }
            FrontendEvent::Resize { .. } => InputResult::Continue,
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> InputResult {
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        match code {
            KeyCode::Esc => InputResult::Quit,
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => InputResult::Quit,
            KeyCode::Char('e') if ctrl => InputResult::Export,
            KeyCode::Tab | KeyCode::Down => {
                self.next_field();
                InputResult::Continue
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.previous_field();
                InputResult::Continue
            }
            KeyCode::Enter | KeyCode::Char(' ') if self.focused == BUTTON => InputResult::Export,
            KeyCode::Enter => {
                self.next_field();
                InputResult::Continue
            }
            _ => {
                let Some(field) = self.focused_field() else {
                    return InputResult::Continue;
                };
                if self
                    .textarea_mut(field)
                    .input(to_textarea_input(code, modifiers))
                {
                    self.edited(field)
                } else {
                    InputResult::Continue
                }
            }
        }
    }

    fn edited(&self, field: Field) -> InputResult {
        InputResult::Edit {
            field,
            value: self.value(field),
        }
    }

    fn next_field(&mut self) {
        self.focused = (self.focused + 1) % (BUTTON + 1);
    }

    fn previous_field(&mut self) {
        self.focused = if self.focused == 0 {
            BUTTON
        } else {
            self.focused - 1
        };
    }

    /// Show the accepted values, the grade in its display form. Fields
    /// already showing them keep their cursor.
    pub fn sync_from(&mut self, state: &GradeState) {
        for field in FIELDS {
            let accepted = match field {
                Field::Grade => state.display_grade(),
                Field::MaxGrade => state.max_grade().to_string(),
                Field::ExportScale => state.export_scale().to_string(),
            };
            if self.value(field) != accepted {
                *self.textarea_mut(field) = field_area(&accepted);
            }
        }
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let focused = self.focused;
        for (idx, field) in FIELDS.into_iter().enumerate() {
            let y = area.y + idx as u16;
            if y >= area.bottom() {
                return;
            }
            let is_focused = focused == idx;
            let label_style = if is_focused {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Rgb(100, 149, 237))
            };
            let label = format!("{}:", field.label());
            let label_area = Rect {
                x: area.x,
                y,
                width: LABEL_WIDTH.min(area.width),
                height: 1,
            };
            Paragraph::new(Line::from(Span::styled(label, label_style))).render(label_area, buf);

            let input_area = Rect {
                x: area.x + LABEL_WIDTH,
                y,
                width: INPUT_WIDTH.min(area.width.saturating_sub(LABEL_WIDTH)),
                height: 1,
            };
            if input_area.width == 0 {
                continue;
            }

            let textarea = self.textarea_mut(field);
            textarea.set_style(Style::default().fg(Color::White).bg(Color::Rgb(40, 40, 40)));
            textarea.set_cursor_line_style(Style::default());
            if is_focused {
                textarea
                    .set_cursor_style(Style::default().fg(Color::Black).bg(Color::White));
            } else {
                // Hide the cursor of unfocused fields
                textarea.set_cursor_style(Style::default().bg(Color::Rgb(40, 40, 40)));
            }
            RatatuiWidget::render(&*textarea, input_area, buf);
        }

        let button_y = area.y + BUTTON as u16 + 1;
        if button_y < area.bottom() {
            let style = if focused == BUTTON {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Yellow)
            };
            buf.set_string(area.x, button_y, BUTTON_LABEL, style);
        }
    }
}

/// Single-line text area holding `value` with the cursor at the end
fn field_area(value: &str) -> TextArea<'static> {
    let mut textarea = TextArea::new(vec![value.to_string()]);
    textarea.move_cursor(CursorMove::End);
    textarea
}
