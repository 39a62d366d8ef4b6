//! Type bridge for feeding frontend key events to tui-textarea
//!
//! Builds `tui_textarea::Input` directly instead of relying on the crossterm
//! `From` impl, so the form does not depend on tui-textarea's crossterm
//! version matching ours.

use crossterm::event::{KeyCode, KeyModifiers};
use tui_textarea::{Input, Key};

/// Convert a key code and modifiers to a textarea input
pub fn to_textarea_input(code: KeyCode, modifiers: KeyModifiers) -> Input {
    let key = match code {
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Enter => Key::Enter,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Tab => Key::Tab,
        KeyCode::Delete => Key::Delete,
        KeyCode::F(n) => Key::F(n),
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Esc => Key::Esc,
        _ => Key::Null,
    };

    Input {
        key,
        ctrl: modifiers.contains(KeyModifiers::CONTROL),
        alt: modifiers.contains(KeyModifiers::ALT),
        shift: modifiers.contains(KeyModifiers::SHIFT),
    }
}
