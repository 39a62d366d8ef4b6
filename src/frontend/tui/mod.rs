//! TUI Frontend (ratatui-based)
//!
//! Implements the Frontend trait using ratatui for terminal rendering and
//! crossterm for events and terminal management.

pub mod app;
pub mod event_bridge;
pub mod grade_form;
pub mod preview;

pub use app::TuiFrontend;
