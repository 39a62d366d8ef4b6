//! Frontend abstraction layer
//!
//! This module defines the `Frontend` trait the terminal frontend implements:
//! event polling, rendering and cleanup, kept apart from the core logic.

pub mod events;
pub mod tui;

use crate::core::AppCore;
use anyhow::Result;
pub use events::FrontendEvent;
pub use tui::TuiFrontend;

/// Frontend trait
///
/// Frontends read `AppCore` to draw and translate native input into
/// `FrontendEvent`s. They never change grade state directly.
pub trait Frontend {
    /// Poll for user input events
    ///
    /// Returns all pending events, converted to `FrontendEvent`. An empty
    /// list means the poll timed out.
    fn poll_events(&mut self) -> Result<Vec<FrontendEvent>>;

    /// Render the current application state
    ///
    /// Mutable because drawing marks the scene as mounted and may refresh
    /// cached preview pixels.
    fn render(&mut self, core: &mut AppCore) -> Result<()>;

    /// Restore the terminal before exit
    fn cleanup(&mut self) -> Result<()>;

    /// Current terminal size in cells
    fn size(&self) -> (u16, u16);
}
