//! Core logic layer
//!
//! Grade state, layout and scene composition. NO imports from frontend/ or
//! terminal rendering code. Core owns the data, frontends read and render.

pub mod app_core;
pub mod grade_state;
pub mod input_result;
pub mod layout;
pub mod measure;
pub mod scene;
pub mod scene_model;

pub use app_core::{AppCore, StatusKind, StatusMessage};
pub use input_result::{Field, InputResult};
pub use measure::UsvgTextMeasurer;
