//! Grade state plus the two-phase layout that depends on rendered glyphs.
//!
//! The underline and the max grade label are placed from the measured width
//! of the grade text, which only exists after the text has been laid out.
//! Layout therefore runs in two passes:
//!
//! 1. `layout_geometry()` uses the last measured width (provisional after a
//!    grade change),
//! 2. `measure()` lays the grade glyphs out and records their width,
//! 3. `layout_geometry()` again yields the final placement.
//!
//! `settle()` performs step 2 only when the measurement is stale. A frontend
//! may draw one provisional frame; anything that reads the scene for export
//! settles first.

use crate::core::grade_state::GradeState;
use crate::core::layout::{LayoutGeometry, PROVISIONAL_TEXT_WIDTH};
use crate::core::measure::TextMeasurer;
use crate::core::scene::Scene;
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct SceneModel {
    state: GradeState,
    measured_text_width: f32,
    /// Display grade the measured width belongs to
    measured_for: Option<String>,
    mounted: bool,
}

impl SceneModel {
    pub fn new() -> Self {
        Self {
            state: GradeState::new(),
            measured_text_width: PROVISIONAL_TEXT_WIDTH,
            measured_for: None,
            mounted: false,
        }
    }

    pub fn state(&self) -> &GradeState {
        &self.state
    }

    pub fn set_grade(&mut self, input: &str) -> bool {
        self.state.set_grade(input)
    }

    pub fn set_max_grade(&mut self, input: &str) -> bool {
        self.state.set_max_grade(input)
    }

    pub fn set_export_scale(&mut self, input: &str) -> bool {
        self.state.set_export_scale(input)
    }

    pub fn display_grade(&self) -> String {
        self.state.display_grade()
    }

    /// Record that the scene has been drawn at least once. Measurement is
    /// skipped until then.
    pub fn mount(&mut self) {
        if !self.mounted {
            tracing::debug!("Scene mounted");
            self.mounted = true;
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn measured_text_width(&self) -> f32 {
        self.measured_text_width
    }

    /// True when the measured width matches the current grade
    pub fn is_settled(&self) -> bool {
        self.measured_for.as_deref() == Some(self.display_grade().as_str())
    }

    /// Geometry from the current measured width
    pub fn layout_geometry(&self) -> LayoutGeometry {
        LayoutGeometry::for_text_width(self.measured_text_width)
    }

    /// Lay the grade glyphs out and record their width
    pub fn measure(&mut self, measurer: &dyn TextMeasurer) -> Result<f32> {
        let display = self.display_grade();
        let width = measurer.measure_grade(&display)?;
        self.measured_text_width = width;
        self.measured_for = Some(display);
        Ok(width)
    }

    /// Remeasure if mounted and stale. Returns whether the geometry changed.
    pub fn settle(&mut self, measurer: &dyn TextMeasurer) -> Result<bool> {
        if !self.mounted || self.is_settled() {
            return Ok(false);
        }

        let before = self.measured_text_width;
        let after = self.measure(measurer)?;
        Ok(before != after)
    }

    /// Settle, then return the final geometry
    pub fn final_layout(&mut self, measurer: &dyn TextMeasurer) -> Result<LayoutGeometry> {
        self.settle(measurer)?;
        Ok(self.layout_geometry())
    }

    /// Scene for the current state and geometry
    pub fn scene(&self) -> Scene {
        Scene::compose(&self.state, &self.layout_geometry())
    }
}

impl Default for SceneModel {
    fn default() -> Self {
        Self::new()
    }
}
