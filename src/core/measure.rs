//! Grade text measurement.
//!
//! Glyph widths depend on font substitution and shaping, so they are read
//! back from an actual text layout instead of being computed from metrics.

use crate::core::layout::{GRADE_Y, LEFT_MARGIN};
use crate::core::scene::Scene;
use crate::fonts;
use anyhow::{Context, Result};
use resvg::usvg::{self, fontdb};
use std::sync::Arc;

/// Measures the rendered width of the grade glyph run
pub trait TextMeasurer {
    /// Width, in scene user units, of `display_grade` set in the grade font
    fn measure_grade(&self, display_grade: &str) -> Result<f32>;
}

/// Lays the grade text out with usvg and reads its bounding box
pub struct UsvgTextMeasurer {
    fonts: Arc<fontdb::Database>,
}

impl UsvgTextMeasurer {
    pub fn new(fonts: Arc<fontdb::Database>) -> Self {
        Self { fonts }
    }
}

impl TextMeasurer for UsvgTextMeasurer {
    fn measure_grade(&self, display_grade: &str) -> Result<f32> {
        if display_grade.is_empty() {
            return Ok(0.0);
        }

        let svg = Scene::grade_measurement(display_grade, LEFT_MARGIN, GRADE_Y).to_svg()?;
        let options = fonts::usvg_options(&self.fonts, true);
        let tree = usvg::Tree::from_str(&svg, &options)
            .context("Failed to lay out grade text for measuring")?;

        let root = tree.root();
        if !root.has_children() {
            tracing::warn!(
                "Grade text {:?} produced no glyphs (missing fonts?)",
                display_grade
            );
            return Ok(0.0);
        }

        let width = root.abs_bounding_box().width();
        tracing::debug!("Measured grade {:?}: {:.2} units", display_grade, width);
        Ok(width)
    }
}
