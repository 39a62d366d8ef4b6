//! Validated grade inputs.
//!
//! The three user-editable values are kept as strings so a half-typed value
//! (an empty field, a trailing separator) survives between keystrokes. Every
//! mutation goes through a setter that either accepts the whole edit or
//! leaves the previous value untouched.

/// Highest grade the stamp accepts
pub const MAX_GRADE_VALUE: f64 = 20.0;

/// Current grade, maximum and export scale
#[derive(Debug, Clone, PartialEq)]
pub struct GradeState {
    grade: String,
    max_grade: String,
    export_scale: String,
}

impl GradeState {
    pub fn new() -> Self {
        Self {
            grade: "15".to_string(),
            max_grade: "20".to_string(),
            export_scale: "1".to_string(),
        }
    }

    /// Grade in normalized (dot) form
    pub fn grade(&self) -> &str {
        &self.grade
    }

    /// Max grade in normalized (dot) form
    pub fn max_grade(&self) -> &str {
        &self.max_grade
    }

    /// Export scale exactly as it was accepted
    pub fn export_scale(&self) -> &str {
        &self.export_scale
    }

    /// Numeric export scale. Only positive values are ever accepted.
    pub fn export_scale_value(&self) -> f32 {
        parse_decimal(&self.export_scale)
            .map(|v| v as f32)
            .unwrap_or(1.0)
    }

    /// Set the grade. Returns false (and keeps the old value) when the input
    /// is neither empty nor a number in [0, 20].
    pub fn set_grade(&mut self, input: &str) -> bool {
        let normalized = normalize_separator(input);
        let accepted = normalized.is_empty()
            || parse_decimal(&normalized)
                .map(|v| (0.0..=MAX_GRADE_VALUE).contains(&v))
                .unwrap_or(false);

        if accepted {
            self.grade = normalized;
        } else {
            tracing::debug!("Ignoring grade input {:?}", input);
        }
        accepted
    }

    /// Set the max grade. Accepts the empty string or any positive number.
    pub fn set_max_grade(&mut self, input: &str) -> bool {
        let normalized = normalize_separator(input);
        let accepted = normalized.is_empty() || is_positive(&normalized);

        if accepted {
            self.max_grade = normalized;
        } else {
            tracing::debug!("Ignoring max grade input {:?}", input);
        }
        accepted
    }

    /// Set the export scale. Accepts positive numbers only; no separator
    /// normalization is applied here. The value must stay finite as `f32`.
    pub fn set_export_scale(&mut self, input: &str) -> bool {
        let accepted = is_positive(input)
            && parse_decimal(input)
                .map(|v| (v as f32).is_finite())
                .unwrap_or(false);

        if accepted {
            self.export_scale = input.to_string();
        } else {
            tracing::debug!("Ignoring export scale input {:?}", input);
        }
        accepted
    }

    /// Grade as shown to the user (comma decimal separator)
    pub fn display_grade(&self) -> String {
        self.grade.replacen('.', ",", 1)
    }
}

impl Default for GradeState {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace the first comma with a dot
pub fn normalize_separator(input: &str) -> String {
    input.replacen(',', ".", 1)
}

/// Finite decimal value; `inf`, `infinity` and `NaN` spellings are rejected
fn parse_decimal(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_positive(value: &str) -> bool {
    parse_decimal(value).map(|v| v > 0.0).unwrap_or(false)
}
