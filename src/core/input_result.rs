//! Unified enum describing what should happen after the form handles input.
//!
//! The form widget never mutates grade state itself; it reports edits and
//! actions here and `AppCore` applies them.

/// Editable form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Grade,
    MaxGrade,
    ExportScale,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Grade => "Grade",
            Field::MaxGrade => "Max grade",
            Field::ExportScale => "Export scale",
        }
    }
}

/// Result of handling a key in the form
#[derive(Debug, Clone, PartialEq)]
pub enum InputResult {
    /// Nothing for the core to do
    Continue,

    /// A field's text changed; the core validates it
    Edit { field: Field, value: String },

    /// Copy the stamp to the clipboard
    Export,

    /// Leave the application
    Quit,
}

impl InputResult {
    /// Check if this result ends the session
    pub fn is_closing(&self) -> bool {
        matches!(self, InputResult::Quit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_closing() {
        assert!(InputResult::Quit.is_closing());
        assert!(!InputResult::Export.is_closing());
        assert!(!InputResult::Edit {
            field: Field::Grade,
            value: "12".to_string()
        }
        .is_closing());
    }

    #[test]
    fn test_field_labels() {
        assert_eq!(Field::Grade.label(), "Grade");
        assert_eq!(Field::MaxGrade.label(), "Max grade");
        assert_eq!(Field::ExportScale.label(), "Export scale");
    }
}
