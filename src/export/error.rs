//! Errors raised while exporting the stamp

use thiserror::Error;

/// Shown when an export error carries no message of its own
pub const GENERIC_FAILURE: &str = "Copy failed";

#[derive(Error, Debug)]
pub enum ExportError {
    /// The scene has no visible geometry to crop to
    #[error("scene has no visible content")]
    EmptyScene,

    /// Serializing the cropped scene failed
    #[error("failed to serialize scene: {0}")]
    Serialize(String),

    /// The cropped document could not be parsed back
    #[error("failed to decode scene image: {0}")]
    Decode(String),

    /// PNG encoding failed
    #[error("failed to encode PNG: {0}")]
    Encode(String),

    /// The platform clipboard refused the image
    #[error("{}", .0.as_deref().unwrap_or(""))]
    Clipboard(Option<String>),

    /// A blocking export step panicked or was cancelled
    #[error("export task failed: {0}")]
    Task(String),
}

impl ExportError {
    /// Message for the user, including the underlying message when there is one
    pub fn user_message(&self) -> String {
        let detail = self.to_string();
        if detail.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            format!("{}: {}", GENERIC_FAILURE, detail)
        }
    }
}

impl From<tokio::task::JoinError> for ExportError {
    fn from(err: tokio::task::JoinError) -> Self {
        ExportError::Task(err.to_string())
    }
}
