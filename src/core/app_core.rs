use crate::config::Config;
use crate::core::input_result::{Field, InputResult};
use crate::core::measure::TextMeasurer;
use crate::core::scene_model::SceneModel;
use crate::export::{ExportError, ExportReport, RenderedScene, SkipReason};
use resvg::usvg::fontdb;
use std::sync::Arc;

/// Shown after a successful copy
pub const COPIED_MESSAGE: &str = "Image copied to clipboard!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// One-line notice shown to the user in place of a modal alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

/// Export work handed to the frontend loop
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub scene: RenderedScene,
    pub scale: f32,
}

/// Core application state (frontend-agnostic)
///
/// AppCore owns the scene model and everything the frontend needs to draw:
/// the status line, the running flag and the dirty flag. The raster export
/// itself runs outside; AppCore prepares the request and applies the result.
pub struct AppCore {
    /// Application configuration
    pub config: Config,

    /// Grade values and layout
    pub model: SceneModel,

    /// Application running flag
    pub running: bool,

    /// Redraw requested
    pub needs_render: bool,

    /// Latest notice for the status line
    pub status: Option<StatusMessage>,

    fonts: Arc<fontdb::Database>,
    measurer: Box<dyn TextMeasurer>,
}

impl AppCore {
    pub fn new(
        config: Config,
        fonts: Arc<fontdb::Database>,
        measurer: Box<dyn TextMeasurer>,
    ) -> Self {
        Self {
            config,
            model: SceneModel::new(),
            running: true,
            needs_render: true,
            status: None,
            fonts,
            measurer,
        }
    }

    pub fn fonts(&self) -> &Arc<fontdb::Database> {
        &self.fonts
    }

    /// Apply the result of form input. Returns an export request when the
    /// user asked for a copy and the scene is ready.
    pub fn handle_input(&mut self, result: InputResult) -> Option<ExportRequest> {
        match result {
            InputResult::Continue => None,
            InputResult::Edit { field, value } => {
                let accepted = match field {
                    Field::Grade => self.model.set_grade(&value),
                    Field::MaxGrade => self.model.set_max_grade(&value),
                    Field::ExportScale => self.model.set_export_scale(&value),
                };
                if accepted {
                    self.needs_render = true;
                }
                None
            }
            InputResult::Export => match self.prepare_export() {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!("Failed to prepare export: {}", e);
                    self.status = Some(StatusMessage::error(e.user_message()));
                    self.needs_render = true;
                    None
                }
            },
            InputResult::Quit => {
                self.running = false;
                None
            }
        }
    }

    /// Called after a frame has been drawn: the scene now counts as mounted
    /// and a stale grade measurement is refreshed.
    pub fn after_frame(&mut self) {
        self.model.mount();
        match self.model.settle(self.measurer.as_ref()) {
            Ok(true) => self.needs_render = true,
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to measure grade text: {:#}", e),
        }
    }

    /// Settle the layout and render the scene for export. Returns `None`
    /// when nothing has been mounted yet.
    pub fn prepare_export(&mut self) -> Result<Option<ExportRequest>, ExportError> {
        if !self.model.is_mounted() {
            tracing::debug!("Export requested before first render");
            return Ok(None);
        }

        match self.model.final_layout(self.measurer.as_ref()) {
            Ok(geometry) => tracing::debug!("Export layout text width {}", geometry.text_width),
            Err(e) => tracing::warn!("Exporting with stale text width: {:#}", e),
        }

        let scene = RenderedScene::render(self.model.scene(), &self.fonts)?;
        Ok(Some(ExportRequest {
            scene,
            scale: self.model.state().export_scale_value(),
        }))
    }

    /// Turn an export outcome into a status message
    pub fn apply_export_result(&mut self, result: Result<ExportReport, ExportError>) {
        let status = match result {
            Ok(ExportReport::Copied(_)) => Some(StatusMessage::info(COPIED_MESSAGE)),
            Ok(ExportReport::Skipped(SkipReason::Busy)) => {
                Some(StatusMessage::info("An export is already in progress"))
            }
            Ok(ExportReport::Skipped(reason)) => {
                tracing::debug!("Export skipped: {:?}", reason);
                None
            }
            Err(e) => {
                tracing::warn!("Export failed: {}", e);
                Some(StatusMessage::error(e.user_message()))
            }
        };

        if status.is_some() {
            self.status = status;
            self.needs_render = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FontConfig;
    use crate::export::ExportSummary;
    use anyhow::Result;

    struct CharWidth;

    impl TextMeasurer for CharWidth {
        fn measure_grade(&self, display_grade: &str) -> Result<f32> {
            Ok(display_grade.len() as f32 * 30.0)
        }
    }

    fn core() -> AppCore {
        let fonts = crate::fonts::load_fonts(&FontConfig {
            load_system_fonts: false,
            font_dirs: Vec::new(),
            sans_serif_family: None,
        });
        AppCore::new(Config::default(), fonts, Box::new(CharWidth))
    }

    fn edit(field: Field, value: &str) -> InputResult {
        InputResult::Edit {
            field,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_edits_go_through_setters() {
        let mut core = core();
        core.handle_input(edit(Field::Grade, "12,5"));
        core.handle_input(edit(Field::MaxGrade, "0"));
        core.handle_input(edit(Field::ExportScale, "3"));

        assert_eq!(core.model.state().grade(), "12.5");
        assert_eq!(core.model.state().max_grade(), "20");
        assert_eq!(core.model.state().export_scale(), "3");
    }

    #[test]
    fn test_after_frame_settles_layout() {
        let mut core = core();
        core.needs_render = false;
        core.after_frame();

        assert!(core.model.is_mounted());
        assert_eq!(core.model.measured_text_width(), 60.0);
        assert!(core.needs_render);

        core.needs_render = false;
        core.after_frame();
        assert!(!core.needs_render);
    }

    #[test]
    fn test_export_before_mount_is_silent() {
        let mut core = core();
        assert!(core.handle_input(InputResult::Export).is_none());
        assert!(core.status.is_none());
    }

    #[test]
    fn test_export_request_uses_settled_layout() {
        let mut core = core();
        core.after_frame();
        core.handle_input(edit(Field::Grade, "7"));
        core.handle_input(edit(Field::ExportScale, "2"));

        let request = core
            .handle_input(InputResult::Export)
            .expect("scene is mounted");
        assert_eq!(request.scale, 2.0);
        assert!(core.model.is_settled());
        assert_eq!(core.model.measured_text_width(), 30.0);
        assert!(request.scene.bounding_box().is_some());
    }

    #[test]
    fn test_quit_stops_running() {
        let mut core = core();
        core.handle_input(InputResult::Quit);
        assert!(!core.running);
    }

    #[test]
    fn test_export_results_become_status() {
        let mut core = core();

        core.apply_export_result(Ok(ExportReport::Copied(ExportSummary {
            width: 10,
            height: 10,
            bytes: 100,
        })));
        assert_eq!(core.status, Some(StatusMessage::info(COPIED_MESSAGE)));

        core.apply_export_result(Err(ExportError::Clipboard(Some(
            "not allowed".to_string(),
        ))));
        assert_eq!(
            core.status,
            Some(StatusMessage::error("Copy failed: not allowed"))
        );

        core.status = None;
        core.apply_export_result(Ok(ExportReport::Skipped(SkipReason::NoScene)));
        assert!(core.status.is_none());
    }
}
