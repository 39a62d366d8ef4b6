//! Raster export of the stamp.
//!
//! The exporter crops the rendered scene to its content, rasterizes it at
//! `scale` times the device resolution (oversampled 2x), encodes a PNG and
//! hands it to the clipboard. Only one export runs at a time.

pub mod error;
pub mod platform;
pub mod surface;

pub use error::ExportError;
pub use platform::{PlatformServices, PngImage, SystemPlatform};

use crate::core::scene::{Scene, ViewBox};
use crate::fonts;
use resvg::usvg::{self, fontdb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use surface::{surface_dimensions, RasterSurface};

/// Total margin added around the content (half on each side), in user units
pub const EXPORT_MARGIN: f32 = 10.0;
/// Extra oversampling on top of the device pixel ratio
pub const OVERSAMPLE: f32 = 2.0;

/// Tight content box of a scene, in user units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Visible region covering the box plus `margin` split evenly on each side
    pub fn padded(&self, margin: f32) -> ViewBox {
        ViewBox::new(
            self.x - margin / 2.0,
            self.y - margin / 2.0,
            self.width + margin,
            self.height + margin,
        )
    }
}

/// A scene that has been laid out, so its content bounds are known
#[derive(Debug, Clone)]
pub struct RenderedScene {
    scene: Scene,
    bounding_box: Option<BoundingBox>,
}

impl RenderedScene {
    /// Lay the scene out with `fonts` and record its content bounds
    pub fn render(scene: Scene, fonts: &Arc<fontdb::Database>) -> Result<Self, ExportError> {
        let svg = scene
            .to_svg()
            .map_err(|e| ExportError::Serialize(e.to_string()))?;
        let tree = decode_image(svg.as_bytes(), fonts, true)?;

        let bounding_box = content_bounds(tree.root()).map(|(left, top, right, bottom)| {
            BoundingBox {
                x: left,
                y: top,
                width: right - left,
                height: bottom - top,
            }
        });

        Ok(Self {
            scene,
            bounding_box,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }
}

/// Why an export finished without producing an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No scene has been rendered yet
    NoScene,
    /// The raster surface could not be allocated
    NoSurface,
    /// Another export is still running
    Busy,
}

/// Size of the image that reached the clipboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportReport {
    Copied(ExportSummary),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RasterOutcome {
    Image(PngImage),
    Skipped(SkipReason),
}

/// Releases the single-flight flag when dropped
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct RasterExporter {
    platform: Arc<dyn PlatformServices>,
    fonts: Arc<fontdb::Database>,
    busy: Arc<AtomicBool>,
}

impl RasterExporter {
    pub fn new(platform: Arc<dyn PlatformServices>, fonts: Arc<fontdb::Database>) -> Self {
        Self {
            platform,
            fonts,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the single-flight slot
    pub fn try_begin(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                flag: Arc::clone(&self.busy),
            })
    }

    /// Physical pixels per display pixel, including oversampling
    pub fn device_pixel_factor(&self) -> f32 {
        let ratio = self.platform.device_pixel_ratio();
        let ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            1.0
        };
        ratio * OVERSAMPLE
    }

    /// Crop, rasterize and copy the scene to the clipboard
    pub async fn export_to_clipboard(
        &self,
        scene: Option<&RenderedScene>,
        scale: f32,
    ) -> Result<ExportReport, ExportError> {
        let Some(scene) = scene else {
            tracing::debug!("Export requested before the scene was rendered");
            return Ok(ExportReport::Skipped(SkipReason::NoScene));
        };
        let Some(_busy) = self.try_begin() else {
            tracing::debug!("Export already running, ignoring request");
            return Ok(ExportReport::Skipped(SkipReason::Busy));
        };

        let image = match self.rasterize_scene(scene, scale).await? {
            RasterOutcome::Image(image) => image,
            RasterOutcome::Skipped(reason) => return Ok(ExportReport::Skipped(reason)),
        };

        let summary = ExportSummary {
            width: image.width,
            height: image.height,
            bytes: image.bytes.len(),
        };
        let platform = Arc::clone(&self.platform);
        tokio::task::spawn_blocking(move || platform.write_image_to_clipboard(&image)).await??;

        tracing::info!(
            "Copied {}x{} stamp to clipboard ({} bytes)",
            summary.width,
            summary.height,
            summary.bytes
        );
        Ok(ExportReport::Copied(summary))
    }

    /// Crop and rasterize the scene without touching the clipboard
    pub async fn rasterize(
        &self,
        scene: Option<&RenderedScene>,
        scale: f32,
    ) -> Result<RasterOutcome, ExportError> {
        let Some(scene) = scene else {
            return Ok(RasterOutcome::Skipped(SkipReason::NoScene));
        };
        let Some(_busy) = self.try_begin() else {
            return Ok(RasterOutcome::Skipped(SkipReason::Busy));
        };
        self.rasterize_scene(scene, scale).await
    }

    async fn rasterize_scene(
        &self,
        scene: &RenderedScene,
        scale: f32,
    ) -> Result<RasterOutcome, ExportError> {
        let bbox = scene.bounding_box().ok_or(ExportError::EmptyScene)?;
        let view_box = bbox.padded(EXPORT_MARGIN);
        tracing::debug!("Export bbox {:?}, cropped view box {}", bbox, view_box);

        let cropped = scene.scene().with_view_box(view_box);
        let document = cropped
            .to_svg()
            .map_err(|e| ExportError::Serialize(e.to_string()))?;
        let resource = self.platform.create_temporary_resource(&document)?;

        let factor = self.device_pixel_factor();
        let (width, height) = surface_dimensions(view_box.width, view_box.height, scale, factor);
        let Some(mut surface) = RasterSurface::allocate(width, height) else {
            tracing::debug!("Could not allocate {}x{} surface, aborting export", width, height);
            return Ok(RasterOutcome::Skipped(SkipReason::NoSurface));
        };
        tracing::debug!(
            "Allocated {}x{} surface at factor {}",
            surface.width(),
            surface.height(),
            factor
        );
        surface.enable_high_quality_smoothing();
        surface.scale(factor, factor);

        let bytes = resource.bytes();
        let fonts = Arc::clone(&self.fonts);
        let high_quality = surface.high_quality();
        let decoded =
            tokio::task::spawn_blocking(move || decode_image(&bytes, &fonts, high_quality)).await;
        tracing::debug!("Decoded {}", resource.url());
        drop(resource);
        let image = decoded??;

        surface.draw_image(
            &image,
            0.0,
            0.0,
            view_box.width * scale,
            view_box.height * scale,
        );

        Ok(RasterOutcome::Image(surface.encode_png()?))
    }
}

/// Union of the drawn leaves under `group` as (left, top, right, bottom).
/// Groups and glyph runs that produced no geometry report an empty rect at
/// the origin and are skipped.
fn content_bounds(group: &usvg::Group) -> Option<(f32, f32, f32, f32)> {
    let mut bounds: Option<(f32, f32, f32, f32)> = None;
    for node in group.children() {
        let rect = match node {
            usvg::Node::Group(child) => content_bounds(child),
            leaf => {
                let r = leaf.abs_bounding_box();
                (r.width() > 0.0 || r.height() > 0.0)
                    .then(|| (r.left(), r.top(), r.right(), r.bottom()))
            }
        };
        if let Some((l, t, r, b)) = rect {
            bounds = Some(match bounds {
                Some((bl, bt, br, bb)) => (bl.min(l), bt.min(t), br.max(r), bb.max(b)),
                None => (l, t, r, b),
            });
        }
    }
    bounds
}

/// Parse a serialized scene into a drawable tree
fn decode_image(
    bytes: &[u8],
    fonts: &Arc<fontdb::Database>,
    high_quality: bool,
) -> Result<usvg::Tree, ExportError> {
    let options = fonts::usvg_options(fonts, high_quality);
    usvg::Tree::from_data(bytes, &options).map_err(|e| ExportError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FontConfig;
    use crate::core::scene_model::SceneModel;
    use platform::{ResourceRegistry, TemporaryResource};
    use std::sync::Mutex;

    struct FakePlatform {
        resources: ResourceRegistry,
        ratio: f32,
        fail_with: Mutex<Option<Option<String>>>,
        written: Mutex<Vec<PngImage>>,
        live_at_write: Mutex<Vec<usize>>,
    }

    impl FakePlatform {
        fn new(ratio: f32) -> Arc<Self> {
            Arc::new(Self {
                resources: ResourceRegistry::new(),
                ratio,
                fail_with: Mutex::new(None),
                written: Mutex::new(Vec::new()),
                live_at_write: Mutex::new(Vec::new()),
            })
        }

        fn fail_next(&self, message: Option<&str>) {
            *self.fail_with.lock().unwrap() = Some(message.map(str::to_string));
        }
    }

    impl PlatformServices for FakePlatform {
        fn create_temporary_resource(
            &self,
            document: &str,
        ) -> Result<TemporaryResource, ExportError> {
            Ok(self.resources.register(document.as_bytes()))
        }

        fn write_image_to_clipboard(&self, image: &PngImage) -> Result<(), ExportError> {
            self.live_at_write
                .lock()
                .unwrap()
                .push(self.resources.live_count());
            if let Some(message) = self.fail_with.lock().unwrap().take() {
                return Err(ExportError::Clipboard(message));
            }
            self.written.lock().unwrap().push(image.clone());
            Ok(())
        }

        fn device_pixel_ratio(&self) -> f32 {
            self.ratio
        }
    }

    fn no_fonts() -> Arc<fontdb::Database> {
        fonts::load_fonts(&FontConfig {
            load_system_fonts: false,
            font_dirs: Vec::new(),
            sans_serif_family: None,
        })
    }

    /// Default stamp; without fonts only the underline has geometry
    fn rendered_default() -> RenderedScene {
        RenderedScene::render(SceneModel::new().scene(), &no_fonts()).unwrap()
    }

    fn exporter(platform: &Arc<FakePlatform>) -> RasterExporter {
        let services: Arc<dyn PlatformServices> = platform.clone();
        RasterExporter::new(services, no_fonts())
    }

    #[test]
    fn test_padded_view_box() {
        let bbox = BoundingBox {
            x: 20.0,
            y: 30.0,
            width: 100.0,
            height: 40.0,
        };
        assert_eq!(bbox.padded(10.0), ViewBox::new(15.0, 25.0, 110.0, 50.0));
    }

    #[test]
    fn test_rendered_bounding_box_follows_underline() {
        let bbox = rendered_default().bounding_box().expect("underline has bounds");
        assert!(bbox.x > 29.0 && bbox.x < 31.0, "x = {}", bbox.x);
        assert!(bbox.width > 90.0 && bbox.width < 100.0, "width = {}", bbox.width);
        assert!(bbox.height > 5.0 && bbox.height < 20.0, "height = {}", bbox.height);
    }

    #[test]
    fn test_empty_grade_crops_to_underline() {
        let mut model = SceneModel::new();
        assert!(model.set_grade(""));
        let scene = RenderedScene::render(model.scene(), &no_fonts()).unwrap();

        let bbox = scene.bounding_box().expect("underline has bounds");
        assert!(bbox.x > 29.0 && bbox.x < 31.0, "x = {}", bbox.x);
        assert!(bbox.y > 70.0, "y = {}", bbox.y);
    }

    #[test]
    fn test_bounding_box_includes_text_with_system_fonts() {
        let fonts = fonts::load_fonts(&FontConfig {
            load_system_fonts: true,
            font_dirs: Vec::new(),
            sans_serif_family: None,
        });
        if fonts.is_empty() {
            return;
        }

        let scene = RenderedScene::render(SceneModel::new().scene(), &fonts).unwrap();
        let bbox = scene.bounding_box().unwrap();
        // Rotated grade glyphs reach above and left of the baseline origin
        assert!(bbox.x < 30.0, "x = {}", bbox.x);
        assert!(bbox.y < 30.0, "y = {}", bbox.y);
        // Max grade label sits below the underline
        assert!(bbox.y + bbox.height > 100.0, "bottom = {}", bbox.y + bbox.height);
    }

    #[tokio::test]
    async fn test_exported_png_keeps_margin_on_every_edge() {
        let platform = FakePlatform::new(1.0);
        let scene = rendered_default();

        let outcome = exporter(&platform)
            .rasterize(Some(&scene), 1.0)
            .await
            .unwrap();
        let RasterOutcome::Image(image) = outcome else {
            panic!("expected an image");
        };

        let pixmap = resvg::tiny_skia::Pixmap::decode_png(&image.bytes).unwrap();
        let (w, h) = (pixmap.width(), pixmap.height());
        let mut ink: Option<(u32, u32, u32, u32)> = None;
        for y in 0..h {
            for x in 0..w {
                if pixmap.pixel(x, y).unwrap().alpha() < 128 {
                    continue;
                }
                ink = Some(match ink {
                    Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
                    None => (x, y, x, y),
                });
            }
        }
        let (left, top, right, bottom) = ink.expect("underline is drawn");

        // 5 user units of margin at factor 2, less up to 1.5 units of stroke
        let margins = [left, top, w - 1 - right, h - 1 - bottom];
        for margin in margins {
            assert!((3..=13).contains(&margin), "margins {:?} in {}x{}", margins, w, h);
        }
    }

    #[test]
    fn test_device_pixel_factor_sanitizes_ratio() {
        assert_eq!(exporter(&FakePlatform::new(1.5)).device_pixel_factor(), 3.0);
        assert_eq!(exporter(&FakePlatform::new(0.0)).device_pixel_factor(), 2.0);
        assert_eq!(exporter(&FakePlatform::new(f32::NAN)).device_pixel_factor(), 2.0);
    }

    #[tokio::test]
    async fn test_export_dimensions_at_unit_scale() {
        let platform = FakePlatform::new(1.0);
        let scene = rendered_default();
        let bbox = scene.bounding_box().unwrap();

        let report = exporter(&platform)
            .export_to_clipboard(Some(&scene), 1.0)
            .await
            .unwrap();

        let expected = (
            ((bbox.width + 10.0) * 2.0).ceil() as u32,
            ((bbox.height + 10.0) * 2.0).ceil() as u32,
        );
        match report {
            ExportReport::Copied(summary) => {
                assert_eq!((summary.width, summary.height), expected);
            }
            other => panic!("unexpected report {:?}", other),
        }

        let written = platform.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!((written[0].width, written[0].height), expected);
        assert!(written[0].bytes.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_export_dimensions_follow_scale_and_ratio() {
        let platform = FakePlatform::new(2.0);
        let scene = rendered_default();
        let bbox = scene.bounding_box().unwrap();

        let outcome = exporter(&platform)
            .rasterize(Some(&scene), 1.5)
            .await
            .unwrap();

        let RasterOutcome::Image(image) = outcome else {
            panic!("expected an image");
        };
        assert_eq!(
            (image.width, image.height),
            surface_dimensions(bbox.width + 10.0, bbox.height + 10.0, 1.5, 4.0)
        );
        assert!(platform.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_without_scene_is_a_no_op() {
        let platform = FakePlatform::new(1.0);
        let report = exporter(&platform)
            .export_to_clipboard(None, 1.0)
            .await
            .unwrap();

        assert_eq!(report, ExportReport::Skipped(SkipReason::NoScene));
        assert!(platform.written.lock().unwrap().is_empty());
        assert!(platform.live_at_write.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resource_released_before_clipboard_write() {
        let platform = FakePlatform::new(1.0);
        let scene = rendered_default();

        exporter(&platform)
            .export_to_clipboard(Some(&scene), 1.0)
            .await
            .unwrap();

        assert_eq!(*platform.live_at_write.lock().unwrap(), vec![0]);
        assert_eq!(platform.resources.live_count(), 0);
    }

    #[tokio::test]
    async fn test_clipboard_failure_is_reported_and_recoverable() {
        let platform = FakePlatform::new(1.0);
        let exporter = exporter(&platform);
        let scene = rendered_default();

        platform.fail_next(Some("clipboard permission denied"));
        let err = exporter
            .export_to_clipboard(Some(&scene), 1.0)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Copy failed: clipboard permission denied");
        assert_eq!(platform.resources.live_count(), 0);
        assert!(!exporter.is_busy());

        let report = exporter
            .export_to_clipboard(Some(&scene), 1.0)
            .await
            .unwrap();
        assert!(matches!(report, ExportReport::Copied(_)));
    }

    #[tokio::test]
    async fn test_clipboard_failure_without_message_is_generic() {
        let platform = FakePlatform::new(1.0);
        let scene = rendered_default();

        platform.fail_next(None);
        let err = exporter(&platform)
            .export_to_clipboard(Some(&scene), 1.0)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Copy failed");
    }

    #[tokio::test]
    async fn test_concurrent_export_is_rejected() {
        let platform = FakePlatform::new(1.0);
        let exporter = exporter(&platform);
        let scene = rendered_default();

        let guard = exporter.try_begin().expect("slot is free");
        let report = exporter
            .export_to_clipboard(Some(&scene), 1.0)
            .await
            .unwrap();
        assert_eq!(report, ExportReport::Skipped(SkipReason::Busy));

        drop(guard);
        let report = exporter
            .export_to_clipboard(Some(&scene), 1.0)
            .await
            .unwrap();
        assert!(matches!(report, ExportReport::Copied(_)));
    }

    #[tokio::test]
    async fn test_unallocatable_surface_aborts_silently() {
        let platform = FakePlatform::new(1.0);
        let scene = rendered_default();

        let report = exporter(&platform)
            .export_to_clipboard(Some(&scene), 1.0e9)
            .await
            .unwrap();

        assert_eq!(report, ExportReport::Skipped(SkipReason::NoSurface));
        assert_eq!(platform.resources.live_count(), 0);
        assert!(platform.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_scene_is_an_error() {
        let platform = FakePlatform::new(1.0);
        // Text only, and no fonts to draw it with
        let measurement = Scene::grade_measurement("15", 30.0, 70.0);
        let scene = RenderedScene::render(measurement, &no_fonts()).unwrap();
        assert!(scene.bounding_box().is_none());

        let err = exporter(&platform)
            .export_to_clipboard(Some(&scene), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::EmptyScene));
        assert_eq!(err.user_message(), "Copy failed: scene has no visible content");
    }
}
