//! Raster surface the cropped scene is drawn into.
//!
//! Wraps a tiny-skia pixmap with a current transform, so callers can size
//! the surface in physical pixels and then draw in display-pixel units.

use crate::export::error::ExportError;
use crate::export::platform::PngImage;
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg;

/// Pixel size of a surface holding `width`x`height` user units at `scale`
/// and `device_pixel_factor`
pub fn surface_dimensions(
    width: f32,
    height: f32,
    scale: f32,
    device_pixel_factor: f32,
) -> (u32, u32) {
    let w = (width * scale * device_pixel_factor).ceil();
    let h = (height * scale * device_pixel_factor).ceil();
    (w.max(0.0) as u32, h.max(0.0) as u32)
}

pub struct RasterSurface {
    pixmap: Pixmap,
    transform: Transform,
    high_quality: bool,
}

impl RasterSurface {
    /// Allocate a transparent surface of `width`x`height` physical pixels.
    /// Returns `None` for zero or unrepresentable sizes.
    pub fn allocate(width: u32, height: u32) -> Option<Self> {
        let mut pixmap = Pixmap::new(width, height)?;
        pixmap.fill(Color::TRANSPARENT);
        Some(Self {
            pixmap,
            transform: Transform::identity(),
            high_quality: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Request anti-aliased, high-quality rendering for everything drawn next
    pub fn enable_high_quality_smoothing(&mut self) {
        self.high_quality = true;
    }

    pub fn high_quality(&self) -> bool {
        self.high_quality
    }

    /// Scale subsequent drawing
    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.transform = self.transform.pre_scale(sx, sy);
    }

    /// Draw `image` into the rectangle `(x, y, width, height)` of the
    /// current coordinate space, stretching its intrinsic size to fit
    pub fn draw_image(&mut self, image: &usvg::Tree, x: f32, y: f32, width: f32, height: f32) {
        let size = image.size();
        let transform = self
            .transform
            .pre_translate(x, y)
            .pre_scale(width / size.width(), height / size.height());
        resvg::render(image, transform, &mut self.pixmap.as_mut());
    }

    /// Lossless PNG of the surface contents
    pub fn encode_png(&self) -> Result<PngImage, ExportError> {
        let bytes = self
            .pixmap
            .encode_png()
            .map_err(|e| ExportError::Encode(e.to_string()))?;
        Ok(PngImage {
            width: self.pixmap.width(),
            height: self.pixmap.height(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_dimensions_round_up() {
        assert_eq!(surface_dimensions(100.0, 50.0, 1.0, 2.0), (200, 100));
        assert_eq!(surface_dimensions(100.2, 50.1, 1.0, 2.0), (201, 101));
        assert_eq!(surface_dimensions(10.0, 10.0, 1.5, 3.0), (45, 45));
    }

    #[test]
    fn test_allocate_rejects_empty() {
        assert!(RasterSurface::allocate(0, 10).is_none());
        assert!(RasterSurface::allocate(10, 0).is_none());
        assert!(RasterSurface::allocate(4, 3).is_some());
    }

    #[test]
    fn test_scale_composes() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1">
            <rect x="0" y="0" width="1" height="1" fill="#00FF00"/></svg>"##;
        let tree = usvg::Tree::from_str(svg, &usvg::Options::default()).unwrap();

        let mut surface = RasterSurface::allocate(6, 6).unwrap();
        surface.scale(2.0, 2.0);
        surface.scale(1.5, 1.5);
        surface.draw_image(&tree, 0.0, 0.0, 1.0, 1.0);

        let decoded = Pixmap::decode_png(&surface.encode_png().unwrap().bytes).unwrap();
        assert_eq!(decoded.pixel(2, 2).unwrap().alpha(), 255);
        assert_eq!(decoded.pixel(3, 3).unwrap().alpha(), 0);
    }

    #[test]
    fn test_draw_image_fills_target_rect() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
            <rect x="0" y="0" width="10" height="10" fill="#0000FF"/></svg>"##;
        let tree = usvg::Tree::from_str(svg, &usvg::Options::default()).unwrap();

        let mut surface = RasterSurface::allocate(8, 8).unwrap();
        surface.scale(2.0, 2.0);
        surface.draw_image(&tree, 0.0, 0.0, 2.0, 2.0);

        let png = surface.encode_png().unwrap();
        assert_eq!((png.width, png.height), (8, 8));

        let decoded = Pixmap::decode_png(&png.bytes).unwrap();
        let inside = decoded.pixel(1, 1).unwrap();
        let outside = decoded.pixel(6, 6).unwrap();
        assert_eq!(inside.blue(), 255);
        assert_eq!(inside.alpha(), 255);
        assert_eq!(outside.alpha(), 0);
    }
}
