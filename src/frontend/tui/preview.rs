//! Live preview of the stamp drawn with half-block characters.
//!
//! Each terminal cell shows two vertically stacked pixels: the upper one as
//! the foreground of '▀', the lower one as the background. The scene is
//! rasterized on a white page and fitted into the widget area.

use crate::core::scene::Scene;
use crate::fonts;
use anyhow::{Context, Result};
use ratatui::{buffer::Buffer, layout::Rect, style::Color};
use resvg::tiny_skia::{self, Pixmap, Transform};
use resvg::usvg::{self, fontdb};
use std::sync::Arc;

const UPPER_HALF: &str = "▀";

struct CachedFrame {
    svg: String,
    width: u16,
    height: u16,
    /// Row-major, two pixel rows per cell row
    pixels: Vec<Color>,
}

#[derive(Default)]
pub struct StampPreview {
    cache: Option<CachedFrame>,
    rasterized: usize,
}

impl StampPreview {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the scene has actually been rasterized
    pub fn rasterized(&self) -> usize {
        self.rasterized
    }

    pub fn render(
        &mut self,
        scene: &Scene,
        fonts: &Arc<fontdb::Database>,
        area: Rect,
        buf: &mut Buffer,
    ) -> Result<()> {
        if area.width == 0 || area.height == 0 {
            return Ok(());
        }

        let svg = scene.to_svg()?;
        let fresh = matches!(
            &self.cache,
            Some(frame) if frame.svg == svg && frame.width == area.width && frame.height == area.height
        );
        if !fresh {
            let pixels = rasterize(&svg, fonts, area.width, area.height)?;
            self.rasterized += 1;
            self.cache = Some(CachedFrame {
                svg,
                width: area.width,
                height: area.height,
                pixels,
            });
        }

        let Some(frame) = &self.cache else {
            return Ok(());
        };
        let stride = frame.width as usize;
        for row in 0..area.height {
            for col in 0..area.width {
                let top = frame.pixels[(row as usize * 2) * stride + col as usize];
                let bottom = frame.pixels[(row as usize * 2 + 1) * stride + col as usize];
                buf[(area.x + col, area.y + row)]
                    .set_symbol(UPPER_HALF)
                    .set_fg(top)
                    .set_bg(bottom);
            }
        }
        Ok(())
    }
}

/// Draw `svg` fitted and centered on a white `cols`x`rows*2` pixmap
fn rasterize(
    svg: &str,
    fonts: &Arc<fontdb::Database>,
    cols: u16,
    rows: u16,
) -> Result<Vec<Color>> {
    let options = fonts::usvg_options(fonts, false);
    let tree = usvg::Tree::from_str(svg, &options).context("Failed to parse preview scene")?;

    let width = u32::from(cols);
    let height = u32::from(rows) * 2;
    let mut pixmap = Pixmap::new(width, height).context("Failed to allocate preview pixmap")?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let size = tree.size();
    let scale = (width as f32 / size.width()).min(height as f32 / size.height());
    let dx = (width as f32 - size.width() * scale) / 2.0;
    let dy = (height as f32 - size.height() * scale) / 2.0;
    resvg::render(
        &tree,
        Transform::from_row(scale, 0.0, 0.0, scale, dx, dy),
        &mut pixmap.as_mut(),
    );

    Ok(pixmap
        .pixels()
        .iter()
        .map(|p| {
            let c = p.demultiply();
            Color::Rgb(c.red(), c.green(), c.blue())
        })
        .collect())
}
