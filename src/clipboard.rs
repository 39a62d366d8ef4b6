//! Clipboard integration for image export
//!
//! Uses arboard for cross-platform clipboard access

use anyhow::{Context, Result};
use arboard::{Clipboard, ImageData};
use resvg::tiny_skia::Pixmap;
use std::borrow::Cow;
use std::sync::Mutex;

/// Whether `ImageClipboard::waiting` blocks until the copy is replaced.
/// Only X11 and Wayland serve clipboard contents from the copying process.
pub const WAITS_FOR_OWNERSHIP: bool = cfg!(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
));

/// Clipboard handle kept alive for the whole process.
///
/// On X11 and Wayland the copied image is served by this process, so the
/// `Clipboard` must outlive the copy call.
pub struct ImageClipboard {
    inner: Mutex<Option<Clipboard>>,
    wait: bool,
}

impl ImageClipboard {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
            wait: false,
        }
    }

    /// Clipboard for short-lived processes: each copy keeps serving the
    /// image until another application takes the clipboard over.
    pub fn waiting() -> Self {
        Self {
            inner: Mutex::new(None),
            wait: true,
        }
    }

    /// True when a copy blocks until the clipboard is taken over
    pub fn blocks_on_copy(&self) -> bool {
        self.wait && WAITS_FOR_OWNERSHIP
    }

    /// Copy PNG bytes to the system clipboard as an image
    pub fn copy_png(&self, png: &[u8]) -> Result<()> {
        let image = png_to_image_data(png)?;
        let (width, height) = (image.width, image.height);

        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("clipboard lock poisoned"))?;
        if guard.is_none() {
            *guard = Some(Clipboard::new()?);
        }
        let clipboard = guard.as_mut().context("clipboard unavailable")?;
        if self.blocks_on_copy() {
            tracing::debug!("Serving {}x{} image until the clipboard changes owner", width, height);
        }
        set_image(clipboard, image, self.wait)?;

        tracing::debug!("Copied {}x{} image to clipboard", width, height);
        Ok(())
    }
}

#[cfg(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
))]
fn set_image(clipboard: &mut Clipboard, image: ImageData<'_>, wait: bool) -> Result<()> {
    use arboard::SetExtLinux;

    if wait {
        clipboard.set().wait().image(image)?;
    } else {
        clipboard.set_image(image)?;
    }
    Ok(())
}

#[cfg(not(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
)))]
fn set_image(clipboard: &mut Clipboard, image: ImageData<'_>, _wait: bool) -> Result<()> {
    clipboard.set_image(image)?;
    Ok(())
}

impl Default for ImageClipboard {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a PNG into the straight-alpha RGBA buffer arboard expects
pub fn png_to_image_data(png: &[u8]) -> Result<ImageData<'static>> {
    let pixmap = Pixmap::decode_png(png).context("Failed to decode PNG for clipboard")?;

    let mut bytes = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        bytes.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }

    Ok(ImageData {
        width: pixmap.width() as usize,
        height: pixmap.height() as usize,
        bytes: Cow::Owned(bytes),
    })
}
