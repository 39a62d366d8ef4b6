//! Platform capabilities the exporter depends on.
//!
//! The exporter never reaches for the clipboard or display settings
//! directly; it receives a `PlatformServices` implementation so tests can
//! substitute a fake.

use crate::clipboard;
use crate::export::error::ExportError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Encoded PNG plus its pixel dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct PngImage {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Services the exporter needs from its environment
pub trait PlatformServices: Send + Sync {
    /// Register `document` as a loadable resource. The resource is released
    /// when the returned handle is dropped.
    fn create_temporary_resource(&self, document: &str) -> Result<TemporaryResource, ExportError>;

    /// Put a PNG image on the system clipboard
    fn write_image_to_clipboard(&self, image: &PngImage) -> Result<(), ExportError>;

    /// Physical pixels per display pixel
    fn device_pixel_ratio(&self) -> f32;
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, Arc<[u8]>>>,
}

/// In-process store for temporary resources, addressed by `blob:` style URLs
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    inner: Arc<RegistryInner>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, bytes: &[u8]) -> TemporaryResource {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let data: Arc<[u8]> = Arc::from(bytes);
        if let Ok(mut live) = self.inner.live.lock() {
            live.insert(id, Arc::clone(&data));
        }
        tracing::debug!("Created temporary resource {} ({} bytes)", id, data.len());

        TemporaryResource {
            id,
            data,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Number of resources not yet released
    #[cfg(test)]
    pub fn live_count(&self) -> usize {
        self.inner.live.lock().map(|live| live.len()).unwrap_or(0)
    }
}

const URL_PREFIX: &str = "blob:grade-stamp/";

/// Handle to a registered resource; dropping it releases the resource
pub struct TemporaryResource {
    id: u64,
    data: Arc<[u8]>,
    registry: Arc<RegistryInner>,
}

impl TemporaryResource {
    pub fn url(&self) -> String {
        format!("{}{}", URL_PREFIX, self.id)
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }
}

impl Drop for TemporaryResource {
    fn drop(&mut self) {
        if let Ok(mut live) = self.registry.live.lock() {
            live.remove(&self.id);
        }
        tracing::debug!("Released temporary resource {}", self.id);
    }
}

/// Real platform: arboard clipboard and the configured pixel ratio
pub struct SystemPlatform {
    resources: ResourceRegistry,
    clipboard: clipboard::ImageClipboard,
    device_pixel_ratio: f32,
}

impl SystemPlatform {
    pub fn new(device_pixel_ratio: f32) -> Self {
        Self {
            resources: ResourceRegistry::new(),
            clipboard: clipboard::ImageClipboard::new(),
            device_pixel_ratio,
        }
    }

    /// Platform for one-shot command line exports: the clipboard copy blocks
    /// until another application owns the clipboard, so the image survives
    /// process exit on X11 and Wayland.
    pub fn headless(device_pixel_ratio: f32) -> Self {
        Self {
            resources: ResourceRegistry::new(),
            clipboard: clipboard::ImageClipboard::waiting(),
            device_pixel_ratio,
        }
    }

    pub fn clipboard_blocks(&self) -> bool {
        self.clipboard.blocks_on_copy()
    }
}

impl PlatformServices for SystemPlatform {
    fn create_temporary_resource(&self, document: &str) -> Result<TemporaryResource, ExportError> {
        Ok(self.resources.register(document.as_bytes()))
    }

    fn write_image_to_clipboard(&self, image: &PngImage) -> Result<(), ExportError> {
        self.clipboard
            .copy_png(&image.bytes)
            .map_err(|e| ExportError::Clipboard(Some(e.to_string())))
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }
}
