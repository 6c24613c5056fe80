//! Texture loading and management

use crate::backend::traits::*;
use crate::backend::types::*;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Loaded texture data
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Load texture from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let img = image::open(path).map_err(|e| e.to_string())?;
        Self::from_image(img, &name)
    }

    /// Load texture from bytes
    pub fn from_bytes(bytes: &[u8], name: &str) -> Result<Self, String> {
        let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
        Self::from_image(img, name)
    }

    fn from_image(img: image::DynamicImage, name: &str) -> Result<Self, String> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
            data: rgba.into_raw(),
            name: name.to_string(),
        })
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8UnormSrgb,
            data: color.to_vec(),
            name: name.to_string(),
        }
    }

    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], "white")
    }

    /// Create a checkerboard texture
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                let color = if is_even { color1 } else { color2 };
                data.extend_from_slice(&color);
            }
        }

        Self {
            width: size,
            height: size,
            format: TextureFormat::Rgba8UnormSrgb,
            data,
            name: "checkerboard".to_string(),
        }
    }
}

/// Handoff slot between a decode worker and the render thread.
///
/// The worker deposits decoded pixels; the render thread polls once per
/// frame and finishes the GPU upload when data arrives. A texture whose
/// slot is still empty is simply not ready yet.
#[derive(Default)]
pub struct PixelHandoff {
    pixels: Mutex<Option<Vec<u8>>>,
}

impl PixelHandoff {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Called from the worker once decoding completes.
    pub fn deposit(&self, pixels: Vec<u8>) {
        *self.pixels.lock() = Some(pixels);
    }

    /// Takes the decoded pixels if the worker has finished.
    pub fn take(&self) -> Option<Vec<u8>> {
        self.pixels.lock().take()
    }
}

/// GPU texture with associated view and a load-completion flag.
///
/// A texture created by [`GpuTexture::pending`] reports not-ready until a
/// worker finishes decoding and calls [`GpuTexture::finish_upload`]; a
/// drawable referencing it is skipped for the frame and retried once the
/// flag flips.
pub struct GpuTexture {
    pub handle: TextureHandle,
    pub view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub name: String,
    ready: Arc<AtomicBool>,
}

impl GpuTexture {
    /// Create and upload texture to GPU in one step.
    pub fn create(backend: &mut dyn GraphicsBackend, data: &TextureData) -> BackendResult<Self> {
        let mut texture = Self::pending(backend, data.width, data.height, data.format, &data.name)?;
        texture.finish_upload(backend, &data.data);
        Ok(texture)
    }

    /// Allocate the GPU resource without contents; `ready` stays false.
    pub fn pending(
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
        format: TextureFormat,
        name: &str,
    ) -> BackendResult<Self> {
        let handle = backend.create_texture(&TextureDescriptor {
            label: Some(name.to_string()),
            width,
            height,
            array_layers: 1,
            mip_levels: 1,
            format,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        })?;

        let view = backend.create_texture_view(handle, &TextureViewDescriptor::default())?;

        Ok(Self {
            handle,
            view,
            width,
            height,
            format,
            name: name.to_string(),
            ready: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Upload contents and mark the texture usable.
    pub fn finish_upload(&mut self, backend: &mut dyn GraphicsBackend, data: &[u8]) {
        backend.write_texture(self.handle, data, self.width, self.height);
        self.ready.store(true, Ordering::Release);
    }

    /// Poll a handoff slot; uploads and flips `ready` once the worker has
    /// deposited pixels. Returns true when the texture became usable.
    pub fn poll_upload(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        handoff: &PixelHandoff,
    ) -> bool {
        if self.ready() {
            return true;
        }
        match handoff.take() {
            Some(pixels) => {
                self.finish_upload(backend, &pixels);
                true
            }
            None => false,
        }
    }

    pub fn ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Shared flag handle for worker-side completion signalling.
    pub fn ready_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    #[test]
    fn pending_texture_reports_ready_only_after_upload() {
        let mut backend = HeadlessBackend::new(64, 64);
        let mut texture = GpuTexture::pending(
            &mut backend,
            2,
            2,
            TextureFormat::Rgba8UnormSrgb,
            "late",
        )
        .unwrap();
        assert!(!texture.ready());

        let handoff = PixelHandoff::new();
        assert!(!texture.poll_upload(&mut backend, &handoff));

        handoff.deposit(vec![255u8; 16]);
        assert!(texture.poll_upload(&mut backend, &handoff));
        assert!(texture.ready());
    }

    #[test]
    fn checkerboard_has_expected_size() {
        let data = TextureData::checkerboard(32, [255, 0, 0, 255], [0, 0, 255, 255]);
        assert_eq!(data.data.len(), 32 * 32 * 4);
    }
}
