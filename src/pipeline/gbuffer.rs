//! Geometry buffer: the multi-target texture set filled by the geometry
//! pass and sampled by the lighting and composition passes.
//!
//! Layout:
//! - `albedo` (Rgba8Unorm): base color
//! - `normal` (Rgba16Float): world-space normal `n*0.5+0.5`, w = specular intensity
//! - `depth`  (R32Float): NDC depth written as color, the sampled copy
//! - `extra`  (Rgba8Unorm): rgb = emissive, a = specular power / 256
//! - shared Depth24PlusStencil8 depth-stencil, also used by the light
//!   volume stencil passes and the forward pass

use crate::backend::traits::*;
use crate::backend::types::*;

pub const GBUFFER_ALBEDO_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
pub const GBUFFER_NORMAL_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
pub const GBUFFER_DEPTH_FORMAT: TextureFormat = TextureFormat::R32Float;
pub const GBUFFER_EXTRA_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
pub const GBUFFER_DEPTH_STENCIL_FORMAT: TextureFormat = TextureFormat::Depth24PlusStencil8;

struct Target {
    texture: TextureHandle,
    view: TextureViewHandle,
}

impl Target {
    fn create(
        backend: &mut dyn GraphicsBackend,
        label: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> BackendResult<Self> {
        let texture = backend.create_texture(&TextureDescriptor {
            label: Some(label.to_string()),
            width,
            height,
            array_layers: 1,
            mip_levels: 1,
            format,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        })?;
        let view = backend.create_texture_view(texture, &TextureViewDescriptor::default())?;
        Ok(Self { texture, view })
    }
}

/// Viewport-sized render target set, exclusively owned here.
/// Allocation failure is fatal at construction; resize releases and
/// recreates every target deterministically.
pub struct GeometryBuffer {
    albedo: Target,
    normal: Target,
    depth: Target,
    extra: Target,
    depth_stencil: Target,
    bind_group: BindGroupHandle,
    width: u32,
    height: u32,
}

impl GeometryBuffer {
    pub fn create(
        backend: &mut dyn GraphicsBackend,
        sample_layout: BindGroupLayoutHandle,
        width: u32,
        height: u32,
    ) -> BackendResult<Self> {
        let albedo = Target::create(backend, "gbuffer albedo", width, height, GBUFFER_ALBEDO_FORMAT)?;
        let normal = Target::create(backend, "gbuffer normal", width, height, GBUFFER_NORMAL_FORMAT)?;
        let depth = Target::create(backend, "gbuffer depth", width, height, GBUFFER_DEPTH_FORMAT)?;
        let extra = Target::create(backend, "gbuffer extra", width, height, GBUFFER_EXTRA_FORMAT)?;
        let depth_stencil = Target::create(
            backend,
            "gbuffer depth-stencil",
            width,
            height,
            GBUFFER_DEPTH_STENCIL_FORMAT,
        )?;

        let bind_group = backend.create_bind_group(
            sample_layout,
            &[
                (0, BindGroupEntry::Texture(albedo.view)),
                (1, BindGroupEntry::Texture(normal.view)),
                (2, BindGroupEntry::Texture(depth.view)),
                (3, BindGroupEntry::Texture(extra.view)),
            ],
        )?;

        Ok(Self {
            albedo,
            normal,
            depth,
            extra,
            depth_stencil,
            bind_group,
            width,
            height,
        })
    }

    /// Release and recreate all targets at the new viewport size.
    pub fn resize(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        sample_layout: BindGroupLayoutHandle,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        self.release(backend);
        *self = Self::create(backend, sample_layout, width, height)?;
        Ok(())
    }

    /// Deterministic teardown of every GPU resource.
    pub fn release(&self, backend: &mut dyn GraphicsBackend) {
        backend.destroy_texture(self.albedo.texture);
        backend.destroy_texture(self.normal.texture);
        backend.destroy_texture(self.depth.texture);
        backend.destroy_texture(self.extra.texture);
        backend.destroy_texture(self.depth_stencil.texture);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn albedo_view(&self) -> TextureViewHandle {
        self.albedo.view
    }

    pub fn normal_view(&self) -> TextureViewHandle {
        self.normal.view
    }

    pub fn depth_view(&self) -> TextureViewHandle {
        self.depth.view
    }

    pub fn extra_view(&self) -> TextureViewHandle {
        self.extra.view
    }

    pub fn depth_stencil_view(&self) -> TextureViewHandle {
        self.depth_stencil.view
    }

    /// Read-only sampling bind group for the lighting/composition passes.
    pub fn bind_group(&self) -> BindGroupHandle {
        self.bind_group
    }
}
