//! Headless recording backend.
//!
//! Performs no GPU work; every resource creation hands out a fresh handle
//! and every render pass is appended to a journal. Pipeline-level tests
//! assert on the journal: pass order, draw counts per target, stencil
//! references.

use crate::backend::traits::*;
use crate::backend::types::*;

/// One draw call as recorded by the headless backend.
#[derive(Debug, Clone)]
pub struct RecordedDraw {
    pub pipeline: Option<RenderPipelineHandle>,
    pub vertex_count: u32,
    pub index_count: u32,
    pub stencil_reference: u32,
}

/// One render pass as recorded by the headless backend.
#[derive(Debug, Clone)]
pub struct RecordedPass {
    pub label: String,
    pub color_attachments: Vec<TextureViewHandle>,
    pub depth_stencil_attachment: Option<TextureViewHandle>,
    pub stencil_cleared: bool,
    pub draws: Vec<RecordedDraw>,
}

impl RecordedPass {
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }
}

/// Headless backend for testing without GPU hardware.
pub struct HeadlessBackend {
    width: u32,
    height: u32,
    next_handle: u64,
    swapchain_view: TextureViewHandle,
    in_frame: bool,

    current_pass: Option<RecordedPass>,
    current_pipeline: Option<RenderPipelineHandle>,
    current_stencil_reference: u32,
    passes: Vec<RecordedPass>,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_handle: 1,
            swapchain_view: TextureViewHandle(0),
            in_frame: false,
            current_pass: None,
            current_pipeline: None,
            current_stencil_reference: 0,
            passes: Vec::new(),
        }
    }

    fn next(&mut self) -> u64 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    /// Journal of every pass recorded since the last [`Self::clear_journal`].
    pub fn recorded_passes(&self) -> &[RecordedPass] {
        &self.passes
    }

    pub fn clear_journal(&mut self) {
        self.passes.clear();
    }

    /// True between `begin_frame` and `end_frame`.
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Labels of recorded passes, in submission order.
    pub fn pass_labels(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.label.as_str()).collect()
    }

    /// Total draw calls across passes whose label contains `needle`.
    pub fn draws_into(&self, needle: &str) -> usize {
        self.passes
            .iter()
            .filter(|p| p.label.contains(needle))
            .map(RecordedPass::draw_count)
            .sum()
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        let id = self.next();
        self.swapchain_view = TextureViewHandle(id);
        self.in_frame = true;
        log::trace!("HeadlessBackend: begin frame {}x{}", self.width, self.height);
        Ok(FrameContext {
            swapchain_view: self.swapchain_view,
            width: self.width,
            height: self.height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        self.in_frame = false;
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        TextureFormat::Bgra8UnormSrgb
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        log::trace!(
            "HeadlessBackend: creating buffer {:?} (size: {})",
            desc.label,
            desc.size
        );
        Ok(BufferHandle(self.next()))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        _data: &[u8],
    ) -> BackendResult<BufferHandle> {
        self.create_buffer(desc)
    }

    fn write_buffer(&mut self, _buffer: BufferHandle, _offset: u64, _data: &[u8]) {}

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        log::trace!(
            "HeadlessBackend: creating texture {:?} ({}x{}x{})",
            desc.label,
            desc.width,
            desc.height,
            desc.array_layers
        );
        Ok(TextureHandle(self.next()))
    }

    fn create_texture_view(
        &mut self,
        _texture: TextureHandle,
        _desc: &TextureViewDescriptor,
    ) -> BackendResult<TextureViewHandle> {
        Ok(TextureViewHandle(self.next()))
    }

    fn write_texture(&mut self, _texture: TextureHandle, _data: &[u8], _width: u32, _height: u32) {}

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        log::trace!("HeadlessBackend: creating sampler {:?}", desc.label);
        Ok(SamplerHandle(self.next()))
    }

    fn create_bind_group_layout(
        &mut self,
        _entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        Ok(BindGroupLayoutHandle(self.next()))
    }

    fn create_bind_group(
        &mut self,
        _layout: BindGroupLayoutHandle,
        _entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        Ok(BindGroupHandle(self.next()))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        log::trace!("HeadlessBackend: creating pipeline {:?}", desc.label);
        Ok(RenderPipelineHandle(self.next()))
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        self.current_pipeline = None;
        self.current_stencil_reference = 0;
        self.current_pass = Some(RecordedPass {
            label: desc.label.clone().unwrap_or_default(),
            color_attachments: desc.color_attachments.iter().map(|a| a.view).collect(),
            depth_stencil_attachment: desc.depth_stencil_attachment.as_ref().map(|a| a.view),
            stencil_cleared: desc
                .depth_stencil_attachment
                .as_ref()
                .map(|a| matches!(a.stencil_load_op, LoadOp::Clear(_)))
                .unwrap_or(false),
            draws: Vec::new(),
        });
    }

    fn end_render_pass(&mut self) {
        if let Some(pass) = self.current_pass.take() {
            self.passes.push(pass);
        }
    }

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        self.current_pipeline = Some(pipeline);
    }

    fn set_bind_group(&mut self, _index: u32, _bind_group: BindGroupHandle) {}

    fn set_vertex_buffer(&mut self, _slot: u32, _buffer: BufferHandle, _offset: u64) {}

    fn set_index_buffer(&mut self, _buffer: BufferHandle, _offset: u64, _format: IndexFormat) {}

    fn set_viewport(
        &mut self,
        _x: f32,
        _y: f32,
        _width: f32,
        _height: f32,
        _min_depth: f32,
        _max_depth: f32,
    ) {
    }

    fn set_scissor_rect(&mut self, _x: u32, _y: u32, _width: u32, _height: u32) {}

    fn set_stencil_reference(&mut self, reference: u32) {
        self.current_stencil_reference = reference;
    }

    fn draw(&mut self, vertices: std::ops::Range<u32>, _instances: std::ops::Range<u32>) {
        let pipeline = self.current_pipeline;
        let stencil_reference = self.current_stencil_reference;
        if let Some(pass) = self.current_pass.as_mut() {
            pass.draws.push(RecordedDraw {
                pipeline,
                vertex_count: vertices.end - vertices.start,
                index_count: 0,
                stencil_reference,
            });
        }
    }

    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        _base_vertex: i32,
        _instances: std::ops::Range<u32>,
    ) {
        let pipeline = self.current_pipeline;
        let stencil_reference = self.current_stencil_reference;
        if let Some(pass) = self.current_pass.as_mut() {
            pass.draws.push(RecordedDraw {
                pipeline,
                vertex_count: 0,
                index_count: indices.end - indices.start,
                stencil_reference,
            });
        }
    }

    fn destroy_buffer(&mut self, _buffer: BufferHandle) {}

    fn destroy_texture(&mut self, _texture: TextureHandle) {}
}
