//! Drawables: capability-tagged scene objects the renderer borrows per frame

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::context::{DrawContext, ShadowDrawContext};
use crate::pipeline::techniques::SharedLayouts;
use crate::resources::{Material, Mesh};
use crate::scene::frustum::BoundingSphere;
use crate::scene::transform::Transform;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};

/// Anything the scene renderer can draw.
///
/// The renderer never owns drawables; it borrows them each frame, reads the
/// capability flags, and dispatches `draw`/`draw_shadows` on the ones that
/// pass culling and readiness checks.
pub trait Drawable {
    /// Participates in rendering at all this frame
    fn visible(&self) -> bool;

    /// Fully opaque; opaque drawables go through the G-buffer and cast shadows
    fn opaque(&self) -> bool;

    /// Shaded by the deferred pipeline; otherwise drawn in the forward pass
    fn deferred(&self) -> bool;

    /// Participates in frustum culling (skyboxes and the like opt out)
    fn cull(&self) -> bool;

    /// World-space bounds used for culling when `cull` is set
    fn bounds(&self) -> Option<BoundingSphere>;

    /// False while an asynchronous upload is still in flight; the renderer
    /// skips the drawable for the frame and retries next frame
    fn ready(&self) -> bool {
        true
    }

    /// Record draw commands for a color pass
    fn draw(&self, ctx: &mut DrawContext<'_>);

    /// Record draw commands for a shadow depth pass
    fn draw_shadows(&self, ctx: &mut ShadowDrawContext<'_>);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// GPU-side resources of an uploaded model
struct GpuModel {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_count: u32,
    object_buffer: BufferHandle,
    object_bind_group: BindGroupHandle,
    #[allow(dead_code)]
    material_buffer: BufferHandle,
    material_bind_group: BindGroupHandle,
}

/// A mesh + material + transform drawable.
pub struct Model {
    pub transform: Transform,
    pub visible: bool,
    pub cull: bool,
    deferred: bool,
    opaque: bool,
    mesh: Option<Mesh>,
    material: Material,
    local_bounds: BoundingSphere,
    gpu: Option<GpuModel>,
    ready: AtomicBool,
}

impl Model {
    /// Create an unuploaded model; `ready()` is false until [`Self::upload`].
    pub fn new(mesh: Mesh, material: Material) -> Self {
        let local_bounds = mesh.bounding_sphere();
        let opaque = !material.is_transparent();
        Self {
            transform: Transform::default(),
            visible: true,
            cull: true,
            deferred: opaque,
            opaque,
            mesh: Some(mesh),
            material,
            local_bounds,
            gpu: None,
            ready: AtomicBool::new(false),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Force the forward path even for an opaque material.
    pub fn forward_only(mut self) -> Self {
        self.deferred = false;
        self
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Upload mesh and material to the GPU and mark the model ready.
    pub fn upload(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        layouts: &SharedLayouts,
    ) -> BackendResult<()> {
        let Some(mesh) = self.mesh.take() else {
            return Ok(());
        };

        let vertex_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} vertices", mesh.name)),
                size: mesh.vertex_bytes().len() as u64,
                usage: BufferUsage::VERTEX,
                mapped_at_creation: false,
            },
            mesh.vertex_bytes(),
        )?;

        let index_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} indices", mesh.name)),
                size: mesh.index_bytes().len() as u64,
                usage: BufferUsage::INDEX,
                mapped_at_creation: false,
            },
            mesh.index_bytes(),
        )?;

        let object_buffer = backend.create_buffer(&BufferDescriptor {
            label: Some(format!("{} object uniform", mesh.name)),
            size: std::mem::size_of::<ObjectUniform>() as u64,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            mapped_at_creation: false,
        })?;

        let object_bind_group = backend.create_bind_group(
            layouts.object,
            &[(
                0,
                BindGroupEntry::Buffer {
                    buffer: object_buffer,
                    offset: 0,
                    size: None,
                },
            )],
        )?;

        let material_uniform = self.material.uniform_data();
        let material_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} material", self.material.name)),
                size: std::mem::size_of_val(&material_uniform) as u64,
                usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                mapped_at_creation: false,
            },
            bytemuck::bytes_of(&material_uniform),
        )?;

        let material_bind_group = backend.create_bind_group(
            layouts.material,
            &[(
                0,
                BindGroupEntry::Buffer {
                    buffer: material_buffer,
                    offset: 0,
                    size: None,
                },
            )],
        )?;

        self.gpu = Some(GpuModel {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count() as u32,
            object_buffer,
            object_bind_group,
            material_buffer,
            material_bind_group,
        });
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    fn write_object_uniform(&self, backend: &mut dyn GraphicsBackend, gpu: &GpuModel) {
        let uniform = ObjectUniform {
            model: self.transform.matrix(),
            normal_matrix: self.transform.normal_matrix(),
        };
        backend.write_buffer(gpu.object_buffer, 0, bytemuck::bytes_of(&uniform));
    }
}

impl Drawable for Model {
    fn visible(&self) -> bool {
        self.visible
    }

    fn opaque(&self) -> bool {
        self.opaque
    }

    fn deferred(&self) -> bool {
        self.deferred
    }

    fn cull(&self) -> bool {
        self.cull
    }

    fn bounds(&self) -> Option<BoundingSphere> {
        Some(
            self.local_bounds
                .transformed(&self.transform.matrix(), self.transform.max_scale()),
        )
    }

    fn ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn draw(&self, ctx: &mut DrawContext<'_>) {
        let Some(gpu) = &self.gpu else {
            return;
        };
        if !ctx.accepts(self.opaque) {
            log::debug!("transparent model rejected from the deferred pass");
            return;
        }

        self.write_object_uniform(ctx.backend, gpu);
        ctx.backend.set_bind_group(1, gpu.object_bind_group);
        ctx.backend.set_bind_group(2, gpu.material_bind_group);
        ctx.backend.set_vertex_buffer(0, gpu.vertex_buffer, 0);
        ctx.backend
            .set_index_buffer(gpu.index_buffer, 0, IndexFormat::Uint32);
        ctx.backend.draw_indexed(0..gpu.index_count, 0, 0..1);
    }

    fn draw_shadows(&self, ctx: &mut ShadowDrawContext<'_>) {
        let Some(gpu) = &self.gpu else {
            return;
        };

        self.write_object_uniform(ctx.backend, gpu);
        ctx.backend.set_bind_group(1, gpu.object_bind_group);
        ctx.backend.set_vertex_buffer(0, gpu.vertex_buffer, 0);
        ctx.backend
            .set_index_buffer(gpu.index_buffer, 0, IndexFormat::Uint32);
        ctx.backend.draw_indexed(0..gpu.index_count, 0, 0..1);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
