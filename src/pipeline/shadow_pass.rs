//! Depth-only shadow rendering into shadow-map array layers.
//!
//! One render pass per cascade, per shadowed spot light, and per point
//! light face. Each layer slot owns its view-projection uniform buffer so
//! queued buffer writes from different slots never alias within a frame.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::context::ShadowDrawContext;
use crate::pipeline::techniques::Techniques;
use crate::profiling::FrameProfiler;
use crate::scene::{Drawable, PointLight};
use crate::shadow::{
    point_light_face_matrix, ShadowMapCascadeSet, ShadowMaps, MAX_CASCADES, MAX_SHADOWED_POINT,
    MAX_SHADOWED_SPOT,
};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

pub const CASCADE_PASS_LABEL: &str = "Shadow Cascade Pass";
pub const SPOT_SHADOW_PASS_LABEL: &str = "Shadow Spot Pass";
pub const POINT_SHADOW_PASS_LABEL: &str = "Shadow Point Pass";

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CastUniform {
    view_proj: Mat4,
}

struct CastSlot {
    buffer: BufferHandle,
    bind_group: BindGroupHandle,
}

impl CastSlot {
    fn create(
        backend: &mut dyn GraphicsBackend,
        layout: BindGroupLayoutHandle,
        label: &str,
    ) -> BackendResult<Self> {
        let buffer = backend.create_buffer(&BufferDescriptor {
            label: Some(label.to_string()),
            size: std::mem::size_of::<CastUniform>() as u64,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            mapped_at_creation: false,
        })?;
        let bind_group = backend.create_bind_group(
            layout,
            &[(
                0,
                BindGroupEntry::Buffer {
                    buffer,
                    offset: 0,
                    size: None,
                },
            )],
        )?;
        Ok(Self { buffer, bind_group })
    }
}

pub struct ShadowPass {
    cascade_slots: Vec<CastSlot>,
    spot_slots: Vec<CastSlot>,
    point_slots: Vec<CastSlot>,
}

impl ShadowPass {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        cast_layout: BindGroupLayoutHandle,
    ) -> BackendResult<Self> {
        let make = |backend: &mut dyn GraphicsBackend, count: usize, what: &str| {
            (0..count)
                .map(|i| CastSlot::create(backend, cast_layout, &format!("{what} cast {i}")))
                .collect::<BackendResult<Vec<_>>>()
        };
        Ok(Self {
            cascade_slots: make(backend, MAX_CASCADES, "cascade")?,
            spot_slots: make(backend, MAX_SHADOWED_SPOT, "spot")?,
            point_slots: make(backend, MAX_SHADOWED_POINT * 6, "point")?,
        })
    }

    fn render_layer(
        backend: &mut dyn GraphicsBackend,
        techniques: &Techniques,
        label: &str,
        target: TextureViewHandle,
        slot: &CastSlot,
        view_proj: Mat4,
        map_size: u32,
        casters: &[&dyn Drawable],
        profiler: &mut dyn FrameProfiler,
    ) {
        profiler.pass_begin(label);

        let uniform = CastUniform { view_proj };
        backend.write_buffer(slot.buffer, 0, bytemuck::bytes_of(&uniform));

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some(label.into()),
            color_attachments: vec![],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: target,
                depth_load_op: LoadOp::Clear([0.0; 4]),
                depth_store_op: StoreOp::Store,
                depth_clear_value: 1.0,
                stencil_load_op: LoadOp::Load,
                stencil_store_op: StoreOp::Discard,
                stencil_clear_value: 0,
            }),
        });

        backend.set_viewport(0.0, 0.0, map_size as f32, map_size as f32, 0.0, 1.0);
        backend.set_render_pipeline(techniques.shadow_depth);
        backend.set_bind_group(0, slot.bind_group);

        let mut ctx = ShadowDrawContext {
            backend: &mut *backend,
            view_proj,
        };
        for caster in casters {
            caster.draw_shadows(&mut ctx);
            profiler.draw_submitted(0);
        }
        drop(ctx);

        backend.end_render_pass();
        profiler.pass_end(label);
    }

    /// Render every cascade layer of the directional shadow map.
    #[allow(clippy::too_many_arguments)]
    pub fn render_cascades(
        &self,
        backend: &mut dyn GraphicsBackend,
        techniques: &Techniques,
        maps: &ShadowMaps,
        cascades: &ShadowMapCascadeSet,
        casters: &[&dyn Drawable],
        profiler: &mut dyn FrameProfiler,
    ) {
        for cascade in 0..cascades.total_cascades() {
            Self::render_layer(
                backend,
                techniques,
                CASCADE_PASS_LABEL,
                maps.cascades.layer_view(cascade),
                &self.cascade_slots[cascade],
                cascades.world_to_cascade(cascade),
                maps.map_size(),
                casters,
                profiler,
            );
        }
    }

    /// Render one shadowed spot light into its layer.
    #[allow(clippy::too_many_arguments)]
    pub fn render_spot(
        &self,
        backend: &mut dyn GraphicsBackend,
        techniques: &Techniques,
        maps: &ShadowMaps,
        layer: usize,
        view_proj: Mat4,
        casters: &[&dyn Drawable],
        profiler: &mut dyn FrameProfiler,
    ) {
        Self::render_layer(
            backend,
            techniques,
            SPOT_SHADOW_PASS_LABEL,
            maps.spots.layer_view(layer),
            &self.spot_slots[layer],
            view_proj,
            maps.map_size(),
            casters,
            profiler,
        );
    }

    /// Render all six faces of one shadowed point light.
    #[allow(clippy::too_many_arguments)]
    pub fn render_point(
        &self,
        backend: &mut dyn GraphicsBackend,
        techniques: &Techniques,
        maps: &ShadowMaps,
        slot: usize,
        light: &PointLight,
        casters: &[&dyn Drawable],
        profiler: &mut dyn FrameProfiler,
    ) {
        for face in 0..6 {
            let layer = slot * 6 + face;
            Self::render_layer(
                backend,
                techniques,
                POINT_SHADOW_PASS_LABEL,
                maps.points.layer_view(layer),
                &self.point_slots[layer],
                point_light_face_matrix(light, face),
                maps.map_size(),
                casters,
                profiler,
            );
        }
    }
}

/// Depth-only shadow shader; no fragment stage.
pub const SHADOW_DEPTH_SHADER: &str = r#"
struct CastUniforms {
    view_proj: mat4x4<f32>,
}

struct ObjectUniforms {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
}

@group(0) @binding(0) var<uniform> cast: CastUniforms;
@group(1) @binding(0) var<uniform> object: ObjectUniforms;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return cast.view_proj * object.model * vec4<f32>(position, 1.0);
}
"#;
