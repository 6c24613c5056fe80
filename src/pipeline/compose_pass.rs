//! Deferred composition: G-buffer + light buffer to the final color, fog
//! applied by distance from the eye. One full-screen triangle draw.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::gbuffer::GeometryBuffer;
use crate::pipeline::techniques::Techniques;
use crate::profiling::FrameProfiler;
use crate::scene::Fog;
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

pub const COMPOSE_PASS_LABEL: &str = "Composition Pass";

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ComposeUniform {
    background: Vec4,
    /// rgb = fog color, w = enabled
    fog_color: Vec4,
    /// x = fog start, y = fog range
    fog_params: Vec4,
}

pub struct ComposePass {
    uniform_buffer: BufferHandle,
    bind_group: BindGroupHandle,
    pub background: Vec3,
}

impl ComposePass {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        layout: BindGroupLayoutHandle,
    ) -> BackendResult<Self> {
        let uniform_buffer = backend.create_buffer(&BufferDescriptor {
            label: Some("compose uniforms".to_string()),
            size: std::mem::size_of::<ComposeUniform>() as u64,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            mapped_at_creation: false,
        })?;
        let bind_group = backend.create_bind_group(
            layout,
            &[(
                0,
                BindGroupEntry::Buffer {
                    buffer: uniform_buffer,
                    offset: 0,
                    size: None,
                },
            )],
        )?;
        Ok(Self {
            uniform_buffer,
            bind_group,
            background: Vec3::new(0.05, 0.06, 0.09),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &self,
        backend: &mut dyn GraphicsBackend,
        techniques: &Techniques,
        gbuffer: &GeometryBuffer,
        light_bind_group: BindGroupHandle,
        camera_bind_group: BindGroupHandle,
        target: TextureViewHandle,
        fog: &Fog,
        width: u32,
        height: u32,
        profiler: &mut dyn FrameProfiler,
    ) {
        profiler.pass_begin(COMPOSE_PASS_LABEL);

        let uniform = ComposeUniform {
            background: self.background.extend(1.0),
            fog_color: fog.color.extend(if fog.enabled { 1.0 } else { 0.0 }),
            fog_params: Vec4::new(fog.start, fog.range.max(1e-3), 0.0, 0.0),
        };
        backend.write_buffer(self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some(COMPOSE_PASS_LABEL.into()),
            color_attachments: vec![ColorAttachment {
                view: target,
                load_op: LoadOp::Clear([0.0, 0.0, 0.0, 1.0]),
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: None,
        });

        backend.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        backend.set_render_pipeline(techniques.compose);
        backend.set_bind_group(0, camera_bind_group);
        backend.set_bind_group(1, self.bind_group);
        backend.set_bind_group(2, gbuffer.bind_group());
        backend.set_bind_group(3, light_bind_group);
        backend.draw(0..3, 0..1);
        profiler.draw_submitted(1);

        backend.end_render_pass();
        profiler.pass_end(COMPOSE_PASS_LABEL);
    }
}

/// Final combine shader: `(emissive + diffuse) * albedo + specular`, then
/// linear fog toward the fog color.
pub const COMPOSE_SHADER: &str = r#"
struct CameraUniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    view_proj: mat4x4<f32>,
    inv_view: mat4x4<f32>,
    inv_proj: mat4x4<f32>,
    position: vec4<f32>,
    near_far: vec4<f32>,
}

struct ComposeUniforms {
    background: vec4<f32>,
    fog_color: vec4<f32>,
    fog_params: vec4<f32>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(1) @binding(0) var<uniform> compose: ComposeUniforms;
@group(2) @binding(0) var gbuffer_albedo: texture_2d<f32>;
@group(2) @binding(1) var gbuffer_normal: texture_2d<f32>;
@group(2) @binding(2) var gbuffer_depth: texture_2d<f32>;
@group(2) @binding(3) var gbuffer_extra: texture_2d<f32>;
@group(3) @binding(0) var light_buffer: texture_2d<f32>;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var output: VertexOutput;
    let x = f32((vertex_index << 1u) & 2u);
    let y = f32(vertex_index & 2u);
    output.position = vec4<f32>(x * 2.0 - 1.0, y * 2.0 - 1.0, 0.0, 1.0);
    output.uv = vec2<f32>(x, 1.0 - y);
    return output;
}

fn reconstruct_world_position(uv: vec2<f32>, depth: f32) -> vec3<f32> {
    let ndc = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, depth, 1.0);
    let world = camera.inv_view * camera.inv_proj * ndc;
    return world.xyz / world.w;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let pixel = vec2<i32>(input.position.xy);
    let depth = textureLoad(gbuffer_depth, pixel, 0).r;
    if (depth >= 1.0) {
        return vec4<f32>(compose.background.rgb, 1.0);
    }

    let albedo = textureLoad(gbuffer_albedo, pixel, 0).rgb;
    let extra = textureLoad(gbuffer_extra, pixel, 0);
    let light = textureLoad(light_buffer, pixel, 0);

    var color = (extra.rgb + light.rgb) * albedo + vec3<f32>(light.a, light.a, light.a);

    if (compose.fog_color.w > 0.5) {
        let world_pos = reconstruct_world_position(input.uv, depth);
        let dist = length(world_pos - camera.position.xyz);
        let fog = clamp((dist - compose.fog_params.x) / compose.fog_params.y, 0.0, 1.0);
        color = mix(color, compose.fog_color.rgb, fog);
    }

    return vec4<f32>(color, 1.0);
}
"#;
