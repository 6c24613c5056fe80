//! G-buffer fill pass.
//!
//! Renders every deferred-enabled opaque drawable into the four geometry
//! targets plus the shared depth-stencil.

use crate::backend::traits::*;
use crate::pipeline::context::{DrawContext, DrawPhase};
use crate::pipeline::gbuffer::GeometryBuffer;
use crate::pipeline::techniques::Techniques;
use crate::profiling::FrameProfiler;
use crate::scene::{Drawable, Frustum, SceneLights};
use glam::{Mat4, Vec3};

pub const GEOMETRY_PASS_LABEL: &str = "G-Buffer Pass";

pub struct GeometryPass;

impl GeometryPass {
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        backend: &mut dyn GraphicsBackend,
        techniques: &Techniques,
        gbuffer: &GeometryBuffer,
        camera_bind_group: BindGroupHandle,
        view: Mat4,
        proj: Mat4,
        eye: Vec3,
        frustum: &Frustum,
        lights: &SceneLights,
        drawables: &[&dyn Drawable],
        profiler: &mut dyn FrameProfiler,
    ) {
        profiler.pass_begin(GEOMETRY_PASS_LABEL);

        let (width, height) = gbuffer.size();
        let clear = |color| ColorAttachment {
            view: color,
            load_op: LoadOp::Clear([0.0, 0.0, 0.0, 0.0]),
            store_op: StoreOp::Store,
        };

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some(GEOMETRY_PASS_LABEL.into()),
            color_attachments: vec![
                clear(gbuffer.albedo_view()),
                clear(gbuffer.normal_view()),
                // Depth-as-color clears to the far plane.
                ColorAttachment {
                    view: gbuffer.depth_view(),
                    load_op: LoadOp::Clear([1.0, 0.0, 0.0, 0.0]),
                    store_op: StoreOp::Store,
                },
                clear(gbuffer.extra_view()),
            ],
            depth_stencil_attachment: Some(DepthStencilAttachment::clear(
                gbuffer.depth_stencil_view(),
                1.0,
            )),
        });

        backend.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        backend.set_render_pipeline(techniques.geometry);
        backend.set_bind_group(0, camera_bind_group);

        let mut ctx = DrawContext {
            backend: &mut *backend,
            phase: DrawPhase::Deferred,
            view,
            proj,
            view_proj: proj * view,
            eye,
            frustum,
            lights,
            shadows_bound: false,
        };
        for drawable in drawables {
            drawable.draw(&mut ctx);
            profiler.draw_submitted(0);
        }
        drop(ctx);

        backend.end_render_pass();
        profiler.pass_end(GEOMETRY_PASS_LABEL);
    }
}

/// G-buffer generation shader
pub const GEOMETRY_SHADER: &str = r#"
// Geometry pass: fill the G-buffer targets.

struct CameraUniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    view_proj: mat4x4<f32>,
    inv_view: mat4x4<f32>,
    inv_proj: mat4x4<f32>,
    position: vec4<f32>,
    near_far: vec4<f32>,
}

struct ObjectUniforms {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
}

struct MaterialUniforms {
    base_color: vec4<f32>,
    // x = specular intensity, y = specular power
    specular: vec4<f32>,
    emissive: vec4<f32>,
}

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tangent: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct GBufferOutput {
    @location(0) albedo: vec4<f32>,
    @location(1) normal: vec4<f32>,
    @location(2) depth: vec4<f32>,
    @location(3) extra: vec4<f32>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(1) @binding(0) var<uniform> object: ObjectUniforms;
@group(2) @binding(0) var<uniform> material: MaterialUniforms;

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    let world_pos = object.model * vec4<f32>(input.position, 1.0);
    output.world_position = world_pos.xyz;
    output.clip_position = camera.view_proj * world_pos;
    output.world_normal = normalize((object.normal_matrix * vec4<f32>(input.normal, 0.0)).xyz);
    output.uv = input.uv;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> GBufferOutput {
    var output: GBufferOutput;

    output.albedo = vec4<f32>(material.base_color.rgb, 1.0);

    // World-space normal to [0,1]; w carries specular intensity.
    output.normal = vec4<f32>(input.world_normal * 0.5 + 0.5, material.specular.x);

    // NDC depth as color, the copy sampled by later passes.
    output.depth = vec4<f32>(input.clip_position.z, 0.0, 0.0, 0.0);

    // rgb = emissive, a = specular power / 256.
    output.extra = vec4<f32>(material.emissive.rgb, material.specular.y / 256.0);

    return output;
}
"#;
