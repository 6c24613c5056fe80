//! Forward pass for non-deferred drawables.
//!
//! Runs strictly after composition so alpha blending composes against the
//! already-lit opaque scene. The G-buffer depth-stencil is re-attached so
//! forward geometry still occludes correctly; when no deferred content ran
//! this frame the pass clears the backbuffer and depth itself.

use crate::backend::traits::*;
use crate::pipeline::context::{DrawContext, DrawPhase};
use crate::pipeline::gbuffer::GeometryBuffer;
use crate::pipeline::techniques::Techniques;
use crate::profiling::FrameProfiler;
use crate::scene::{Drawable, Frustum, SceneLights};
use glam::{Mat4, Vec3, Vec4};

pub const FORWARD_PASS_LABEL: &str = "Forward Pass";

pub struct ForwardPass;

impl ForwardPass {
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        backend: &mut dyn GraphicsBackend,
        techniques: &Techniques,
        gbuffer: &GeometryBuffer,
        target: TextureViewHandle,
        camera_bind_group: BindGroupHandle,
        ambient_bind_group: BindGroupHandle,
        clear_target: bool,
        clear_color: Vec4,
        view: Mat4,
        proj: Mat4,
        eye: Vec3,
        frustum: &Frustum,
        lights: &SceneLights,
        shadows_bound: bool,
        drawables: &[&dyn Drawable],
        profiler: &mut dyn FrameProfiler,
    ) {
        profiler.pass_begin(FORWARD_PASS_LABEL);

        let (width, height) = gbuffer.size();
        let depth_attachment = if clear_target {
            DepthStencilAttachment::clear(gbuffer.depth_stencil_view(), 1.0)
        } else {
            DepthStencilAttachment::load(gbuffer.depth_stencil_view())
        };

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some(FORWARD_PASS_LABEL.into()),
            color_attachments: vec![ColorAttachment {
                view: target,
                load_op: if clear_target {
                    LoadOp::Clear([
                        clear_color.x,
                        clear_color.y,
                        clear_color.z,
                        clear_color.w,
                    ])
                } else {
                    LoadOp::Load
                },
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: Some(depth_attachment),
        });

        backend.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        backend.set_render_pipeline(techniques.forward);
        backend.set_bind_group(0, camera_bind_group);
        backend.set_bind_group(3, ambient_bind_group);

        let mut ctx = DrawContext {
            backend: &mut *backend,
            phase: DrawPhase::Forward,
            view,
            proj,
            view_proj: proj * view,
            eye,
            frustum,
            lights,
            shadows_bound,
        };
        for drawable in drawables {
            drawable.draw(&mut ctx);
            profiler.draw_submitted(0);
        }
        drop(ctx);

        backend.end_render_pass();
        profiler.pass_end(FORWARD_PASS_LABEL);
    }
}

/// Forward shading: hemispheric ambient + directional Blinn-Phong with
/// alpha from the material.
pub const FORWARD_SHADER: &str = r#"
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
    specular: vec4<f32>,
    emissive: vec4<f32>,
}

struct DirectionalLight {
    direction: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
}

struct AmbientDirectional {
    hemisphere_sky: vec4<f32>,
    hemisphere_ground: vec4<f32>,
    counts: vec4<f32>,
    lights: array<DirectionalLight, 3>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(1) @binding(0) var<uniform> object: ObjectUniforms;
@group(2) @binding(0) var<uniform> material: MaterialUniforms;
@group(3) @binding(0) var<uniform> scene_lights: AmbientDirectional;

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
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    let world_pos = object.model * vec4<f32>(input.position, 1.0);
    output.world_position = world_pos.xyz;
    output.clip_position = camera.view_proj * world_pos;
    output.world_normal = normalize((object.normal_matrix * vec4<f32>(input.normal, 0.0)).xyz);
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(input.world_normal);
    let view_dir = normalize(camera.position.xyz - input.world_position);

    var lit = vec3<f32>(0.0, 0.0, 0.0);
    if (scene_lights.hemisphere_sky.w > 0.5) {
        let up_amount = n.y * 0.5 + 0.5;
        lit = mix(
            scene_lights.hemisphere_ground.rgb,
            scene_lights.hemisphere_sky.rgb,
            up_amount,
        );
    }

    var specular = vec3<f32>(0.0, 0.0, 0.0);
    let count = u32(scene_lights.counts.x);
    for (var i = 0u; i < count; i = i + 1u) {
        let light = scene_lights.lights[i];
        let light_dir = -normalize(light.direction.xyz);
        let ndotl = max(dot(n, light_dir), 0.0);
        if (ndotl <= 0.0) {
            continue;
        }
        lit = lit + light.diffuse.rgb * ndotl;

        let half_vec = normalize(light_dir + view_dir);
        let ndoth = max(dot(n, half_vec), 0.0);
        specular = specular
            + light.specular.rgb * pow(ndoth, max(material.specular.y, 1.0)) * material.specular.x;
    }

    let color = material.emissive.rgb + lit * material.base_color.rgb + specular;
    return vec4<f32>(color, material.base_color.a);
}
"#;
