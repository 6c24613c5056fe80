//! Light accumulation into the HDR light buffer.
//!
//! Directional and hemispheric lighting run as one full-screen triangle
//! draw that also clears the buffer. Point and spot lights rasterize unit
//! sphere/cone volumes with a two-pass stencil technique per light:
//!
//! 1. marking: both faces of the volume rasterize against the G-buffer
//!    depth with color writes off; depth-fail increments on back faces and
//!    decrements on front faces, leaving non-zero stencil exactly where
//!    scene geometry sits inside the volume;
//! 2. lighting: back faces only (one fragment per covered pixel, eye
//!    inside or out), stencil-tested NotEqual 0, additively blended.
//!
//! A single-pass front-face draw would double-shade overlapping silhouette
//! edges and light pixels occluded by nearer geometry; the stencil
//! pre-pass rules out both.
//!
//! Light buffer packing: rgb = accumulated diffuse, a = accumulated
//! specular intensity.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::gbuffer::GeometryBuffer;
use crate::pipeline::techniques::{SharedLayouts, Techniques};
use crate::profiling::FrameProfiler;
use crate::resources::Mesh;
use crate::scene::{BoundingSphere, Frustum, GpuVolumeLight, SceneLights};
use crate::scene::{MAX_POINT_LIGHTS, MAX_SPOT_LIGHTS};

pub const LIGHT_BUFFER_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

pub const DIRECTIONAL_PASS_LABEL: &str = "Directional Light Pass";
pub const STENCIL_MARK_PASS_LABEL: &str = "Stencil Mark Pass";
pub const POINT_LIGHT_PASS_LABEL: &str = "Point Light Pass";
pub const SPOT_LIGHT_PASS_LABEL: &str = "Spot Light Pass";

/// Shadow-map layer assignments for the frame, light index to layer.
#[derive(Debug, Default, Clone)]
pub struct ShadowAssignments {
    pub spot: Vec<(usize, usize)>,
    pub point: Vec<(usize, usize)>,
}

impl ShadowAssignments {
    fn spot_layer(&self, light_index: usize) -> i32 {
        self.spot
            .iter()
            .find(|(index, _)| *index == light_index)
            .map(|(_, layer)| *layer as i32)
            .unwrap_or(-1)
    }

    fn point_slot(&self, light_index: usize) -> i32 {
        self.point
            .iter()
            .find(|(index, _)| *index == light_index)
            .map(|(_, slot)| *slot as i32)
            .unwrap_or(-1)
    }
}

/// Cached unit-volume geometry; created once, the transforms do the rest.
struct VolumeGeometry {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_count: u32,
}

impl VolumeGeometry {
    fn upload(backend: &mut dyn GraphicsBackend, mesh: &Mesh) -> BackendResult<Self> {
        let vertex_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} volume vertices", mesh.name)),
                size: mesh.vertex_bytes().len() as u64,
                usage: BufferUsage::VERTEX,
                mapped_at_creation: false,
            },
            mesh.vertex_bytes(),
        )?;
        let index_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} volume indices", mesh.name)),
                size: mesh.index_bytes().len() as u64,
                usage: BufferUsage::INDEX,
                mapped_at_creation: false,
            },
            mesh.index_bytes(),
        )?;
        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count() as u32,
        })
    }

    fn bind(&self, backend: &mut dyn GraphicsBackend) {
        backend.set_vertex_buffer(0, self.vertex_buffer, 0);
        backend.set_index_buffer(self.index_buffer, 0, IndexFormat::Uint32);
    }
}

struct LightSlot {
    buffer: BufferHandle,
    bind_group: BindGroupHandle,
}

/// The light accumulation renderer and its HDR target.
pub struct LightPass {
    texture: TextureHandle,
    view: TextureViewHandle,
    bind_group: BindGroupHandle,
    width: u32,
    height: u32,

    sphere: VolumeGeometry,
    cone: VolumeGeometry,
    point_slots: Vec<LightSlot>,
    spot_slots: Vec<LightSlot>,
}

impl LightPass {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        layouts: &SharedLayouts,
        width: u32,
        height: u32,
    ) -> BackendResult<Self> {
        let (texture, view, bind_group) =
            Self::create_target(backend, layouts.light_buffer_sample, width, height)?;

        let sphere = VolumeGeometry::upload(backend, &Mesh::unit_sphere(24, 16))?;
        let cone = VolumeGeometry::upload(backend, &Mesh::unit_cone(24))?;

        let make_slots = |backend: &mut dyn GraphicsBackend, count: usize, what: &str| {
            (0..count)
                .map(|i| {
                    let buffer = backend.create_buffer(&BufferDescriptor {
                        label: Some(format!("{what} light {i}")),
                        size: std::mem::size_of::<GpuVolumeLight>() as u64,
                        usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                        mapped_at_creation: false,
                    })?;
                    let bind_group = backend.create_bind_group(
                        layouts.volume_light,
                        &[(
                            0,
                            BindGroupEntry::Buffer {
                                buffer,
                                offset: 0,
                                size: None,
                            },
                        )],
                    )?;
                    Ok(LightSlot { buffer, bind_group })
                })
                .collect::<BackendResult<Vec<_>>>()
        };

        Ok(Self {
            texture,
            view,
            bind_group,
            width,
            height,
            sphere,
            cone,
            point_slots: make_slots(backend, MAX_POINT_LIGHTS, "point")?,
            spot_slots: make_slots(backend, MAX_SPOT_LIGHTS, "spot")?,
        })
    }

    fn create_target(
        backend: &mut dyn GraphicsBackend,
        layout: BindGroupLayoutHandle,
        width: u32,
        height: u32,
    ) -> BackendResult<(TextureHandle, TextureViewHandle, BindGroupHandle)> {
        let texture = backend.create_texture(&TextureDescriptor {
            label: Some("light buffer".to_string()),
            width,
            height,
            array_layers: 1,
            mip_levels: 1,
            format: LIGHT_BUFFER_FORMAT,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        })?;
        let view = backend.create_texture_view(texture, &TextureViewDescriptor::default())?;
        let bind_group =
            backend.create_bind_group(layout, &[(0, BindGroupEntry::Texture(view))])?;
        Ok((texture, view, bind_group))
    }

    pub fn resize(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        layouts: &SharedLayouts,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        backend.destroy_texture(self.texture);
        let (texture, view, bind_group) =
            Self::create_target(backend, layouts.light_buffer_sample, width, height)?;
        self.texture = texture;
        self.view = view;
        self.bind_group = bind_group;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn release(&self, backend: &mut dyn GraphicsBackend) {
        backend.destroy_texture(self.texture);
        backend.destroy_buffer(self.sphere.vertex_buffer);
        backend.destroy_buffer(self.sphere.index_buffer);
        backend.destroy_buffer(self.cone.vertex_buffer);
        backend.destroy_buffer(self.cone.index_buffer);
    }

    /// Sampling bind group for the composition pass.
    pub fn bind_group(&self) -> BindGroupHandle {
        self.bind_group
    }

    /// Run the full light accumulation sequence for the frame.
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &self,
        backend: &mut dyn GraphicsBackend,
        techniques: &Techniques,
        gbuffer: &GeometryBuffer,
        camera_bind_group: BindGroupHandle,
        ambient_bind_group: BindGroupHandle,
        shadow_bind_group: BindGroupHandle,
        lights: &SceneLights,
        assignments: &ShadowAssignments,
        frustum: &Frustum,
        profiler: &mut dyn FrameProfiler,
    ) {
        self.directional_pass(
            backend,
            techniques,
            gbuffer,
            camera_bind_group,
            ambient_bind_group,
            shadow_bind_group,
            profiler,
        );

        for (index, light) in lights.points().iter().enumerate() {
            if !light.enabled {
                continue;
            }
            // A volume fully outside the frustum contributes nothing:
            // neither marking nor lighting runs for it.
            let bounds = BoundingSphere::new(light.position, light.radius);
            if !frustum.intersects_sphere(&bounds) {
                continue;
            }

            let slot = &self.point_slots[index];
            let data = GpuVolumeLight::from_point(light, assignments.point_slot(index));
            backend.write_buffer(slot.buffer, 0, bytemuck::bytes_of(&data));

            self.volume_pass_pair(
                backend,
                techniques,
                gbuffer,
                camera_bind_group,
                shadow_bind_group,
                slot.bind_group,
                &self.sphere,
                techniques.point_light,
                POINT_LIGHT_PASS_LABEL,
                profiler,
            );
        }

        for (index, light) in lights.spots().iter().enumerate() {
            if !light.enabled {
                continue;
            }
            let bounds = BoundingSphere::new(
                light.bounding_sphere_center(),
                light.bounding_sphere_radius(),
            );
            if !frustum.intersects_sphere(&bounds) {
                continue;
            }

            let slot = &self.spot_slots[index];
            let data = GpuVolumeLight::from_spot(light, assignments.spot_layer(index));
            backend.write_buffer(slot.buffer, 0, bytemuck::bytes_of(&data));

            self.volume_pass_pair(
                backend,
                techniques,
                gbuffer,
                camera_bind_group,
                shadow_bind_group,
                slot.bind_group,
                &self.cone,
                techniques.spot_light,
                SPOT_LIGHT_PASS_LABEL,
                profiler,
            );
        }
    }

    /// Full-screen hemispheric + directional accumulation; clears the
    /// light buffer as it goes.
    #[allow(clippy::too_many_arguments)]
    fn directional_pass(
        &self,
        backend: &mut dyn GraphicsBackend,
        techniques: &Techniques,
        gbuffer: &GeometryBuffer,
        camera_bind_group: BindGroupHandle,
        ambient_bind_group: BindGroupHandle,
        shadow_bind_group: BindGroupHandle,
        profiler: &mut dyn FrameProfiler,
    ) {
        profiler.pass_begin(DIRECTIONAL_PASS_LABEL);

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some(DIRECTIONAL_PASS_LABEL.into()),
            color_attachments: vec![ColorAttachment {
                view: self.view,
                load_op: LoadOp::Clear([0.0, 0.0, 0.0, 0.0]),
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: None,
        });

        backend.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
        backend.set_render_pipeline(techniques.directional_light);
        backend.set_bind_group(0, camera_bind_group);
        backend.set_bind_group(1, ambient_bind_group);
        backend.set_bind_group(2, gbuffer.bind_group());
        backend.set_bind_group(3, shadow_bind_group);
        backend.draw(0..3, 0..1);
        profiler.draw_submitted(1);

        backend.end_render_pass();
        profiler.pass_end(DIRECTIONAL_PASS_LABEL);
    }

    /// The stencil-mark / lighting pass pair for one volume light.
    #[allow(clippy::too_many_arguments)]
    fn volume_pass_pair(
        &self,
        backend: &mut dyn GraphicsBackend,
        techniques: &Techniques,
        gbuffer: &GeometryBuffer,
        camera_bind_group: BindGroupHandle,
        shadow_bind_group: BindGroupHandle,
        light_bind_group: BindGroupHandle,
        geometry: &VolumeGeometry,
        light_pipeline: RenderPipelineHandle,
        light_label: &str,
        profiler: &mut dyn FrameProfiler,
    ) {
        // Pass 1: mark covered pixels; stencil cleared per light.
        profiler.pass_begin(STENCIL_MARK_PASS_LABEL);
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some(STENCIL_MARK_PASS_LABEL.into()),
            color_attachments: vec![ColorAttachment {
                view: self.view,
                load_op: LoadOp::Load,
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment::load_depth_clear_stencil(
                gbuffer.depth_stencil_view(),
            )),
        });
        backend.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
        backend.set_render_pipeline(techniques.stencil_mark);
        backend.set_bind_group(0, camera_bind_group);
        backend.set_bind_group(1, light_bind_group);
        geometry.bind(backend);
        backend.draw_indexed(0..geometry.index_count, 0, 0..1);
        profiler.draw_submitted(geometry.index_count / 3);
        backend.end_render_pass();
        profiler.pass_end(STENCIL_MARK_PASS_LABEL);

        // Pass 2: shade exactly the marked pixels.
        profiler.pass_begin(light_label);
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some(light_label.into()),
            color_attachments: vec![ColorAttachment {
                view: self.view,
                load_op: LoadOp::Load,
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment::load(
                gbuffer.depth_stencil_view(),
            )),
        });
        backend.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
        backend.set_render_pipeline(light_pipeline);
        backend.set_stencil_reference(0);
        backend.set_bind_group(0, camera_bind_group);
        backend.set_bind_group(1, light_bind_group);
        backend.set_bind_group(2, gbuffer.bind_group());
        backend.set_bind_group(3, shadow_bind_group);
        geometry.bind(backend);
        backend.draw_indexed(0..geometry.index_count, 0, 0..1);
        profiler.draw_submitted(geometry.index_count / 3);
        backend.end_render_pass();
        profiler.pass_end(light_label);
    }
}

/// Full-screen hemispheric + cascaded directional lighting.
pub const DIRECTIONAL_LIGHT_SHADER: &str = r#"
struct CameraUniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    view_proj: mat4x4<f32>,
    inv_view: mat4x4<f32>,
    inv_proj: mat4x4<f32>,
    position: vec4<f32>,
    near_far: vec4<f32>,
}

struct DirectionalLight {
    // xyz = direction, w = 1 when this light samples the cascade map
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

struct ShadowUniforms {
    world_to_shadow: mat4x4<f32>,
    to_cascade_offset_x: vec4<f32>,
    to_cascade_offset_y: vec4<f32>,
    to_cascade_scale: vec4<f32>,
    spot_matrices: array<mat4x4<f32>, 4>,
    point_matrices: array<mat4x4<f32>, 12>,
    // x = cascade count, y = map size, z = depth bias, w = poisson spread
    params: vec4<f32>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(1) @binding(0) var<uniform> scene_lights: AmbientDirectional;
@group(2) @binding(0) var gbuffer_albedo: texture_2d<f32>;
@group(2) @binding(1) var gbuffer_normal: texture_2d<f32>;
@group(2) @binding(2) var gbuffer_depth: texture_2d<f32>;
@group(2) @binding(3) var gbuffer_extra: texture_2d<f32>;
@group(3) @binding(0) var<uniform> shadow: ShadowUniforms;
@group(3) @binding(1) var cascade_maps: texture_depth_2d_array;
@group(3) @binding(4) var shadow_sampler: sampler_comparison;

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

const POISSON_DISC = array<vec2<f32>, 8>(
    vec2<f32>(-0.7071,  0.7071),
    vec2<f32>(-0.0000, -0.8750),
    vec2<f32>( 0.5303,  0.5303),
    vec2<f32>(-0.6250, -0.0000),
    vec2<f32>( 0.3536, -0.3536),
    vec2<f32>(-0.0000,  0.3750),
    vec2<f32>(-0.1768, -0.1768),
    vec2<f32>( 0.1250,  0.0000),
);

// Nearest cascade containing the point wins; past the last cascade the
// pixel is fully lit.
fn cascade_shadow(world_pos: vec3<f32>) -> f32 {
    let cascade_count = u32(shadow.params.x);
    if (cascade_count == 0u) {
        return 1.0;
    }

    let s = shadow.world_to_shadow * vec4<f32>(world_pos, 1.0);
    var cascade: i32 = -1;
    var cascade_pos = vec2<f32>(0.0, 0.0);
    for (var c = 0u; c < cascade_count; c = c + 1u) {
        let pos = s.xy * shadow.to_cascade_scale[c]
            + vec2<f32>(shadow.to_cascade_offset_x[c], shadow.to_cascade_offset_y[c]);
        if (abs(pos.x) <= 1.0 && abs(pos.y) <= 1.0) {
            cascade = i32(c);
            cascade_pos = pos;
            break;
        }
    }
    if (cascade < 0) {
        return 1.0;
    }

    let uv = vec2<f32>(cascade_pos.x * 0.5 + 0.5, 0.5 - cascade_pos.y * 0.5);
    let reference = s.z - shadow.params.z;
    let spread = shadow.params.w / shadow.params.y;

    var sum = 0.0;
    for (var i = 0u; i < 8u; i = i + 1u) {
        sum = sum + textureSampleCompareLevel(
            cascade_maps,
            shadow_sampler,
            uv + POISSON_DISC[i] * spread,
            cascade,
            reference,
        );
    }
    return sum / 8.0;
}

fn luminance(color: vec3<f32>) -> f32 {
    return dot(color, vec3<f32>(0.2126, 0.7152, 0.0722));
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let pixel = vec2<i32>(input.position.xy);
    let depth = textureLoad(gbuffer_depth, pixel, 0).r;
    if (depth >= 1.0) {
        return vec4<f32>(0.0, 0.0, 0.0, 0.0);
    }

    let normal_sample = textureLoad(gbuffer_normal, pixel, 0);
    let n = normalize(normal_sample.xyz * 2.0 - 1.0);
    let spec_intensity = normal_sample.w;
    let extra = textureLoad(gbuffer_extra, pixel, 0);
    let spec_power = max(extra.a * 256.0, 1.0);

    let world_pos = reconstruct_world_position(input.uv, depth);
    let view_dir = normalize(camera.position.xyz - world_pos);

    var diffuse = vec3<f32>(0.0, 0.0, 0.0);
    if (scene_lights.hemisphere_sky.w > 0.5) {
        let up_amount = n.y * 0.5 + 0.5;
        diffuse = mix(
            scene_lights.hemisphere_ground.rgb,
            scene_lights.hemisphere_sky.rgb,
            up_amount,
        );
    }

    var specular = 0.0;
    let count = u32(scene_lights.counts.x);
    for (var i = 0u; i < count; i = i + 1u) {
        let light = scene_lights.lights[i];
        let light_dir = -normalize(light.direction.xyz);
        let ndotl = max(dot(n, light_dir), 0.0);
        if (ndotl <= 0.0) {
            continue;
        }

        var visibility = 1.0;
        if (light.direction.w > 0.5) {
            visibility = cascade_shadow(world_pos);
        }

        let half_vec = normalize(light_dir + view_dir);
        let ndoth = max(dot(n, half_vec), 0.0);
        diffuse = diffuse + light.diffuse.rgb * (ndotl * visibility);
        specular = specular
            + pow(ndoth, spec_power) * spec_intensity * luminance(light.specular.rgb) * visibility;
    }

    return vec4<f32>(diffuse, specular);
}
"#;

/// Volume vertex transform shared by the stencil and lighting passes; the
/// marking variant has an empty fragment stage (color writes are masked).
pub const STENCIL_MARK_SHADER: &str = r#"
struct CameraUniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    view_proj: mat4x4<f32>,
    inv_view: mat4x4<f32>,
    inv_proj: mat4x4<f32>,
    position: vec4<f32>,
    near_far: vec4<f32>,
}

struct VolumeLight {
    volume: mat4x4<f32>,
    position_range: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    direction_angle: vec4<f32>,
    params: vec4<f32>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(1) @binding(0) var<uniform> light: VolumeLight;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return camera.view_proj * light.volume * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.0, 0.0, 0.0, 0.0);
}
"#;

/// Point-light volume shading.
pub const POINT_LIGHT_SHADER: &str = r#"
struct CameraUniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    view_proj: mat4x4<f32>,
    inv_view: mat4x4<f32>,
    inv_proj: mat4x4<f32>,
    position: vec4<f32>,
    near_far: vec4<f32>,
}

struct VolumeLight {
    volume: mat4x4<f32>,
    // xyz = position, w = radius
    position_range: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    direction_angle: vec4<f32>,
    // x = kind, y = shadow slot (-1 none), z = cos inner angle
    params: vec4<f32>,
}

struct ShadowUniforms {
    world_to_shadow: mat4x4<f32>,
    to_cascade_offset_x: vec4<f32>,
    to_cascade_offset_y: vec4<f32>,
    to_cascade_scale: vec4<f32>,
    spot_matrices: array<mat4x4<f32>, 4>,
    point_matrices: array<mat4x4<f32>, 12>,
    params: vec4<f32>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(1) @binding(0) var<uniform> light: VolumeLight;
@group(2) @binding(0) var gbuffer_albedo: texture_2d<f32>;
@group(2) @binding(1) var gbuffer_normal: texture_2d<f32>;
@group(2) @binding(2) var gbuffer_depth: texture_2d<f32>;
@group(2) @binding(3) var gbuffer_extra: texture_2d<f32>;
@group(3) @binding(0) var<uniform> shadow: ShadowUniforms;
@group(3) @binding(3) var point_maps: texture_depth_2d_array;
@group(3) @binding(4) var shadow_sampler: sampler_comparison;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return camera.view_proj * light.volume * vec4<f32>(position, 1.0);
}

fn reconstruct_world_position(frag_coord: vec2<f32>, depth: f32) -> vec3<f32> {
    let dims = vec2<f32>(textureDimensions(gbuffer_depth));
    let uv = frag_coord / dims;
    let ndc = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, depth, 1.0);
    let world = camera.inv_view * camera.inv_proj * ndc;
    return world.xyz / world.w;
}

// Face selection matches the CPU-side render order:
// +X, -X, +Y, -Y, +Z, -Z by dominant axis.
fn point_shadow(world_pos: vec3<f32>, to_light: vec3<f32>, slot: i32) -> f32 {
    let dir = -to_light;
    let a = abs(dir);
    var face: i32;
    if (a.x >= a.y && a.x >= a.z) {
        face = select(1, 0, dir.x >= 0.0);
    } else if (a.y >= a.z) {
        face = select(3, 2, dir.y >= 0.0);
    } else {
        face = select(5, 4, dir.z >= 0.0);
    }

    let index = slot * 6 + face;
    let p = shadow.point_matrices[index] * vec4<f32>(world_pos, 1.0);
    let proj = p.xyz / p.w;
    if (proj.z <= 0.0 || proj.z >= 1.0) {
        return 1.0;
    }
    let uv = vec2<f32>(proj.x * 0.5 + 0.5, 0.5 - proj.y * 0.5);
    return textureSampleCompareLevel(
        point_maps,
        shadow_sampler,
        uv,
        index,
        proj.z - shadow.params.z,
    );
}

fn luminance(color: vec3<f32>) -> f32 {
    return dot(color, vec3<f32>(0.2126, 0.7152, 0.0722));
}

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    let pixel = vec2<i32>(frag_coord.xy);
    let depth = textureLoad(gbuffer_depth, pixel, 0).r;
    if (depth >= 1.0) {
        return vec4<f32>(0.0, 0.0, 0.0, 0.0);
    }

    let normal_sample = textureLoad(gbuffer_normal, pixel, 0);
    let n = normalize(normal_sample.xyz * 2.0 - 1.0);
    let spec_intensity = normal_sample.w;
    let extra = textureLoad(gbuffer_extra, pixel, 0);
    let spec_power = max(extra.a * 256.0, 1.0);

    let world_pos = reconstruct_world_position(frag_coord.xy, depth);
    let view_dir = normalize(camera.position.xyz - world_pos);

    let to_light = light.position_range.xyz - world_pos;
    let dist = length(to_light);
    let radius = light.position_range.w;
    if (dist >= radius) {
        return vec4<f32>(0.0, 0.0, 0.0, 0.0);
    }

    let light_dir = to_light / dist;
    var attenuation = clamp(1.0 - dist / radius, 0.0, 1.0);
    attenuation = attenuation * attenuation;

    let ndotl = max(dot(n, light_dir), 0.0);
    if (ndotl <= 0.0) {
        return vec4<f32>(0.0, 0.0, 0.0, 0.0);
    }

    var visibility = 1.0;
    let slot = i32(light.params.y);
    if (slot >= 0) {
        visibility = point_shadow(world_pos, to_light, slot);
    }

    let half_vec = normalize(light_dir + view_dir);
    let ndoth = max(dot(n, half_vec), 0.0);
    let specular = pow(ndoth, spec_power) * spec_intensity * luminance(light.specular.rgb);

    let factor = ndotl * attenuation * visibility;
    return vec4<f32>(light.diffuse.rgb * factor, specular * attenuation * visibility);
}
"#;

/// Spot-light volume shading.
pub const SPOT_LIGHT_SHADER: &str = r#"
struct CameraUniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    view_proj: mat4x4<f32>,
    inv_view: mat4x4<f32>,
    inv_proj: mat4x4<f32>,
    position: vec4<f32>,
    near_far: vec4<f32>,
}

struct VolumeLight {
    volume: mat4x4<f32>,
    position_range: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    // xyz = direction, w = cos outer angle
    direction_angle: vec4<f32>,
    // x = kind, y = shadow layer (-1 none), z = cos inner angle
    params: vec4<f32>,
}

struct ShadowUniforms {
    world_to_shadow: mat4x4<f32>,
    to_cascade_offset_x: vec4<f32>,
    to_cascade_offset_y: vec4<f32>,
    to_cascade_scale: vec4<f32>,
    spot_matrices: array<mat4x4<f32>, 4>,
    point_matrices: array<mat4x4<f32>, 12>,
    params: vec4<f32>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(1) @binding(0) var<uniform> light: VolumeLight;
@group(2) @binding(0) var gbuffer_albedo: texture_2d<f32>;
@group(2) @binding(1) var gbuffer_normal: texture_2d<f32>;
@group(2) @binding(2) var gbuffer_depth: texture_2d<f32>;
@group(2) @binding(3) var gbuffer_extra: texture_2d<f32>;
@group(3) @binding(0) var<uniform> shadow: ShadowUniforms;
@group(3) @binding(2) var spot_maps: texture_depth_2d_array;
@group(3) @binding(4) var shadow_sampler: sampler_comparison;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return camera.view_proj * light.volume * vec4<f32>(position, 1.0);
}

fn reconstruct_world_position(frag_coord: vec2<f32>, depth: f32) -> vec3<f32> {
    let dims = vec2<f32>(textureDimensions(gbuffer_depth));
    let uv = frag_coord / dims;
    let ndc = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, depth, 1.0);
    let world = camera.inv_view * camera.inv_proj * ndc;
    return world.xyz / world.w;
}

fn spot_shadow(world_pos: vec3<f32>, layer: i32) -> f32 {
    let p = shadow.spot_matrices[layer] * vec4<f32>(world_pos, 1.0);
    let proj = p.xyz / p.w;
    if (proj.z <= 0.0 || proj.z >= 1.0) {
        return 1.0;
    }
    let uv = vec2<f32>(proj.x * 0.5 + 0.5, 0.5 - proj.y * 0.5);
    if (uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0) {
        return 1.0;
    }
    return textureSampleCompareLevel(
        spot_maps,
        shadow_sampler,
        uv,
        layer,
        proj.z - shadow.params.z,
    );
}

fn luminance(color: vec3<f32>) -> f32 {
    return dot(color, vec3<f32>(0.2126, 0.7152, 0.0722));
}

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    let pixel = vec2<i32>(frag_coord.xy);
    let depth = textureLoad(gbuffer_depth, pixel, 0).r;
    if (depth >= 1.0) {
        return vec4<f32>(0.0, 0.0, 0.0, 0.0);
    }

    let normal_sample = textureLoad(gbuffer_normal, pixel, 0);
    let n = normalize(normal_sample.xyz * 2.0 - 1.0);
    let spec_intensity = normal_sample.w;
    let extra = textureLoad(gbuffer_extra, pixel, 0);
    let spec_power = max(extra.a * 256.0, 1.0);

    let world_pos = reconstruct_world_position(frag_coord.xy, depth);
    let view_dir = normalize(camera.position.xyz - world_pos);

    let to_light = light.position_range.xyz - world_pos;
    let dist = length(to_light);
    let radius = light.position_range.w;
    if (dist >= radius) {
        return vec4<f32>(0.0, 0.0, 0.0, 0.0);
    }

    let light_dir = to_light / dist;
    var attenuation = clamp(1.0 - dist / radius, 0.0, 1.0);
    attenuation = attenuation * attenuation;

    // Cone falloff between the inner and outer angles.
    let spot_dir = normalize(light.direction_angle.xyz);
    let cos_angle = dot(-light_dir, spot_dir);
    let outer = light.direction_angle.w;
    let inner = light.params.z;
    let cone = clamp((cos_angle - outer) / max(inner - outer, 1e-4), 0.0, 1.0);
    attenuation = attenuation * cone * cone;

    let ndotl = max(dot(n, light_dir), 0.0);
    if (ndotl <= 0.0 || attenuation <= 0.0) {
        return vec4<f32>(0.0, 0.0, 0.0, 0.0);
    }

    var visibility = 1.0;
    let layer = i32(light.params.y);
    if (layer >= 0) {
        visibility = spot_shadow(world_pos, layer);
    }

    let half_vec = normalize(light_dir + view_dir);
    let ndoth = max(dot(n, half_vec), 0.0);
    let specular = pow(ndoth, spec_power) * spec_intensity * luminance(light.specular.rgb);

    let factor = ndotl * attenuation * visibility;
    return vec4<f32>(light.diffuse.rgb * factor, specular * attenuation * visibility);
}
"#;
