//! Renderer-owned technique pool.
//!
//! Every pipeline and shared bind-group layout the pass sequence needs is
//! created here, once, at renderer construction. A shader or pipeline that
//! fails to build aborts initialization; the renderer never runs with a
//! partially loaded technique set.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::compose_pass::COMPOSE_SHADER;
use crate::pipeline::forward_pass::FORWARD_SHADER;
use crate::pipeline::gbuffer::*;
use crate::pipeline::geometry_pass::GEOMETRY_SHADER;
use crate::pipeline::light_pass::{
    DIRECTIONAL_LIGHT_SHADER, LIGHT_BUFFER_FORMAT, POINT_LIGHT_SHADER, SPOT_LIGHT_SHADER,
    STENCIL_MARK_SHADER,
};
use crate::pipeline::shadow_pass::SHADOW_DEPTH_SHADER;

/// Bind-group layouts shared between passes and drawables.
pub struct SharedLayouts {
    pub camera: BindGroupLayoutHandle,
    pub object: BindGroupLayoutHandle,
    pub material: BindGroupLayoutHandle,
    pub gbuffer_sample: BindGroupLayoutHandle,
    pub ambient_directional: BindGroupLayoutHandle,
    pub volume_light: BindGroupLayoutHandle,
    pub shadow_sample: BindGroupLayoutHandle,
    pub shadow_cast: BindGroupLayoutHandle,
    pub compose: BindGroupLayoutHandle,
    pub light_buffer_sample: BindGroupLayoutHandle,
}

impl SharedLayouts {
    fn create(backend: &mut dyn GraphicsBackend) -> BackendResult<Self> {
        let uniform = |visibility| BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: BindingType::UniformBuffer,
        };
        let texture = |binding| BindGroupLayoutEntry {
            binding,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: TextureSampleType::Float { filterable: false },
                view_dimension: TextureViewDimension::D2,
            },
        };
        let depth_array = |binding| BindGroupLayoutEntry {
            binding,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: TextureSampleType::Depth,
                view_dimension: TextureViewDimension::D2Array,
            },
        };

        Ok(Self {
            camera: backend
                .create_bind_group_layout(&[uniform(ShaderStageFlags::VERTEX_FRAGMENT)])?,
            object: backend.create_bind_group_layout(&[uniform(ShaderStageFlags::VERTEX)])?,
            material: backend.create_bind_group_layout(&[uniform(ShaderStageFlags::FRAGMENT)])?,
            gbuffer_sample: backend
                .create_bind_group_layout(&[texture(0), texture(1), texture(2), texture(3)])?,
            ambient_directional: backend
                .create_bind_group_layout(&[uniform(ShaderStageFlags::FRAGMENT)])?,
            volume_light: backend
                .create_bind_group_layout(&[uniform(ShaderStageFlags::VERTEX_FRAGMENT)])?,
            shadow_sample: backend.create_bind_group_layout(&[
                uniform(ShaderStageFlags::FRAGMENT),
                depth_array(1),
                depth_array(2),
                depth_array(3),
                BindGroupLayoutEntry {
                    binding: 4,
                    visibility: ShaderStageFlags::FRAGMENT,
                    ty: BindingType::Sampler { comparison: true },
                },
            ])?,
            shadow_cast: backend.create_bind_group_layout(&[uniform(ShaderStageFlags::VERTEX)])?,
            compose: backend.create_bind_group_layout(&[uniform(ShaderStageFlags::FRAGMENT)])?,
            light_buffer_sample: backend.create_bind_group_layout(&[texture(0)])?,
        })
    }
}

/// The named pipelines of the deferred pass sequence.
pub struct Techniques {
    pub layouts: SharedLayouts,
    pub geometry: RenderPipelineHandle,
    pub shadow_depth: RenderPipelineHandle,
    pub directional_light: RenderPipelineHandle,
    pub stencil_mark: RenderPipelineHandle,
    pub point_light: RenderPipelineHandle,
    pub spot_light: RenderPipelineHandle,
    pub compose: RenderPipelineHandle,
    pub forward: RenderPipelineHandle,
}

impl Techniques {
    pub fn create(backend: &mut dyn GraphicsBackend) -> BackendResult<Self> {
        let layouts = SharedLayouts::create(backend)?;
        let swapchain_format = backend.swapchain_format();

        let geometry = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("geometry technique".into()),
            shader: GEOMETRY_SHADER.into(),
            vertex_entry: "vs_main".into(),
            fragment_entry: Some("fs_main".into()),
            vertex_layouts: vec![Vertex::layout()],
            bind_group_layouts: vec![layouts.camera, layouts.object, layouts.material],
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::Back,
            depth_stencil: Some(DepthStencilState::depth(
                GBUFFER_DEPTH_STENCIL_FORMAT,
                true,
                CompareFunction::Less,
            )),
            color_targets: vec![
                ColorTargetState::opaque(GBUFFER_ALBEDO_FORMAT),
                ColorTargetState::opaque(GBUFFER_NORMAL_FORMAT),
                ColorTargetState::opaque(GBUFFER_DEPTH_FORMAT),
                ColorTargetState::opaque(GBUFFER_EXTRA_FORMAT),
            ],
        })?;

        let shadow_depth = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("shadow depth technique".into()),
            shader: SHADOW_DEPTH_SHADER.into(),
            vertex_entry: "vs_main".into(),
            fragment_entry: None,
            vertex_layouts: vec![Vertex::position_only_layout()],
            bind_group_layouts: vec![layouts.shadow_cast, layouts.object],
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::Back,
            depth_stencil: Some(DepthStencilState::depth(
                TextureFormat::Depth32Float,
                true,
                CompareFunction::Less,
            )),
            color_targets: vec![],
        })?;

        let directional_light = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("directional light technique".into()),
            shader: DIRECTIONAL_LIGHT_SHADER.into(),
            vertex_entry: "vs_main".into(),
            fragment_entry: Some("fs_main".into()),
            vertex_layouts: vec![],
            bind_group_layouts: vec![
                layouts.camera,
                layouts.ambient_directional,
                layouts.gbuffer_sample,
                layouts.shadow_sample,
            ],
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::None,
            depth_stencil: None,
            color_targets: vec![ColorTargetState::opaque(LIGHT_BUFFER_FORMAT)],
        })?;

        // Stencil marking: both faces rasterize, depth test only. A front
        // face failing depth decrements, a back face failing depth
        // increments, so pixels whose geometry lies inside the volume end
        // up non-zero.
        let mark_face = |depth_fail_op| StencilFaceState {
            compare: CompareFunction::Always,
            fail_op: StencilOperation::Keep,
            depth_fail_op,
            pass_op: StencilOperation::Keep,
        };
        let stencil_mark = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("stencil mark technique".into()),
            shader: STENCIL_MARK_SHADER.into(),
            vertex_entry: "vs_main".into(),
            fragment_entry: Some("fs_main".into()),
            vertex_layouts: vec![Vertex::position_only_layout()],
            bind_group_layouts: vec![layouts.camera, layouts.volume_light],
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::None,
            depth_stencil: Some(DepthStencilState {
                format: GBUFFER_DEPTH_STENCIL_FORMAT,
                depth_write_enabled: false,
                depth_compare: CompareFunction::LessEqual,
                stencil: StencilState {
                    front: mark_face(StencilOperation::DecrementWrap),
                    back: mark_face(StencilOperation::IncrementWrap),
                    read_mask: 0xFF,
                    write_mask: 0xFF,
                },
            }),
            color_targets: vec![ColorTargetState {
                format: LIGHT_BUFFER_FORMAT,
                blend: None,
                write_mask: ColorWrites::NONE,
            }],
        })?;

        // Lighting from inside the volume: back faces only, guaranteeing
        // one fragment per covered pixel even with the eye inside, gated
        // on the stencil left by the marking pass.
        let lit_face = StencilFaceState {
            compare: CompareFunction::NotEqual,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::Keep,
            pass_op: StencilOperation::Keep,
        };
        let volume_light_pipeline = |backend: &mut dyn GraphicsBackend,
                                     label: &str,
                                     shader: &str|
         -> BackendResult<RenderPipelineHandle> {
            backend.create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(label.into()),
                shader: shader.into(),
                vertex_entry: "vs_main".into(),
                fragment_entry: Some("fs_main".into()),
                vertex_layouts: vec![Vertex::position_only_layout()],
                bind_group_layouts: vec![
                    layouts.camera,
                    layouts.volume_light,
                    layouts.gbuffer_sample,
                    layouts.shadow_sample,
                ],
                primitive_topology: PrimitiveTopology::TriangleList,
                front_face: FrontFace::Ccw,
                cull_mode: CullMode::Front,
                depth_stencil: Some(DepthStencilState {
                    format: GBUFFER_DEPTH_STENCIL_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: CompareFunction::Always,
                    stencil: StencilState {
                        front: lit_face,
                        back: lit_face,
                        read_mask: 0xFF,
                        write_mask: 0,
                    },
                }),
                color_targets: vec![ColorTargetState {
                    format: LIGHT_BUFFER_FORMAT,
                    blend: Some(BlendState::additive()),
                    write_mask: ColorWrites::ALL,
                }],
            })
        };
        let point_light = volume_light_pipeline(backend, "point light technique", POINT_LIGHT_SHADER)?;
        let spot_light = volume_light_pipeline(backend, "spot light technique", SPOT_LIGHT_SHADER)?;

        let compose = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("compose technique".into()),
            shader: COMPOSE_SHADER.into(),
            vertex_entry: "vs_main".into(),
            fragment_entry: Some("fs_main".into()),
            vertex_layouts: vec![],
            bind_group_layouts: vec![
                layouts.camera,
                layouts.compose,
                layouts.gbuffer_sample,
                layouts.light_buffer_sample,
            ],
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::None,
            depth_stencil: None,
            color_targets: vec![ColorTargetState::opaque(swapchain_format)],
        })?;

        let forward = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("forward technique".into()),
            shader: FORWARD_SHADER.into(),
            vertex_entry: "vs_main".into(),
            fragment_entry: Some("fs_main".into()),
            vertex_layouts: vec![Vertex::layout()],
            bind_group_layouts: vec![
                layouts.camera,
                layouts.object,
                layouts.material,
                layouts.ambient_directional,
            ],
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::Back,
            depth_stencil: Some(DepthStencilState::depth(
                GBUFFER_DEPTH_STENCIL_FORMAT,
                true,
                CompareFunction::LessEqual,
            )),
            color_targets: vec![ColorTargetState {
                format: swapchain_format,
                blend: Some(BlendState::alpha_blending()),
                write_mask: ColorWrites::ALL,
            }],
        })?;

        Ok(Self {
            layouts,
            geometry,
            shadow_depth,
            directional_light,
            stencil_mark,
            point_light,
            spot_light,
            compose,
            forward,
        })
    }
}
