//! Top-level per-frame orchestrator.
//!
//! Drives the pass sequence in strict program order, each stage gated on
//! whether it has anything to draw:
//!
//! `Start -> ShadowPrep -> ShadowCull -> ShadowDraw? -> DeferredCull ->
//!  GBuffer -> Lights -> Compose -> Forward -> End`
//!
//! - shadow passes run only when a shadow-casting light exists and at
//!   least one opaque drawable survived culling; otherwise the shadow map
//!   stays unbound and every cascade lookup short-circuits to fully lit;
//! - G-buffer, light accumulation, and composition run only when at least
//!   one visible drawable is deferred-enabled;
//! - the forward pass always runs last, straight to the backbuffer, so
//!   blending composes against the finished opaque scene.
//!
//! Pass ordering is the only synchronization: every target has exactly one
//! writer pass per frame, and submission order makes writes visible to the
//! passes that sample them.

use crate::backend::traits::*;
use crate::pipeline::{
    ComposePass, ForwardPass, GeometryBuffer, GeometryPass, LightPass, ShadowAssignments,
    ShadowPass, Techniques,
};
use crate::profiling::{FrameProfiler, NullProfiler};
use crate::scene::{Drawable, GpuAmbientDirectional, Scene};
use crate::shadow::{
    point_light_face_matrix, spot_light_matrix, ShadowConfig, ShadowMapCascadeSet, ShadowMaps,
    ShadowUniform, MAX_SHADOWED_POINT, MAX_SHADOWED_SPOT,
};
use crate::RendererConfig;

/// The deferred scene renderer: technique pool, render targets, shadow
/// subsystem, and the per-frame pass driver.
pub struct SceneRenderer {
    techniques: Techniques,
    gbuffer: GeometryBuffer,
    light_pass: LightPass,
    compose_pass: ComposePass,
    shadow_pass: ShadowPass,
    shadow_maps: ShadowMaps,
    cascades: ShadowMapCascadeSet,
    shadow_config: ShadowConfig,

    camera_buffer: BufferHandle,
    camera_bind_group: BindGroupHandle,
    ambient_buffer: BufferHandle,
    ambient_bind_group: BindGroupHandle,
    shadow_uniform_buffer: BufferHandle,
    shadow_bind_group: BindGroupHandle,
}

impl SceneRenderer {
    /// Build every technique, target, and shadow resource. Any failure
    /// here is fatal: the renderer does not run partially initialized.
    pub fn new(backend: &mut dyn GraphicsBackend, config: &RendererConfig) -> BackendResult<Self> {
        let techniques = Techniques::create(backend)?;
        let (width, height) = backend.surface_size();

        let gbuffer =
            GeometryBuffer::create(backend, techniques.layouts.gbuffer_sample, width, height)?;
        let light_pass = LightPass::new(backend, &techniques.layouts, width, height)?;
        let compose_pass = ComposePass::new(backend, techniques.layouts.compose)?;
        let shadow_pass = ShadowPass::new(backend, techniques.layouts.shadow_cast)?;
        let shadow_maps = ShadowMaps::create(backend, &config.shadow)?;
        let cascades = ShadowMapCascadeSet::new(&config.shadow);

        let uniform_buffer = |backend: &mut dyn GraphicsBackend, label: &str, size: u64| {
            backend.create_buffer(&crate::backend::types::BufferDescriptor {
                label: Some(label.to_string()),
                size,
                usage: crate::backend::types::BufferUsage::UNIFORM
                    | crate::backend::types::BufferUsage::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let single_uniform_group =
            |backend: &mut dyn GraphicsBackend, layout: BindGroupLayoutHandle, buffer| {
                backend.create_bind_group(
                    layout,
                    &[(
                        0,
                        BindGroupEntry::Buffer {
                            buffer,
                            offset: 0,
                            size: None,
                        },
                    )],
                )
            };

        let camera_buffer = uniform_buffer(
            backend,
            "camera uniforms",
            std::mem::size_of::<crate::scene::CameraUniformData>() as u64,
        )?;
        let camera_bind_group =
            single_uniform_group(backend, techniques.layouts.camera, camera_buffer)?;

        let ambient_buffer = uniform_buffer(
            backend,
            "ambient directional uniforms",
            std::mem::size_of::<GpuAmbientDirectional>() as u64,
        )?;
        let ambient_bind_group =
            single_uniform_group(backend, techniques.layouts.ambient_directional, ambient_buffer)?;

        let shadow_uniform_buffer = uniform_buffer(
            backend,
            "shadow uniforms",
            std::mem::size_of::<ShadowUniform>() as u64,
        )?;
        let shadow_bind_group = backend.create_bind_group(
            techniques.layouts.shadow_sample,
            &[
                (
                    0,
                    BindGroupEntry::Buffer {
                        buffer: shadow_uniform_buffer,
                        offset: 0,
                        size: None,
                    },
                ),
                (1, BindGroupEntry::Texture(shadow_maps.cascades.array_view())),
                (2, BindGroupEntry::Texture(shadow_maps.spots.array_view())),
                (3, BindGroupEntry::Texture(shadow_maps.points.array_view())),
                (4, BindGroupEntry::Sampler(shadow_maps.comparison_sampler)),
            ],
        )?;

        Ok(Self {
            techniques,
            gbuffer,
            light_pass,
            compose_pass,
            shadow_pass,
            shadow_maps,
            cascades,
            shadow_config: config.shadow.clone(),
            camera_buffer,
            camera_bind_group,
            ambient_buffer,
            ambient_bind_group,
            shadow_uniform_buffer,
            shadow_bind_group,
        })
    }

    /// Shared bind-group layouts, needed by [`crate::scene::Model::upload`].
    pub fn layouts(&self) -> &crate::pipeline::SharedLayouts {
        &self.techniques.layouts
    }

    pub fn cascades(&self) -> &ShadowMapCascadeSet {
        &self.cascades
    }

    pub fn cascades_mut(&mut self) -> &mut ShadowMapCascadeSet {
        &mut self.cascades
    }

    /// Background color used when compositing and when the forward pass
    /// clears the backbuffer itself.
    pub fn set_background(&mut self, color: glam::Vec3) {
        self.compose_pass.background = color;
    }

    /// Recreate viewport-sized targets. Must be called between frames,
    /// never while one is being recorded.
    pub fn resize(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        self.gbuffer
            .resize(backend, self.techniques.layouts.gbuffer_sample, width, height)?;
        self.light_pass
            .resize(backend, &self.techniques.layouts, width, height)?;
        Ok(())
    }

    /// Deterministic teardown of GPU resources.
    pub fn release(&self, backend: &mut dyn GraphicsBackend) {
        self.gbuffer.release(backend);
        self.light_pass.release(backend);
        self.shadow_maps.release(backend);
        backend.destroy_buffer(self.camera_buffer);
        backend.destroy_buffer(self.ambient_buffer);
        backend.destroy_buffer(self.shadow_uniform_buffer);
    }

    /// Render one frame without instrumentation.
    pub fn draw(&mut self, backend: &mut dyn GraphicsBackend, scene: &Scene, frame: &FrameContext) {
        let mut profiler = NullProfiler;
        self.draw_instrumented(backend, scene, frame, &mut profiler);
    }

    /// Render one frame, reporting pass boundaries and draws to the
    /// injected collector.
    pub fn draw_instrumented(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        scene: &Scene,
        frame: &FrameContext,
        profiler: &mut dyn FrameProfiler,
    ) {
        profiler.frame_begin();

        let camera = &scene.camera;
        let view = camera.view_matrix();
        let proj = camera.projection_matrix();
        let eye = camera.position;
        let frustum = camera.frustum();

        backend.write_buffer(
            self.camera_buffer,
            0,
            bytemuck::bytes_of(&camera.uniform_data()),
        );

        // DeferredCull: visible, ready drawables split by capability.
        let visible = scene.cull_test(&frustum);
        let opaque: Vec<&dyn Drawable> = visible.iter().copied().filter(|d| d.opaque()).collect();
        let deferred: Vec<&dyn Drawable> =
            visible.iter().copied().filter(|d| d.deferred()).collect();
        let forward: Vec<&dyn Drawable> =
            visible.iter().copied().filter(|d| !d.deferred()).collect();

        // ShadowPrep / ShadowDraw.
        let mut shadow_uniform = ShadowUniform::unbound(&self.shadow_config);
        let mut assignments = ShadowAssignments::default();
        let mut shadowed_directional = None;
        let mut shadows_bound = false;

        if scene.lights.any_shadow_caster() && !opaque.is_empty() {
            // ShadowCull: casters are not view-frustum culled.
            let casters = scene.shadow_cull();
            let directional_index = scene
                .lights
                .directionals()
                .iter()
                .position(|l| l.enabled && l.cast_shadows);

            if let Some(index) = directional_index {
                let direction = scene.lights.directionals()[index].direction;
                self.cascades.update(camera, direction, &scene.volume);
                self.shadow_pass.render_cascades(
                    backend,
                    &self.techniques,
                    &self.shadow_maps,
                    &self.cascades,
                    &casters,
                    profiler,
                );
                shadow_uniform.set_cascades(
                    self.cascades.total_cascades(),
                    self.cascades.world_to_shadow(),
                    self.cascades.to_cascade_offset_x(),
                    self.cascades.to_cascade_offset_y(),
                    self.cascades.to_cascade_scale(),
                );
                shadowed_directional = Some(index);
                shadows_bound = true;
            }

            let mut next_spot_layer = 0usize;
            for (index, light) in scene.lights.spots().iter().enumerate() {
                if !light.enabled || !light.cast_shadows {
                    continue;
                }
                if next_spot_layer >= MAX_SHADOWED_SPOT {
                    log::debug!("spot shadow budget exhausted; light {index} renders unshadowed");
                    break;
                }
                let matrix = spot_light_matrix(light);
                self.shadow_pass.render_spot(
                    backend,
                    &self.techniques,
                    &self.shadow_maps,
                    next_spot_layer,
                    matrix,
                    &casters,
                    profiler,
                );
                shadow_uniform.set_spot_matrix(next_spot_layer, matrix);
                assignments.spot.push((index, next_spot_layer));
                next_spot_layer += 1;
            }

            let mut next_point_slot = 0usize;
            for (index, light) in scene.lights.points().iter().enumerate() {
                if !light.enabled || !light.cast_shadows {
                    continue;
                }
                if next_point_slot >= MAX_SHADOWED_POINT {
                    log::debug!("point shadow budget exhausted; light {index} renders unshadowed");
                    break;
                }
                self.shadow_pass.render_point(
                    backend,
                    &self.techniques,
                    &self.shadow_maps,
                    next_point_slot,
                    light,
                    &casters,
                    profiler,
                );
                for face in 0..6 {
                    shadow_uniform.set_point_matrix(
                        next_point_slot,
                        face,
                        point_light_face_matrix(light, face),
                    );
                }
                assignments.point.push((index, next_point_slot));
                next_point_slot += 1;
            }
        }

        backend.write_buffer(
            self.shadow_uniform_buffer,
            0,
            bytemuck::bytes_of(&shadow_uniform),
        );
        backend.write_buffer(
            self.ambient_buffer,
            0,
            bytemuck::bytes_of(&GpuAmbientDirectional::pack(
                &scene.lights,
                shadowed_directional,
            )),
        );

        // GBuffer -> Lights -> Compose, gated on deferred content.
        let deferred_ran = !deferred.is_empty();
        if deferred_ran {
            GeometryPass::execute(
                backend,
                &self.techniques,
                &self.gbuffer,
                self.camera_bind_group,
                view,
                proj,
                eye,
                &frustum,
                &scene.lights,
                &deferred,
                profiler,
            );

            self.light_pass.execute(
                backend,
                &self.techniques,
                &self.gbuffer,
                self.camera_bind_group,
                self.ambient_bind_group,
                self.shadow_bind_group,
                &scene.lights,
                &assignments,
                &frustum,
                profiler,
            );

            let (width, height) = self.gbuffer.size();
            self.compose_pass.execute(
                backend,
                &self.techniques,
                &self.gbuffer,
                self.light_pass.bind_group(),
                self.camera_bind_group,
                frame.swapchain_view,
                &scene.lights.fog,
                width,
                height,
                profiler,
            );
        }

        // Forward pass, always last. When nothing was composited it also
        // clears the backbuffer and depth.
        ForwardPass::execute(
            backend,
            &self.techniques,
            &self.gbuffer,
            frame.swapchain_view,
            self.camera_bind_group,
            self.ambient_bind_group,
            !deferred_ran,
            self.compose_pass.background.extend(1.0),
            view,
            proj,
            eye,
            &frustum,
            &scene.lights,
            shadows_bound,
            &forward,
            profiler,
        );

        profiler.frame_end();
    }
}
