//! Application-facing assembly: backend, scene, and renderer wired
//! together with resize handling serialized between frames.

use crate::backend::traits::*;
use crate::backend::WgpuBackend;
use crate::profiling::FrameProfiler;
use crate::resources::{Material, Mesh};
use crate::scene::{Model, Scene};
use crate::scene_renderer::SceneRenderer;
use crate::window::Window;
use crate::RendererConfig;

/// Owns the GPU backend, the scene, and the deferred renderer.
pub struct Engine {
    backend: WgpuBackend,
    renderer: SceneRenderer,
    scene: Scene,
}

impl Engine {
    /// Initialize against a window. Shader or resource failures abort
    /// startup; the engine never runs partially initialized.
    pub fn new(window: &Window, config: &RendererConfig) -> BackendResult<Self> {
        let mut backend = WgpuBackend::new(window.window_arc(), config.vsync)?;
        let renderer = SceneRenderer::new(&mut backend, config)?;

        let mut scene = Scene::new();
        let (width, height) = backend.surface_size();
        scene.camera.set_aspect(width as f32, height as f32);

        Ok(Self {
            backend,
            renderer,
            scene,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn renderer(&self) -> &SceneRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut SceneRenderer {
        &mut self.renderer
    }

    /// Upload a mesh + material pair and add it to the scene.
    pub fn add_model(&mut self, mesh: Mesh, material: Material) -> BackendResult<usize> {
        let mut model = Model::new(mesh, material);
        model.upload(&mut self.backend, self.renderer.layouts())?;
        Ok(self.scene.add(Box::new(model)))
    }

    /// Handle a viewport change: completes outside any in-flight frame,
    /// then recreates every size-dependent target.
    pub fn resize(&mut self, width: u32, height: u32) -> BackendResult<()> {
        self.backend.resize(width, height);
        let (width, height) = self.backend.surface_size();
        self.renderer.resize(&mut self.backend, width, height)?;
        self.scene.camera.set_aspect(width as f32, height as f32);
        Ok(())
    }

    /// Render one frame. Per-frame skips (nothing visible, no shadow
    /// casters) are normal; only surface/device errors surface here.
    pub fn render_frame(&mut self) -> BackendResult<()> {
        let frame = self.backend.begin_frame()?;
        self.renderer.draw(&mut self.backend, &self.scene, &frame);
        self.backend.end_frame()
    }

    /// Render one frame with an injected instrumentation collector.
    pub fn render_frame_instrumented(
        &mut self,
        profiler: &mut dyn FrameProfiler,
    ) -> BackendResult<()> {
        let frame = self.backend.begin_frame()?;
        self.renderer
            .draw_instrumented(&mut self.backend, &self.scene, &frame, profiler);
        self.backend.end_frame()
    }
}
