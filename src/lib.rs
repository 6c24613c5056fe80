//! Deferred Engine - a multi-pass deferred renderer with cascaded shadows
//!
//! The frame pipeline runs five strictly ordered stages: shadow depth
//! (directional cascades plus spot/point layers), G-buffer fill, light
//! accumulation (full-screen directional + stencil-marked point/spot
//! volumes), composition with fog, and a forward pass for transparent and
//! other non-deferred drawables.
//!
//! # Features
//! - Texel-snapped cascaded shadow maps with monotonic bound radii
//!   (no shadow-edge swimming under camera motion)
//! - Two-pass stencil light volumes: per-pixel lighting cost bounded to
//!   the pixels a light actually covers
//! - Handle-based graphics backend boundary with a wgpu implementation
//!   and a headless recording implementation for tests
//! - Injectable frame profiler (pass trace, draw/triangle counters)

pub mod backend;
pub mod engine;
pub mod pipeline;
pub mod profiling;
pub mod resources;
pub mod scene;
pub mod scene_renderer;
pub mod shadow;
pub mod window;

pub use backend::{GraphicsBackend, HeadlessBackend, WgpuBackend};
pub use engine::Engine;
pub use scene_renderer::SceneRenderer;
pub use shadow::ShadowConfig;
pub use window::Window;

/// Configuration for initializing the renderer
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Shadow subsystem configuration
    pub shadow: ShadowConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "Deferred Engine".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            shadow: ShadowConfig::default(),
        }
    }
}
