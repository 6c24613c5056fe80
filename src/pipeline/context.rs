//! Per-pass draw contexts
//!
//! Transient value objects handed to drawables, created fresh per pass and
//! never persisted.

use crate::backend::traits::GraphicsBackend;
use crate::scene::{Frustum, SceneLights};
use glam::{Mat4, Vec3};

/// Which pass the context belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPhase {
    /// G-buffer fill; opaque geometry only
    Deferred,
    /// Direct-to-backbuffer shading after composition
    Forward,
}

/// Per-pass context for color passes
pub struct DrawContext<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    pub phase: DrawPhase,
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    pub eye: Vec3,
    pub frustum: &'a Frustum,
    pub lights: &'a SceneLights,
    /// True when a shadow map is bound for this frame; false short-circuits
    /// every cascade lookup to fully lit.
    pub shadows_bound: bool,
}

impl<'a> DrawContext<'a> {
    /// Blend validation: the G-buffer cannot represent blended fragments,
    /// so the deferred phase accepts opaque geometry only.
    pub fn accepts(&self, opaque: bool) -> bool {
        match self.phase {
            DrawPhase::Deferred => opaque,
            DrawPhase::Forward => true,
        }
    }
}

/// Per-pass context for depth-only shadow rendering
pub struct ShadowDrawContext<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    /// View-projection of the cascade or shadow-map face being rendered
    pub view_proj: Mat4,
}
