//! Deferred rendering pipeline
//!
//! The pass sequence, strictly ordered per frame:
//! 1. Shadow passes — depth-only cascade/spot/point layers
//! 2. G-Buffer pass — geometry into multiple render targets
//! 3. Light passes — full-screen directional + stencil-marked volumes
//! 4. Composition — G-buffer + light buffer to final color, fog
//! 5. Forward pass — non-deferred drawables straight to the backbuffer

pub mod compose_pass;
pub mod context;
pub mod forward_pass;
pub mod gbuffer;
pub mod geometry_pass;
pub mod light_pass;
pub mod shadow_pass;
pub mod techniques;

pub use compose_pass::ComposePass;
pub use context::{DrawContext, DrawPhase, ShadowDrawContext};
pub use forward_pass::ForwardPass;
pub use gbuffer::GeometryBuffer;
pub use geometry_pass::GeometryPass;
pub use light_pass::{LightPass, ShadowAssignments};
pub use shadow_pass::ShadowPass;
pub use techniques::{SharedLayouts, Techniques};
