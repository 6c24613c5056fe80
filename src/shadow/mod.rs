//! Shadow mapping: cascade math and depth-map resources

mod cascade;
mod map;

pub use cascade::*;
pub use map::*;

/// Upper bound on directional shadow cascades
pub const MAX_CASCADES: usize = 4;
/// Spot lights that can own a shadow map layer simultaneously
pub const MAX_SHADOWED_SPOT: usize = 4;
/// Point lights that can own shadow map layers (six faces each)
pub const MAX_SHADOWED_POINT: usize = 2;

/// Shadow subsystem configuration
#[derive(Debug, Clone)]
pub struct ShadowConfig {
    /// Resolution of every shadow map layer
    pub map_size: u32,
    /// Cascade split distances `[near, r0, .., far]`, strictly increasing
    pub cascade_ranges: Vec<f32>,
    /// Texel-snapped cascade stabilization (see [`ShadowMapCascadeSet`])
    pub anti_flicker: bool,
    /// Constant depth bias applied in the lighting shader
    pub depth_bias: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: 2048,
            cascade_ranges: vec![1.0, 25.0, 90.0, 250.0],
            anti_flicker: true,
            depth_bias: 0.0015,
        }
    }
}

impl ShadowConfig {
    pub fn cascade_count(&self) -> usize {
        self.cascade_ranges.len() - 1
    }
}
