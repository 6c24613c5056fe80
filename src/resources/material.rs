//! Material definitions

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Surface material for deferred and forward shading
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub base_color: Vec4,
    pub specular_intensity: f32,
    pub specular_power: f32,
    pub emissive: Vec3,
    pub emissive_strength: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            specular_intensity: 0.5,
            specular_power: 32.0,
            emissive: Vec3::ZERO,
            emissive_strength: 1.0,
        }
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_base_color(mut self, color: Vec4) -> Self {
        self.base_color = color;
        self
    }

    pub fn with_specular(mut self, intensity: f32, power: f32) -> Self {
        self.specular_intensity = intensity;
        self.specular_power = power;
        self
    }

    pub fn with_emissive(mut self, emissive: Vec3, strength: f32) -> Self {
        self.emissive = emissive;
        self.emissive_strength = strength;
        self
    }

    /// True when the material needs blending and must take the forward path.
    pub fn is_transparent(&self) -> bool {
        self.base_color.w < 1.0
    }

    /// Create a uniform data struct for GPU
    pub fn uniform_data(&self) -> MaterialUniformData {
        MaterialUniformData {
            base_color: self.base_color,
            specular: Vec4::new(self.specular_intensity, self.specular_power, 0.0, 0.0),
            emissive: (self.emissive * self.emissive_strength).extend(0.0),
        }
    }

    // Preset materials

    pub fn matte(color: Vec3) -> Self {
        Self::new("matte")
            .with_base_color(color.extend(1.0))
            .with_specular(0.05, 8.0)
    }

    pub fn shiny(color: Vec3) -> Self {
        Self::new("shiny")
            .with_base_color(color.extend(1.0))
            .with_specular(1.0, 96.0)
    }

    pub fn glass(color: Vec3, alpha: f32) -> Self {
        Self::new("glass")
            .with_base_color(color.extend(alpha))
            .with_specular(1.0, 128.0)
    }

    pub fn glowing(color: Vec3, strength: f32) -> Self {
        Self::new("glowing")
            .with_base_color(Vec4::ONE)
            .with_emissive(color, strength)
    }
}

/// Material uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniformData {
    pub base_color: Vec4,
    /// x = specular intensity, y = specular power
    pub specular: Vec4,
    /// xyz = emissive, pre-multiplied by strength
    pub emissive: Vec4,
}
