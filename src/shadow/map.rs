//! Shadow-map GPU resources and the shadow uniform block.
//!
//! All shadow maps are layers of Depth32Float texture arrays: one layer per
//! directional cascade, one per shadowed spot light, and six per shadowed
//! point light. Each layer gets its own render view; sampling goes through
//! a single array view per category and a comparison sampler.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::scene::{PointLight, SpotLight};
use crate::shadow::{ShadowConfig, MAX_CASCADES, MAX_SHADOWED_POINT, MAX_SHADOWED_SPOT};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// One depth array plus its render and sampling views.
pub struct ShadowMapTarget {
    texture: TextureHandle,
    layer_views: Vec<TextureViewHandle>,
    array_view: TextureViewHandle,
}

impl ShadowMapTarget {
    fn create(
        backend: &mut dyn GraphicsBackend,
        label: &str,
        size: u32,
        layers: u32,
    ) -> BackendResult<Self> {
        let texture = backend.create_texture(&TextureDescriptor {
            label: Some(label.to_string()),
            width: size,
            height: size,
            array_layers: layers,
            mip_levels: 1,
            format: TextureFormat::Depth32Float,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        })?;

        let layer_views = (0..layers)
            .map(|layer| backend.create_texture_view(texture, &TextureViewDescriptor::layer(layer)))
            .collect::<BackendResult<Vec<_>>>()?;

        let array_view = backend.create_texture_view(texture, &TextureViewDescriptor::array())?;

        Ok(Self {
            texture,
            layer_views,
            array_view,
        })
    }

    pub fn layer_view(&self, layer: usize) -> TextureViewHandle {
        self.layer_views[layer]
    }

    pub fn array_view(&self) -> TextureViewHandle {
        self.array_view
    }

    pub fn layer_count(&self) -> usize {
        self.layer_views.len()
    }

    fn release(&self, backend: &mut dyn GraphicsBackend) {
        backend.destroy_texture(self.texture);
    }
}

/// The complete shadow-map resource set for a frame.
pub struct ShadowMaps {
    pub cascades: ShadowMapTarget,
    pub spots: ShadowMapTarget,
    pub points: ShadowMapTarget,
    pub comparison_sampler: SamplerHandle,
    map_size: u32,
}

impl ShadowMaps {
    pub fn create(backend: &mut dyn GraphicsBackend, config: &ShadowConfig) -> BackendResult<Self> {
        let cascades = ShadowMapTarget::create(
            backend,
            "cascade shadow map",
            config.map_size,
            config.cascade_count() as u32,
        )?;
        let spots = ShadowMapTarget::create(
            backend,
            "spot shadow map",
            config.map_size,
            MAX_SHADOWED_SPOT as u32,
        )?;
        let points = ShadowMapTarget::create(
            backend,
            "point shadow map",
            config.map_size,
            (MAX_SHADOWED_POINT * 6) as u32,
        )?;
        let comparison_sampler = backend.create_sampler(&SamplerDescriptor::shadow_comparison())?;

        Ok(Self {
            cascades,
            spots,
            points,
            comparison_sampler,
            map_size: config.map_size,
        })
    }

    pub fn map_size(&self) -> u32 {
        self.map_size
    }

    /// Shadow-map resolution is viewport-independent; this exists for
    /// teardown, not resize.
    pub fn release(&self, backend: &mut dyn GraphicsBackend) {
        self.cascades.release(backend);
        self.spots.release(backend);
        self.points.release(backend);
    }
}

/// View-projection for a shadow-casting spot light.
pub fn spot_light_matrix(light: &SpotLight) -> Mat4 {
    let direction = light.direction.normalize();
    let up = if direction.cross(Vec3::Y).length_squared() > 1e-4 {
        Vec3::Y
    } else {
        Vec3::Z
    };
    let view = Mat4::look_at_rh(light.position, light.position + direction, up);
    let fov = (light.outer_angle * 2.0).min(std::f32::consts::PI - 0.01);
    let proj = Mat4::perspective_rh(fov, 1.0, 0.05, light.radius.max(0.1));
    proj * view
}

/// Face targets for point-light shadow rendering, dominant-axis order:
/// +X, -X, +Y, -Y, +Z, -Z. The lighting shader selects the face the same
/// way, so orientation details cancel out.
const POINT_FACE_DIRS: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::Y),
    (Vec3::NEG_X, Vec3::Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::Z),
    (Vec3::Z, Vec3::Y),
    (Vec3::NEG_Z, Vec3::Y),
];

/// View-projection for one face of a point light's shadow cube.
pub fn point_light_face_matrix(light: &PointLight, face: usize) -> Mat4 {
    let (dir, up) = POINT_FACE_DIRS[face];
    let view = Mat4::look_at_rh(light.position, light.position + dir, up);
    let proj = Mat4::perspective_rh(
        std::f32::consts::FRAC_PI_2,
        1.0,
        0.05,
        light.radius.max(0.1),
    );
    proj * view
}

/// Shadow data consumed by the light-accumulation shaders.
///
/// `params.x` carries the bound cascade count; zero means the shadow map
/// was never rendered this frame and every lookup short-circuits to fully
/// lit.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShadowUniform {
    pub world_to_shadow: Mat4,
    pub to_cascade_offset_x: Vec4,
    pub to_cascade_offset_y: Vec4,
    pub to_cascade_scale: Vec4,
    pub spot_matrices: [Mat4; MAX_SHADOWED_SPOT],
    pub point_matrices: [Mat4; MAX_SHADOWED_POINT * 6],
    /// x = cascade count, y = map size, z = depth bias, w = poisson spread
    pub params: Vec4,
}

impl Default for ShadowUniform {
    fn default() -> Self {
        Self {
            world_to_shadow: Mat4::IDENTITY,
            to_cascade_offset_x: Vec4::ZERO,
            to_cascade_offset_y: Vec4::ZERO,
            to_cascade_scale: Vec4::ONE,
            spot_matrices: [Mat4::IDENTITY; MAX_SHADOWED_SPOT],
            point_matrices: [Mat4::IDENTITY; MAX_SHADOWED_POINT * 6],
            params: Vec4::new(0.0, 2048.0, 0.0015, 1.0),
        }
    }
}

impl ShadowUniform {
    /// Mark the directional shadow map unbound: all lookups fully lit.
    pub fn unbound(config: &ShadowConfig) -> Self {
        Self {
            params: Vec4::new(0.0, config.map_size as f32, config.depth_bias, 1.0),
            ..Default::default()
        }
    }

    pub fn set_cascades(
        &mut self,
        cascade_count: usize,
        world_to_shadow: Mat4,
        offset_x: Vec4,
        offset_y: Vec4,
        scale: Vec4,
    ) {
        debug_assert!(cascade_count <= MAX_CASCADES);
        self.world_to_shadow = world_to_shadow;
        self.to_cascade_offset_x = offset_x;
        self.to_cascade_offset_y = offset_y;
        self.to_cascade_scale = scale;
        self.params.x = cascade_count as f32;
    }

    pub fn set_spot_matrix(&mut self, layer: usize, matrix: Mat4) {
        if layer < MAX_SHADOWED_SPOT {
            self.spot_matrices[layer] = matrix;
        }
    }

    pub fn set_point_matrix(&mut self, light_slot: usize, face: usize, matrix: Mat4) {
        let index = light_slot * 6 + face;
        if index < MAX_SHADOWED_POINT * 6 {
            self.point_matrices[index] = matrix;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_matrix_contains_lit_points() {
        let light = SpotLight::new(
            Vec3::new(0.0, 5.0, 0.0),
            -Vec3::Y,
            10.0,
            0.5,
            Vec3::ONE,
        );
        let matrix = spot_light_matrix(&light);

        // A point straight down the beam projects near the center.
        let centered = matrix.project_point3(Vec3::new(0.0, 1.0, 0.0));
        assert!(centered.x.abs() < 0.05 && centered.y.abs() < 0.05);
        assert!(centered.z > 0.0 && centered.z < 1.0);

        // A point behind the light projects outside the depth range.
        let behind = matrix.project_point3(Vec3::new(0.0, 8.0, 0.0));
        assert!(!(0.0..=1.0).contains(&behind.z));
    }

    #[test]
    fn point_face_matrices_cover_dominant_axes() {
        let light = PointLight::new(Vec3::ZERO, 20.0, Vec3::ONE);
        let samples = [
            (Vec3::new(5.0, 0.2, -0.3), 0),
            (Vec3::new(-5.0, 0.2, 0.3), 1),
            (Vec3::new(0.2, 5.0, 0.3), 2),
            (Vec3::new(0.2, -5.0, 0.3), 3),
            (Vec3::new(0.2, 0.3, 5.0), 4),
            (Vec3::new(0.2, 0.3, -5.0), 5),
        ];

        for (point, face) in samples {
            let projected = point_light_face_matrix(&light, face).project_point3(point);
            assert!(
                projected.x.abs() <= 1.0 && projected.y.abs() <= 1.0,
                "face {face} does not cover {point:?}: {projected:?}"
            );
            assert!(projected.z > 0.0 && projected.z < 1.0);
        }
    }

    #[test]
    fn unbound_uniform_reports_zero_cascades() {
        let uniform = ShadowUniform::unbound(&ShadowConfig::default());
        assert_eq!(uniform.params.x, 0.0);
    }
}
