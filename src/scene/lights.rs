//! Light types and the per-scene light set

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3, Vec4};

/// Enabled directional lights per scene
pub const MAX_DIRECTIONAL_LIGHTS: usize = 3;
/// Enabled point lights per scene
pub const MAX_POINT_LIGHTS: usize = 16;
/// Enabled spot lights per scene
pub const MAX_SPOT_LIGHTS: usize = 16;

/// Directional light (like the sun)
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub enabled: bool,
    pub cast_shadows: bool,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.5, -1.0, -0.5).normalize(),
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            enabled: true,
            cast_shadows: false,
        }
    }
}

impl DirectionalLight {
    pub fn new(direction: Vec3, diffuse: Vec3, specular: Vec3) -> Self {
        Self {
            direction: direction.normalize(),
            diffuse,
            specular,
            enabled: true,
            cast_shadows: false,
        }
    }

    pub fn with_shadows(mut self) -> Self {
        self.cast_shadows = true;
        self
    }
}

/// Point light with a finite radius of influence
#[derive(Debug, Clone)]
pub struct PointLight {
    pub position: Vec3,
    pub radius: f32,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub enabled: bool,
    pub cast_shadows: bool,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            radius: 10.0,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            enabled: true,
            cast_shadows: false,
        }
    }
}

impl PointLight {
    pub fn new(position: Vec3, radius: f32, diffuse: Vec3) -> Self {
        Self {
            position,
            radius,
            diffuse,
            ..Default::default()
        }
    }

    /// World transform of the unit light-volume sphere.
    ///
    /// The small inflation keeps the tessellated sphere's chords outside
    /// the analytic radius.
    pub fn volume_transform(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_scale(Vec3::splat(self.radius * 1.08))
    }
}

/// Spot light: position, direction, cone angles, and range
#[derive(Debug, Clone)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub radius: f32,
    pub inner_angle: f32,
    pub outer_angle: f32,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub enabled: bool,
    pub cast_shadows: bool,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: -Vec3::Y,
            radius: 10.0,
            inner_angle: 0.3,
            outer_angle: 0.5,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            enabled: true,
            cast_shadows: false,
        }
    }
}

impl SpotLight {
    pub fn new(position: Vec3, direction: Vec3, radius: f32, outer_angle: f32, diffuse: Vec3) -> Self {
        Self {
            position,
            direction: direction.normalize(),
            radius,
            inner_angle: outer_angle * 0.7,
            outer_angle,
            diffuse,
            ..Default::default()
        }
    }

    /// World transform of the unit light-volume cone.
    ///
    /// The unit cone has its apex at the origin and a unit-radius base at
    /// z = -1; scaling by (base, base, range) and rotating -Z onto the
    /// spot direction reproduces the cone of influence.
    pub fn volume_transform(&self) -> Mat4 {
        let base_radius = self.radius * self.outer_angle.tan() * 1.1;
        let rotation = Quat::from_rotation_arc(-Vec3::Z, self.direction.normalize());
        Mat4::from_translation(self.position)
            * Mat4::from_quat(rotation)
            * Mat4::from_scale(Vec3::new(base_radius, base_radius, self.radius))
    }

    /// Sphere enclosing the cone, for frustum rejection.
    pub fn bounding_sphere_center(&self) -> Vec3 {
        self.position + self.direction * (self.radius * 0.5)
    }

    pub fn bounding_sphere_radius(&self) -> f32 {
        let half = self.radius * 0.5;
        let base = self.radius * self.outer_angle.tan();
        (half * half + base * base).sqrt().max(half)
    }
}

/// Hemispheric ambient term: sky color above, ground color below
#[derive(Debug, Clone)]
pub struct HemisphericLight {
    pub sky_color: Vec3,
    pub ground_color: Vec3,
    pub enabled: bool,
}

impl Default for HemisphericLight {
    fn default() -> Self {
        Self {
            sky_color: Vec3::new(0.05, 0.06, 0.08),
            ground_color: Vec3::new(0.03, 0.025, 0.02),
            enabled: true,
        }
    }
}

/// Linear distance fog
#[derive(Debug, Clone)]
pub struct Fog {
    pub color: Vec3,
    pub start: f32,
    pub range: f32,
    pub enabled: bool,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            color: Vec3::new(0.5, 0.55, 0.6),
            start: 50.0,
            range: 150.0,
            enabled: false,
        }
    }
}

/// Aggregate of every light in a scene, with hard caps per type.
#[derive(Debug, Clone, Default)]
pub struct SceneLights {
    directionals: Vec<DirectionalLight>,
    points: Vec<PointLight>,
    spots: Vec<SpotLight>,
    pub hemispheric: HemisphericLight,
    pub fog: Fog,
}

impl SceneLights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directional light; returns false when the cap is reached.
    pub fn add_directional(&mut self, light: DirectionalLight) -> bool {
        if self.directionals.len() >= MAX_DIRECTIONAL_LIGHTS {
            return false;
        }
        self.directionals.push(light);
        true
    }

    pub fn add_point(&mut self, light: PointLight) -> bool {
        if self.points.len() >= MAX_POINT_LIGHTS {
            return false;
        }
        self.points.push(light);
        true
    }

    pub fn add_spot(&mut self, light: SpotLight) -> bool {
        if self.spots.len() >= MAX_SPOT_LIGHTS {
            return false;
        }
        self.spots.push(light);
        true
    }

    pub fn directionals(&self) -> &[DirectionalLight] {
        &self.directionals
    }

    pub fn directionals_mut(&mut self) -> &mut [DirectionalLight] {
        &mut self.directionals
    }

    pub fn points(&self) -> &[PointLight] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [PointLight] {
        &mut self.points
    }

    pub fn spots(&self) -> &[SpotLight] {
        &self.spots
    }

    pub fn spots_mut(&mut self) -> &mut [SpotLight] {
        &mut self.spots
    }

    pub fn enabled_directionals(&self) -> impl Iterator<Item = &DirectionalLight> {
        self.directionals.iter().filter(|l| l.enabled)
    }

    pub fn enabled_points(&self) -> impl Iterator<Item = &PointLight> {
        self.points.iter().filter(|l| l.enabled)
    }

    pub fn enabled_spots(&self) -> impl Iterator<Item = &SpotLight> {
        self.spots.iter().filter(|l| l.enabled)
    }

    /// The directional light that owns the shadow cascades, if any.
    pub fn shadow_directional(&self) -> Option<&DirectionalLight> {
        self.directionals
            .iter()
            .find(|l| l.enabled && l.cast_shadows)
    }

    /// True when any enabled light requests shadows.
    pub fn any_shadow_caster(&self) -> bool {
        self.directionals.iter().any(|l| l.enabled && l.cast_shadows)
            || self.points.iter().any(|l| l.enabled && l.cast_shadows)
            || self.spots.iter().any(|l| l.enabled && l.cast_shadows)
    }
}

/// GPU layout for one directional light
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuDirectionalLight {
    /// xyz = direction, w = 1 when this light samples the cascade map
    pub direction: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
}

/// Uniform for the full-screen ambient + directional accumulation draw
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuAmbientDirectional {
    /// xyz = sky ambient, w = hemispheric enabled
    pub hemisphere_sky: Vec4,
    /// xyz = ground ambient, w unused
    pub hemisphere_ground: Vec4,
    /// x = directional count
    pub counts: Vec4,
    pub directionals: [GpuDirectionalLight; MAX_DIRECTIONAL_LIGHTS],
}

impl GpuAmbientDirectional {
    pub fn pack(lights: &SceneLights, shadowed_index: Option<usize>) -> Self {
        let mut directionals = [GpuDirectionalLight {
            direction: Vec4::ZERO,
            diffuse: Vec4::ZERO,
            specular: Vec4::ZERO,
        }; MAX_DIRECTIONAL_LIGHTS];

        let mut count = 0usize;
        for (index, light) in lights.directionals().iter().enumerate() {
            if !light.enabled || count >= MAX_DIRECTIONAL_LIGHTS {
                continue;
            }
            let shadowed = shadowed_index == Some(index);
            directionals[count] = GpuDirectionalLight {
                direction: light
                    .direction
                    .normalize()
                    .extend(if shadowed { 1.0 } else { 0.0 }),
                diffuse: light.diffuse.extend(0.0),
                specular: light.specular.extend(0.0),
            };
            count += 1;
        }

        let hemi = &lights.hemispheric;
        Self {
            hemisphere_sky: hemi
                .sky_color
                .extend(if hemi.enabled { 1.0 } else { 0.0 }),
            hemisphere_ground: hemi.ground_color.extend(0.0),
            counts: Vec4::new(count as f32, 0.0, 0.0, 0.0),
            directionals,
        }
    }
}

/// GPU layout for one point or spot light volume draw
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuVolumeLight {
    /// Unit sphere / unit cone world transform
    pub volume: Mat4,
    /// xyz = position, w = radius
    pub position_range: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    /// xyz = direction, w = cos(outer_angle)
    pub direction_angle: Vec4,
    /// x = kind (0 point, 1 spot), y = shadow layer (-1 none), z = cos(inner_angle)
    pub params: Vec4,
}

impl GpuVolumeLight {
    pub fn from_point(light: &PointLight, shadow_layer: i32) -> Self {
        Self {
            volume: light.volume_transform(),
            position_range: light.position.extend(light.radius),
            diffuse: light.diffuse.extend(0.0),
            specular: light.specular.extend(0.0),
            direction_angle: Vec4::ZERO,
            params: Vec4::new(0.0, shadow_layer as f32, 0.0, 0.0),
        }
    }

    pub fn from_spot(light: &SpotLight, shadow_layer: i32) -> Self {
        Self {
            volume: light.volume_transform(),
            position_range: light.position.extend(light.radius),
            diffuse: light.diffuse.extend(0.0),
            specular: light.specular.extend(0.0),
            direction_angle: light
                .direction
                .normalize()
                .extend(light.outer_angle.cos()),
            params: Vec4::new(1.0, shadow_layer as f32, light.inner_angle.cos(), 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_caps_are_enforced() {
        let mut lights = SceneLights::new();
        for _ in 0..MAX_DIRECTIONAL_LIGHTS {
            assert!(lights.add_directional(DirectionalLight::default()));
        }
        assert!(!lights.add_directional(DirectionalLight::default()));

        for _ in 0..MAX_POINT_LIGHTS {
            assert!(lights.add_point(PointLight::default()));
        }
        assert!(!lights.add_point(PointLight::default()));

        for _ in 0..MAX_SPOT_LIGHTS {
            assert!(lights.add_spot(SpotLight::default()));
        }
        assert!(!lights.add_spot(SpotLight::default()));
    }

    #[test]
    fn shadow_directional_skips_disabled_lights() {
        let mut lights = SceneLights::new();
        let mut off = DirectionalLight::default().with_shadows();
        off.enabled = false;
        lights.add_directional(off);
        lights.add_directional(DirectionalLight::default());
        assert!(lights.shadow_directional().is_none());

        lights.directionals_mut()[1].cast_shadows = true;
        assert!(lights.shadow_directional().is_some());
        assert!(lights.any_shadow_caster());
    }

    #[test]
    fn packed_directionals_flag_the_shadowed_light() {
        let mut lights = SceneLights::new();
        lights.add_directional(DirectionalLight::default());
        lights.add_directional(DirectionalLight::default().with_shadows());

        let packed = GpuAmbientDirectional::pack(&lights, Some(1));
        assert_eq!(packed.counts.x as usize, 2);
        assert_eq!(packed.directionals[0].direction.w, 0.0);
        assert_eq!(packed.directionals[1].direction.w, 1.0);
    }

    #[test]
    fn spot_bounding_sphere_encloses_cone_base() {
        let spot = SpotLight::new(Vec3::ZERO, -Vec3::Y, 10.0, 0.6, Vec3::ONE);
        let center = spot.bounding_sphere_center();
        let radius = spot.bounding_sphere_radius();
        // Apex and the rim of the base circle must be inside.
        let base_rim = Vec3::new(10.0 * 0.6f32.tan(), -10.0, 0.0);
        assert!((spot.position - center).length() <= radius + 1e-4);
        assert!((base_rim - center).length() <= radius + 1e-4);
    }
}
