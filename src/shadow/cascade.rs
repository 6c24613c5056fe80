//! Cascaded shadow transforms for a directional light.
//!
//! The cascade set owns two pieces of persisted state that deliberately
//! never shrink: the whole-range shadow bound radius and each cascade's
//! bound radius. Holding them monotonic keeps the orthographic projection
//! and the per-cascade texel size stable while the camera moves, which is
//! half of the anti-flicker story. The other half is the texel snap: a
//! cascade's bound center may only move by whole-texel steps in the shadow
//! camera's view space, so shadow edges never swim under continuous camera
//! motion.

use crate::scene::{BoundingSphere, Camera};
use crate::shadow::{ShadowConfig, MAX_CASCADES};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Per-frame cascade transforms and persisted stabilization state.
pub struct ShadowMapCascadeSet {
    ranges: Vec<f32>,
    map_size: u32,
    anti_flicker: bool,

    // Persisted across frames; radii are monotonically non-decreasing.
    bound_radius: f32,
    cascade_radii: [f32; MAX_CASCADES],
    cascade_centers: [Option<Vec3>; MAX_CASCADES],

    shadow_view: Mat4,
    world_to_shadow: Mat4,
    world_to_cascade: [Mat4; MAX_CASCADES],
    to_cascade_offset_x: Vec4,
    to_cascade_offset_y: Vec4,
    to_cascade_scale: Vec4,
}

impl ShadowMapCascadeSet {
    /// Panics if the configured ranges are not strictly increasing.
    pub fn new(config: &ShadowConfig) -> Self {
        let ranges = config.cascade_ranges.clone();
        assert!(
            ranges.len() >= 2 && ranges.len() <= MAX_CASCADES + 1,
            "cascade ranges must define between 1 and {} cascades",
            MAX_CASCADES
        );
        assert!(
            ranges.windows(2).all(|w| w[0] < w[1]),
            "cascade ranges must be strictly increasing"
        );

        Self {
            ranges,
            map_size: config.map_size,
            anti_flicker: config.anti_flicker,
            bound_radius: 0.0,
            cascade_radii: [0.0; MAX_CASCADES],
            cascade_centers: [None; MAX_CASCADES],
            shadow_view: Mat4::IDENTITY,
            world_to_shadow: Mat4::IDENTITY,
            world_to_cascade: [Mat4::IDENTITY; MAX_CASCADES],
            to_cascade_offset_x: Vec4::ZERO,
            to_cascade_offset_y: Vec4::ZERO,
            to_cascade_scale: Vec4::ONE,
        }
    }

    pub fn total_cascades(&self) -> usize {
        self.ranges.len() - 1
    }

    pub fn ranges(&self) -> &[f32] {
        &self.ranges
    }

    pub fn set_anti_flicker(&mut self, enabled: bool) {
        self.anti_flicker = enabled;
    }

    pub fn anti_flicker(&self) -> bool {
        self.anti_flicker
    }

    pub fn bound_radius(&self) -> f32 {
        self.bound_radius
    }

    pub fn cascade_radius(&self, cascade: usize) -> f32 {
        self.cascade_radii[cascade]
    }

    pub fn cascade_center(&self, cascade: usize) -> Option<Vec3> {
        self.cascade_centers[cascade]
    }

    pub fn shadow_view(&self) -> Mat4 {
        self.shadow_view
    }

    pub fn world_to_shadow(&self) -> Mat4 {
        self.world_to_shadow
    }

    pub fn world_to_cascade(&self, cascade: usize) -> Mat4 {
        self.world_to_cascade[cascade]
    }

    pub fn to_cascade_offset_x(&self) -> Vec4 {
        self.to_cascade_offset_x
    }

    pub fn to_cascade_offset_y(&self) -> Vec4 {
        self.to_cascade_offset_y
    }

    pub fn to_cascade_scale(&self) -> Vec4 {
        self.to_cascade_scale
    }

    /// Cascade index whose depth range contains `distance`, measured along
    /// the camera view direction. `None` past the last cascade: fully lit.
    pub fn cascade_for_depth(&self, distance: f32) -> Option<usize> {
        if distance < self.ranges[0] {
            return Some(0);
        }
        self.ranges
            .windows(2)
            .position(|w| distance >= w[0] && distance < w[1])
    }

    /// Recompute every cascade transform for the frame.
    ///
    /// `scene_volume` extends the shadow camera's near extent so casters
    /// between the light and the view frustum still land in the map.
    pub fn update(&mut self, camera: &Camera, light_direction: Vec3, scene_volume: &BoundingSphere) {
        let light_dir = light_direction.normalize();
        let near = self.ranges[0];
        let far = self.ranges[self.ranges.len() - 1];
        let total_range = far - near;

        // Stable shadow-space view: anchored ahead of the camera, oriented
        // by the light alone so camera rotation cannot rotate shadow space.
        let anchor = camera.position + camera.forward() * (total_range * 0.5);
        let up = stable_up(light_dir);
        self.shadow_view = Mat4::look_at_rh(anchor, anchor + light_dir, up);

        // Whole-range bounding sphere; the persisted radius never shrinks.
        let corners = camera.frustum_corners(near, far);
        let center = camera.position + camera.forward() * ((near + far) * 0.5);
        let radius = max_distance(&corners, center);
        self.bound_radius = self.bound_radius.max(radius);

        let r = self.bound_radius;
        let caster_extent = r + scene_volume.radius;
        let shadow_proj = Mat4::orthographic_rh(-r, r, -r, r, -caster_extent, r);
        self.world_to_shadow = shadow_proj * self.shadow_view;

        for cascade in 0..self.total_cascades() {
            let (offset, scale) = if self.anti_flicker {
                self.fit_cascade_stable(camera, cascade)
            } else {
                self.fit_cascade_tight(camera, cascade)
            };

            self.to_cascade_offset_x[cascade] = offset.x;
            self.to_cascade_offset_y[cascade] = offset.y;
            self.to_cascade_scale[cascade] = scale;

            self.world_to_cascade[cascade] =
                Mat4::from_translation(Vec3::new(offset.x, offset.y, 0.0))
                    * Mat4::from_scale(Vec3::new(scale, scale, 1.0))
                    * self.world_to_shadow;
        }
    }

    /// Anti-flicker path: persisted sphere per cascade, center movement
    /// quantized to whole texels in shadow-view space.
    fn fit_cascade_stable(&mut self, camera: &Camera, cascade: usize) -> (Vec2, f32) {
        let near = self.ranges[cascade];
        let far = self.ranges[cascade + 1];

        let corners = camera.frustum_corners(near, far);
        let new_center = camera.position + camera.forward() * ((near + far) * 0.5);
        let new_radius = max_distance(&corners, new_center);

        self.cascade_radii[cascade] = self.cascade_radii[cascade].max(new_radius);
        let radius = self.cascade_radii[cascade];

        let center = match self.cascade_centers[cascade] {
            None => new_center,
            Some(old_center) => {
                // Compare in the shadow camera's view space. The comparison
                // space must rotate with the light, not with the camera,
                // otherwise a pure camera rotation would register as a
                // translation and defeat the snap.
                let old_vs = self.shadow_view.transform_point3(old_center);
                let new_vs = self.shadow_view.transform_point3(new_center);
                let delta_vs = new_vs - old_vs;

                let texels_per_unit = self.map_size as f32 / (2.0 * radius);
                let snapped_texels = Vec2::new(
                    (delta_vs.x * texels_per_unit).round(),
                    (delta_vs.y * texels_per_unit).round(),
                );

                if snapped_texels == Vec2::ZERO {
                    old_center
                } else {
                    // Rotate the quantized offset back into world space;
                    // a delta needs the inverse rotation only.
                    let world_offset = self.shadow_view.inverse().transform_vector3(Vec3::new(
                        snapped_texels.x / texels_per_unit,
                        snapped_texels.y / texels_per_unit,
                        0.0,
                    ));
                    old_center + world_offset
                }
            }
        };
        self.cascade_centers[cascade] = Some(center);

        let center_ndc = self.world_to_shadow.project_point3(center);
        let scale = self.bound_radius / radius;
        let offset = Vec2::new(-center_ndc.x * scale, -center_ndc.y * scale);
        (offset, scale)
    }

    /// Tight path: axis-aligned fit of the slice corners in shadow space.
    /// Tracks the frustum exactly, persists nothing, may flicker.
    fn fit_cascade_tight(&mut self, camera: &Camera, cascade: usize) -> (Vec2, f32) {
        let near = self.ranges[cascade];
        let far = self.ranges[cascade + 1];
        let corners = camera.frustum_corners(near, far);

        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        for corner in corners {
            let ndc = self.world_to_shadow.project_point3(corner);
            min = min.min(Vec2::new(ndc.x, ndc.y));
            max = max.max(Vec2::new(ndc.x, ndc.y));
        }

        let extent = (max - min).max(Vec2::splat(1e-6));
        let scale = 2.0 / extent.x.max(extent.y);
        let center = (min + max) * 0.5;
        let offset = -center * scale;
        (offset, scale)
    }
}

/// Shadow-space up vector: perpendicular to the light, derived from world
/// right, with a fallback when the light runs along the X axis.
fn stable_up(light_dir: Vec3) -> Vec3 {
    let up = light_dir.cross(Vec3::X);
    if up.length_squared() > 1e-4 {
        up.normalize()
    } else {
        light_dir.cross(Vec3::Z).normalize()
    }
}

fn max_distance(points: &[Vec3; 8], center: Vec3) -> f32 {
    points
        .iter()
        .map(|p| (*p - center).length())
        .fold(0.0f32, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Projection;
    use approx::assert_relative_eq;

    fn test_camera() -> Camera {
        let mut camera = Camera::new(Vec3::ZERO, -Vec3::Z);
        camera.projection = Projection::perspective(60.0, 16.0 / 9.0, 1.0, 200.0);
        camera
    }

    fn test_config() -> ShadowConfig {
        ShadowConfig {
            map_size: 2048,
            cascade_ranges: vec![1.0, 10.0, 50.0, 200.0],
            anti_flicker: true,
            depth_bias: 0.0015,
        }
    }

    fn scene_volume() -> BoundingSphere {
        BoundingSphere::new(Vec3::ZERO, 100.0)
    }

    const LIGHT: Vec3 = Vec3::new(-0.4, -0.8, -0.3);

    #[test]
    #[should_panic(expected = "strictly increasing")]
    fn rejects_non_increasing_ranges() {
        let config = ShadowConfig {
            cascade_ranges: vec![1.0, 50.0, 50.0, 200.0],
            ..test_config()
        };
        let _ = ShadowMapCascadeSet::new(&config);
    }

    #[test]
    fn worked_example_scenario() {
        // Camera at origin looking down -Z, 3 cascades [1, 10, 50, 200].
        let mut set = ShadowMapCascadeSet::new(&test_config());
        set.update(&test_camera(), LIGHT, &scene_volume());

        assert_eq!(set.total_cascades(), 3);
        assert_eq!(set.ranges().len(), 4);
        assert_eq!(set.cascade_for_depth(5.0), Some(0));
        assert_eq!(set.cascade_for_depth(30.0), Some(1));
        assert_eq!(set.cascade_for_depth(120.0), Some(2));
        // Beyond the last cascade: fully lit.
        assert_eq!(set.cascade_for_depth(250.0), None);
    }

    #[test]
    fn bound_radii_never_shrink() {
        let mut set = ShadowMapCascadeSet::new(&test_config());
        let volume = scene_volume();
        let mut camera = test_camera();

        let mut last_bound = 0.0f32;
        let mut last_cascades = [0.0f32; 3];

        // Sweep the camera through translations and rotations; every
        // persisted radius must be non-decreasing across updates.
        for step in 0..50 {
            let t = step as f32 * 0.37;
            camera.position = Vec3::new(t.sin() * 20.0, 3.0 + t.cos() * 2.0, -t * 1.5);
            camera.target = camera.position + Vec3::new(t.cos(), -0.2, -1.0);
            set.update(&camera, LIGHT, &volume);

            assert!(set.bound_radius() >= last_bound);
            last_bound = set.bound_radius();
            for (i, last) in last_cascades.iter_mut().enumerate() {
                assert!(set.cascade_radius(i) >= *last);
                *last = set.cascade_radius(i);
            }
        }
    }

    #[test]
    fn tight_fit_contains_cascade_range_points() {
        let config = ShadowConfig {
            anti_flicker: false,
            ..test_config()
        };
        let mut set = ShadowMapCascadeSet::new(&config);
        let camera = test_camera();
        set.update(&camera, LIGHT, &scene_volume());

        let forward = camera.forward();
        for cascade in 0..set.total_cascades() {
            let near = set.ranges()[cascade];
            let far = set.ranges()[cascade + 1];
            // Points on the view axis and off-axis within the slice.
            for t in [0.0f32, 0.25, 0.5, 0.9] {
                let depth = near + (far - near) * t;
                let corners = camera.frustum_corners(depth.max(near), depth.max(near + 1e-3));
                for point in corners.iter().take(4).copied().chain(std::iter::once(
                    camera.position + forward * depth,
                )) {
                    let projected = set.world_to_cascade(cascade).project_point3(point);
                    assert!(
                        projected.x.abs() <= 1.0 + 1e-3 && projected.y.abs() <= 1.0 + 1e-3,
                        "cascade {cascade} depth {depth}: {projected:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn cascade_centers_move_in_whole_texels() {
        let mut set = ShadowMapCascadeSet::new(&test_config());
        let volume = scene_volume();
        let mut camera = test_camera();
        set.update(&camera, LIGHT, &volume);

        let mut previous: Vec<Vec3> = (0..set.total_cascades())
            .map(|i| set.cascade_center(i).unwrap())
            .collect();

        for _ in 1..30 {
            camera.position += Vec3::new(0.173, 0.0, -0.311);
            camera.target = camera.position - Vec3::Z;
            set.update(&camera, LIGHT, &volume);

            for cascade in 0..set.total_cascades() {
                let center = set.cascade_center(cascade).unwrap();
                let delta_vs = set.shadow_view().transform_point3(center)
                    - set.shadow_view().transform_point3(previous[cascade]);
                let texels_per_unit =
                    set.map_size as f32 / (2.0 * set.cascade_radius(cascade));

                let tx = delta_vs.x * texels_per_unit;
                let ty = delta_vs.y * texels_per_unit;
                assert_relative_eq!(tx, tx.round(), epsilon = 1e-2);
                assert_relative_eq!(ty, ty.round(), epsilon = 1e-2);
                previous[cascade] = center;
            }
        }
    }

    #[test]
    fn snapped_center_is_rotation_invariant() {
        // Orbiting the camera in place (position fixed, target rotating)
        // changes the slice centers, but the comparison space is the
        // shadow camera's view space, so the offsets stay texel-quantized.
        let mut set = ShadowMapCascadeSet::new(&test_config());
        let volume = scene_volume();
        let mut camera = test_camera();
        set.update(&camera, LIGHT, &volume);
        let before = set.cascade_center(0).unwrap();

        camera.target = camera.position + Vec3::new(0.001, 0.0, -1.0);
        set.update(&camera, LIGHT, &volume);
        let after = set.cascade_center(0).unwrap();

        // A hair of rotation moves the slice center by far less than half
        // a texel, so the persisted center must not move at all.
        assert_eq!(before, after);
    }

    #[test]
    fn anti_flicker_off_tracks_frustum_exactly() {
        let config = ShadowConfig {
            anti_flicker: false,
            ..test_config()
        };
        let mut set = ShadowMapCascadeSet::new(&config);
        let mut camera = test_camera();
        set.update(&camera, LIGHT, &scene_volume());
        let first = set.to_cascade_offset_x();

        camera.position.x += 0.01;
        camera.target.x += 0.01;
        set.update(&camera, LIGHT, &scene_volume());

        // Tight fit has no dead zone: any movement shifts the offsets.
        assert_ne!(first, set.to_cascade_offset_x());
    }
}
