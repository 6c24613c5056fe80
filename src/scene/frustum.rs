//! View frustum and bounding volumes

use glam::{Mat4, Vec3, Vec4};

/// Sphere bound used for culling drawables, fitting shadow cascades, and
/// skipping off-screen light volumes.
#[derive(Debug, Clone, Copy)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Smallest sphere around a point set, centered at the centroid.
    pub fn from_points(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self::new(Vec3::ZERO, 0.0);
        }
        let center = points.iter().copied().fold(Vec3::ZERO, |acc, p| acc + p)
            / points.len() as f32;
        let radius = points
            .iter()
            .map(|p| (*p - center).length())
            .fold(0.0f32, f32::max);
        Self { center, radius }
    }

    /// Sphere transformed by a rigid transform with uniform-ish scaling.
    pub fn transformed(&self, matrix: &Mat4, max_scale: f32) -> Self {
        Self {
            center: matrix.transform_point3(self.center),
            radius: self.radius * max_scale,
        }
    }
}

/// One frustum plane, `normal . p + d >= 0` on the inside.
#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vec3,
    d: f32,
}

impl Plane {
    fn from_vec4(v: Vec4) -> Self {
        let normal = Vec3::new(v.x, v.y, v.z);
        let len = normal.length();
        Self {
            normal: normal / len,
            d: v.w / len,
        }
    }

    fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// View frustum as six planes extracted from a view-projection matrix.
#[derive(Debug, Clone)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extract planes from a view-projection matrix (rows m3 +- m0/m1/m2).
    pub fn from_view_proj(view_proj: &Mat4) -> Self {
        let row = |i| view_proj.row(i);
        let planes = [
            Plane::from_vec4(row(3) + row(0)), // left
            Plane::from_vec4(row(3) - row(0)), // right
            Plane::from_vec4(row(3) + row(1)), // bottom
            Plane::from_vec4(row(3) - row(1)), // top
            Plane::from_vec4(row(2)),          // near (0..1 depth range)
            Plane::from_vec4(row(3) - row(2)), // far
        ];
        Self { planes }
    }

    /// True if the sphere intersects or is contained in the frustum.
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|p| p.signed_distance(sphere.center) >= -sphere.radius)
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.signed_distance(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    fn test_frustum() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::ZERO, -Vec3::Z, Vec3::Y);
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        Frustum::from_view_proj(&(proj * view))
    }

    #[test]
    fn sphere_in_front_is_visible() {
        let frustum = test_frustum();
        assert!(frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0)));
    }

    #[test]
    fn sphere_behind_camera_is_culled() {
        let frustum = test_frustum();
        assert!(!frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.0, 50.0), 1.0)));
    }

    #[test]
    fn sphere_straddling_plane_is_visible() {
        let frustum = test_frustum();
        // Center outside the left plane, radius reaching in.
        assert!(frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(-12.0, 0.0, -10.0), 5.0)));
    }

    #[test]
    fn sphere_beyond_far_plane_is_culled() {
        let frustum = test_frustum();
        assert!(!frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.0, -200.0), 1.0)));
    }

    #[test]
    fn point_containment() {
        let frustum = test_frustum();
        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, -5.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 5.0)));
    }
}
