//! Mesh data structures and generation

use crate::backend::types::Vertex;
use crate::scene::BoundingSphere;
use glam::{Vec2, Vec3, Vec4};

/// A mesh with vertex and index data
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub name: String,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            name: name.to_string(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Get index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Object-space bounding sphere around the vertex set
    pub fn bounding_sphere(&self) -> BoundingSphere {
        let points: Vec<Vec3> = self.vertices.iter().map(|v| v.position).collect();
        BoundingSphere::from_points(&points)
    }

    /// Create a unit cube centered at origin
    pub fn cube() -> Self {
        let mut mesh = Mesh::new("cube");

        let faces = [
            (Vec3::Z, Vec3::Y, Vec3::X),
            (-Vec3::Z, Vec3::Y, -Vec3::X),
            (Vec3::X, Vec3::Y, -Vec3::Z),
            (-Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::Y, -Vec3::Z, Vec3::X),
            (-Vec3::Y, Vec3::Z, Vec3::X),
        ];

        for (normal, up, right) in faces {
            let base = mesh.vertices.len() as u32;
            for (du, dv, uv) in [
                (-1.0f32, -1.0f32, Vec2::new(0.0, 1.0)),
                (1.0, -1.0, Vec2::new(1.0, 1.0)),
                (1.0, 1.0, Vec2::new(1.0, 0.0)),
                (-1.0, 1.0, Vec2::new(0.0, 0.0)),
            ] {
                let position = (normal + right * du + up * dv) * 0.5;
                mesh.vertices.push(Vertex {
                    position,
                    normal,
                    uv,
                    tangent: right.extend(1.0),
                });
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        mesh
    }

    /// Create a UV sphere with the given radius
    pub fn sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let mut mesh = Mesh::new("sphere");

        let segment_angle = 2.0 * std::f32::consts::PI / segments as f32;
        let ring_angle = std::f32::consts::PI / rings as f32;

        for ring in 0..=rings {
            let phi = ring as f32 * ring_angle;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for segment in 0..=segments {
                let theta = segment as f32 * segment_angle;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();

                let normal = Vec3::new(x, y, z).normalize_or_zero();
                let normal = if normal == Vec3::ZERO {
                    Vec3::new(0.0, y.signum(), 0.0)
                } else {
                    normal
                };
                let tangent = Vec3::new(-theta.sin(), 0.0, theta.cos());

                mesh.vertices.push(Vertex {
                    position: Vec3::new(x, y, z) * radius,
                    normal,
                    uv: Vec2::new(
                        segment as f32 / segments as f32,
                        ring as f32 / rings as f32,
                    ),
                    tangent: tangent.extend(1.0),
                });
            }
        }

        for ring in 0..rings {
            for segment in 0..segments {
                let current = ring * (segments + 1) + segment;
                let next = current + segments + 1;

                mesh.indices.extend_from_slice(&[
                    current,
                    next,
                    current + 1,
                    current + 1,
                    next,
                    next + 1,
                ]);
            }
        }

        mesh
    }

    /// Unit-radius sphere used as a point-light volume
    pub fn unit_sphere(segments: u32, rings: u32) -> Self {
        let mut mesh = Self::sphere(1.0, segments, rings);
        mesh.name = "unit_sphere".to_string();
        mesh
    }

    /// Unit cone used as a spot-light volume: apex at the origin, unit-radius
    /// base circle at z = -1, capped.
    pub fn unit_cone(segments: u32) -> Self {
        let mut mesh = Mesh::new("unit_cone");
        let angle_step = 2.0 * std::f32::consts::PI / segments as f32;

        // Apex
        mesh.vertices.push(Vertex {
            position: Vec3::ZERO,
            normal: Vec3::Z,
            uv: Vec2::new(0.5, 0.5),
            tangent: Vec4::new(1.0, 0.0, 0.0, 1.0),
        });

        // Base rim; side normals are approximate, the volume is never lit
        for i in 0..=segments {
            let angle = i as f32 * angle_step;
            let (sin, cos) = angle.sin_cos();
            let rim = Vec3::new(cos, sin, -1.0);
            let side_normal = Vec3::new(cos, sin, 1.0).normalize();
            mesh.vertices.push(Vertex {
                position: rim,
                normal: side_normal,
                uv: Vec2::new(i as f32 / segments as f32, 1.0),
                tangent: Vec4::new(-sin, cos, 0.0, 1.0),
            });
        }

        // Sides
        for i in 0..segments {
            mesh.indices.extend_from_slice(&[0, 1 + i, 2 + i]);
        }

        // Base cap center
        let center = mesh.vertices.len() as u32;
        mesh.vertices.push(Vertex {
            position: Vec3::new(0.0, 0.0, -1.0),
            normal: -Vec3::Z,
            uv: Vec2::new(0.5, 0.5),
            tangent: Vec4::new(1.0, 0.0, 0.0, 1.0),
        });
        for i in 0..segments {
            mesh.indices
                .extend_from_slice(&[center, 2 + i, 1 + i]);
        }

        mesh
    }

    /// Create a plane on the XZ axis
    pub fn plane(width: f32, depth: f32, subdivisions: u32) -> Self {
        let mut mesh = Mesh::new("plane");

        let half_width = width / 2.0;
        let half_depth = depth / 2.0;
        let step_x = width / subdivisions as f32;
        let step_z = depth / subdivisions as f32;

        for z in 0..=subdivisions {
            for x in 0..=subdivisions {
                let px = -half_width + x as f32 * step_x;
                let pz = -half_depth + z as f32 * step_z;

                mesh.vertices.push(Vertex {
                    position: Vec3::new(px, 0.0, pz),
                    normal: Vec3::Y,
                    uv: Vec2::new(
                        x as f32 / subdivisions as f32,
                        z as f32 / subdivisions as f32,
                    ),
                    tangent: Vec4::new(1.0, 0.0, 0.0, 1.0),
                });
            }
        }

        for z in 0..subdivisions {
            for x in 0..subdivisions {
                let current = z * (subdivisions + 1) + x;
                let next = current + subdivisions + 1;

                mesh.indices.extend_from_slice(&[
                    current,
                    next,
                    current + 1,
                    current + 1,
                    next,
                    next + 1,
                ]);
            }
        }

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_expected_counts() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
    }

    #[test]
    fn unit_sphere_vertices_lie_on_unit_radius() {
        let sphere = Mesh::unit_sphere(16, 8);
        for v in &sphere.vertices {
            assert!((v.position.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn unit_cone_spans_apex_to_base() {
        let cone = Mesh::unit_cone(12);
        let min_z = cone.vertices.iter().map(|v| v.position.z).fold(f32::MAX, f32::min);
        let max_z = cone.vertices.iter().map(|v| v.position.z).fold(f32::MIN, f32::max);
        assert_eq!(max_z, 0.0);
        assert_eq!(min_z, -1.0);
        assert!(cone.triangle_count() >= 24);
    }

    #[test]
    fn bounding_sphere_covers_all_vertices() {
        let mesh = Mesh::plane(8.0, 2.0, 4);
        let bounds = mesh.bounding_sphere();
        for v in &mesh.vertices {
            assert!((v.position - bounds.center).length() <= bounds.radius + 1e-4);
        }
    }
}
