//! Scene management

mod camera;
mod drawable;
mod frustum;
mod lights;
mod transform;

pub use camera::*;
pub use drawable::*;
pub use frustum::*;
pub use lights::*;
pub use transform::*;

use glam::Vec3;

/// The scene containing all renderable content.
///
/// The renderer borrows drawables per frame through the query methods; it
/// never takes ownership.
pub struct Scene {
    pub camera: Camera,
    pub lights: SceneLights,
    drawables: Vec<Box<dyn Drawable>>,
    /// Bounding volume of the whole scene, used to fit shadow projections
    pub volume: BoundingSphere,
    /// Master switch for per-drawable frustum culling
    pub perform_frustum_culling: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            camera: Camera::default(),
            lights: SceneLights::new(),
            drawables: Vec::new(),
            volume: BoundingSphere::new(Vec3::ZERO, 100.0),
            perform_frustum_culling: true,
        }
    }

    /// Add a drawable and return its index
    pub fn add(&mut self, drawable: Box<dyn Drawable>) -> usize {
        let id = self.drawables.len();
        self.drawables.push(drawable);
        id
    }

    pub fn drawable(&self, index: usize) -> Option<&dyn Drawable> {
        self.drawables.get(index).map(|d| d.as_ref())
    }

    pub fn drawable_mut(&mut self, index: usize) -> Option<&mut (dyn Drawable + 'static)> {
        match self.drawables.get_mut(index) {
            Some(d) => Some(d.as_mut()),
            None => None,
        }
    }

    pub fn drawables(&self) -> impl Iterator<Item = &dyn Drawable> {
        self.drawables.iter().map(|d| d.as_ref())
    }

    pub fn drawables_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Drawable>> {
        self.drawables.iter_mut()
    }

    /// All drawables matching a predicate
    pub fn find_all(&self, predicate: impl Fn(&dyn Drawable) -> bool) -> Vec<&dyn Drawable> {
        self.drawables
            .iter()
            .map(|d| d.as_ref())
            .filter(|d| predicate(*d))
            .collect()
    }

    /// Shadow-caster set: visible, ready, opaque drawables regardless of
    /// the view frustum. An object off screen between the light and the
    /// scene still casts into it.
    pub fn shadow_cull(&self) -> Vec<&dyn Drawable> {
        self.drawables
            .iter()
            .map(|d| d.as_ref())
            .filter(|d| d.visible() && d.ready() && d.opaque())
            .collect()
    }

    /// Visible, ready drawables after optional frustum culling.
    ///
    /// A drawable with `cull()` false, or without bounds, always survives
    /// the frustum test.
    pub fn cull_test(&self, frustum: &Frustum) -> Vec<&dyn Drawable> {
        self.drawables
            .iter()
            .map(|d| d.as_ref())
            .filter(|d| d.visible() && d.ready())
            .filter(|d| {
                if !self.perform_frustum_culling || !d.cull() {
                    return true;
                }
                match d.bounds() {
                    Some(bounds) => frustum.intersects_sphere(&bounds),
                    None => true,
                }
            })
            .collect()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
