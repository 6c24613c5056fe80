//! Resource management
//!
//! CPU-side meshes, materials, and texture data plus their GPU uploads.

mod material;
mod mesh;
mod texture;

pub use material::*;
pub use mesh::*;
pub use texture::*;
