//! Graphics backend abstraction
//!
//! The renderer talks to the GPU through [`traits::GraphicsBackend`]; the
//! wgpu implementation drives real hardware, the headless implementation
//! records command journals for tests.

pub mod headless;
pub mod traits;
pub mod types;
pub mod wgpu_backend;

pub use headless::HeadlessBackend;
pub use traits::*;
pub use types::*;
pub use wgpu_backend::WgpuBackend;
