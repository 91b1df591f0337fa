//! Window and surface lifecycle management.
//!
//! The registry creates, tracks, and destroys windows and their content
//! surfaces, assigns stable identifiers, and owns each surface's connection
//! to its content process. Navigation runs through the event pipeline before
//! the rendering engine commits it.

pub mod backend;
pub mod config;
pub mod errors;
pub mod registry;
pub mod surface;
pub mod window;

pub use backend::RenderBackend;
pub use config::{SurfaceConfig, WindowConfig};
pub use errors::RegistryError;
pub use registry::SurfaceRegistry;
pub use surface::{Surface, SurfaceState};
pub use window::Window;
