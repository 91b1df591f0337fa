pub mod errors;
pub mod id;
pub mod types;

pub use errors::HostError;
pub use id::{SurfaceId, WindowId};
pub use types::Rect;

pub type Result<T> = std::result::Result<T, HostError>;
