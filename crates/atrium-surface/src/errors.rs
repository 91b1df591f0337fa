use atrium_common::{SurfaceId, WindowId};
use atrium_rpc::SchemaMismatch;
use thiserror::Error;

/// Errors raised at creation or lookup time, before any connection traffic.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Schema(#[from] SchemaMismatch),

    #[error("unknown window: {0}")]
    UnknownWindow(WindowId),

    #[error("unknown surface: {0}")]
    UnknownSurface(SurfaceId),
}
