//! Typed bidirectional RPC between the host and content surfaces.
//!
//! Three call paths ride one logical connection:
//! - correlated async requests with a per-request deadline
//! - fire-and-forget messages, with an optional wildcard observer
//! - a separate blocking sync bridge for callers that cannot continue
//!   until the other side answers
//!
//! A connection is an ordered, reliable, bidirectional frame stream between
//! exactly two endpoints. Physical framing belongs to the embedder; in-process
//! the stream is a pair of ordered queues.

pub mod connection;
pub mod errors;
pub mod schema;
pub mod sync;
pub mod transport;
pub mod wire;

pub use connection::{Connection, ConnectionOptions, Endpoint, RawEndpoint};
pub use errors::{HandlerError, RpcError, SchemaMismatch};
pub use schema::{bind, DispatchTable, Handlers, RpcSchema};
pub use sync::{SyncEndpoint, SyncHandlers};
pub use transport::{RpcTransport, DEFAULT_REQUEST_TIMEOUT};
pub use wire::{Frame, WireError, WireErrorKind};
