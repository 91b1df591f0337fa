use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to callers of the async and sync call paths.
///
/// Transport-level failures reach only the caller of the failed request;
/// they never terminate the connection itself.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request's deadline elapsed before a response arrived.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection ended while the call was outstanding, or was already
    /// closed when the call was issued.
    #[error("connection closed")]
    ConnectionClosed,

    /// The remote side has no handler bound for this request name.
    #[error("no handler registered for request: {0}")]
    UnknownRequest(String),

    /// The remote handler failed; carries the remote-reported message.
    #[error("handler error: {0}")]
    Handler(String),

    /// A sync call was attempted while another was outstanding in the same
    /// direction.
    #[error("a sync call is already in flight on this connection")]
    SyncCallInFlight,

    /// A sync handler attempted a blocking sync call back across the same
    /// connection, which can never complete.
    #[error("sync call issued from inside a sync handler on the same connection")]
    SyncReentryDeadlock,
}

/// A handler was registered for a name the schema does not declare.
/// Raised at bind time, before the connection is usable.
#[derive(Debug, Error)]
pub enum SchemaMismatch {
    #[error("request handler registered for undeclared request: {0}")]
    Request(String),

    #[error("message handler registered for undeclared message: {0}")]
    Message(String),
}

/// Failure reported by a request or sync handler. The message is forwarded
/// verbatim to the remote caller as a `handler` error.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let err = RpcError::Timeout(Duration::from_millis(5000));
        assert_eq!(err.to_string(), "request timed out after 5s");

        let err = RpcError::UnknownRequest("do_math".into());
        assert_eq!(err.to_string(), "no handler registered for request: do_math");

        let err = RpcError::Handler("division by zero".into());
        assert_eq!(err.to_string(), "handler error: division by zero");

        let err = SchemaMismatch::Request("not_declared".into());
        assert_eq!(
            err.to_string(),
            "request handler registered for undeclared request: not_declared"
        );
    }
}
