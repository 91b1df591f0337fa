//! Connection construction and endpoint pairing.
//!
//! A connection is the logical channel between the host and one surface's
//! content process: exactly one async transport and at most one sync bridge,
//! created with the surface and torn down with it. `Connection::pipe` builds
//! the two raw halves; each side then binds its own dispatch table.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::errors::RpcError;
use crate::schema::DispatchTable;
use crate::sync::{RawSyncEndpoint, SyncBridge, SyncEndpoint, SyncHandlers};
use crate::transport::{RpcTransport, DEFAULT_REQUEST_TIMEOUT};
use crate::wire::Frame;

/// Options for one logical host <-> content channel.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Per-request deadline for async calls, applied on both endpoints.
    pub max_request_time: Duration,
    /// Whether the connection carries a sync call bridge alongside the async
    /// transport.
    pub with_sync: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            max_request_time: DEFAULT_REQUEST_TIMEOUT,
            with_sync: false,
        }
    }
}

pub struct Connection;

impl Connection {
    /// Create the two raw endpoints of a connection: an ordered, reliable,
    /// bidirectional frame stream between exactly two endpoints.
    pub fn pipe(options: ConnectionOptions) -> (RawEndpoint, RawEndpoint) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let (sync_a, sync_b) = if options.with_sync {
            let (a, b) = SyncBridge::pipe();
            (Some(a), Some(b))
        } else {
            (None, None)
        };
        (
            RawEndpoint {
                outbound: a_tx,
                inbound: b_rx,
                sync: sync_a,
                max_request_time: options.max_request_time,
            },
            RawEndpoint {
                outbound: b_tx,
                inbound: a_rx,
                sync: sync_b,
                max_request_time: options.max_request_time,
            },
        )
    }
}

/// An unbound endpoint half: owns the frame queues but serves nothing yet.
#[derive(Debug)]
pub struct RawEndpoint {
    outbound: mpsc::UnboundedSender<Frame>,
    inbound: mpsc::UnboundedReceiver<Frame>,
    sync: Option<RawSyncEndpoint>,
    max_request_time: Duration,
}

impl RawEndpoint {
    /// Bind this endpoint's dispatch table (and sync handlers, if the
    /// connection carries a bridge) and start serving.
    pub fn bind(self, table: DispatchTable, sync_handlers: Option<SyncHandlers>) -> Endpoint {
        let rpc = RpcTransport::spawn(table, self.outbound, self.inbound, self.max_request_time);
        let sync = match (self.sync, sync_handlers) {
            (Some(raw), handlers) => Some(raw.serve(handlers.unwrap_or_default())),
            (None, Some(_)) => {
                warn!("sync handlers supplied but the connection carries no sync bridge");
                None
            }
            (None, None) => None,
        };
        Endpoint { rpc, sync }
    }
}

/// A bound endpoint of a connection.
pub struct Endpoint {
    rpc: Arc<RpcTransport>,
    sync: Option<SyncEndpoint>,
}

impl Endpoint {
    /// Issue a correlated async request. See [`RpcTransport::request`].
    pub async fn request(&self, name: &str, args: Value) -> Result<Value, RpcError> {
        self.rpc.request(name, args).await
    }

    /// Fire-and-forget message. See [`RpcTransport::send`].
    pub fn send(&self, name: &str, payload: Value) -> Result<(), RpcError> {
        self.rpc.send(name, payload)
    }

    pub fn rpc(&self) -> &Arc<RpcTransport> {
        &self.rpc
    }

    /// The sync bridge endpoint, if this connection carries one.
    pub fn sync(&self) -> Option<&SyncEndpoint> {
        self.sync.as_ref()
    }

    /// Tear down the connection. Outstanding async requests and any blocked
    /// sync call — on either side — fail with `ConnectionClosed`.
    pub fn close(&self) {
        self.rpc.close();
        if let Some(sync) = &self.sync {
            sync.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.rpc.is_closed()
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{bind, Handlers, RpcSchema};
    use serde_json::json;

    #[tokio::test]
    async fn both_directions_carry_requests() {
        let (host_raw, content_raw) = Connection::pipe(ConnectionOptions::default());

        let host = host_raw.bind(
            bind(
                &RpcSchema::new().request("host_side"),
                Handlers::new().request("host_side", |_| async { Ok(json!("from host")) }),
            )
            .unwrap(),
            None,
        );
        let content = content_raw.bind(
            bind(
                &RpcSchema::new().request("content_side"),
                Handlers::new().request("content_side", |_| async { Ok(json!("from content")) }),
            )
            .unwrap(),
            None,
        );

        assert_eq!(
            content.request("host_side", json!({})).await.unwrap(),
            json!("from host")
        );
        assert_eq!(
            host.request("content_side", json!({})).await.unwrap(),
            json!("from content")
        );
    }

    #[tokio::test]
    async fn sync_bridge_rides_alongside_async() {
        let (host_raw, content_raw) = Connection::pipe(ConnectionOptions {
            with_sync: true,
            ..Default::default()
        });

        let host = host_raw.bind(
            bind(
                &RpcSchema::new().request("do_math"),
                Handlers::new().request("do_math", |args| async move {
                    let a = args["a"].as_i64().unwrap_or(0);
                    let b = args["b"].as_i64().unwrap_or(0);
                    Ok(json!(a + b))
                }),
            )
            .unwrap(),
            Some(SyncHandlers::new().handler("do_sync_math", |args| {
                let a = args["a"].as_i64().unwrap_or(0);
                let b = args["b"].as_i64().unwrap_or(0);
                Ok(json!(a * b))
            })),
        );
        let content = content_raw.bind(bind(&RpcSchema::new(), Handlers::new()).unwrap(), None);

        assert_eq!(
            content.request("do_math", json!({"a": 3, "b": 4})).await.unwrap(),
            json!(7)
        );
        let sync = content.sync().expect("bridge requested");
        assert_eq!(
            sync.call_sync("do_sync_math", json!({"a": 3, "b": 4})).unwrap(),
            json!(12)
        );
        drop(host);
    }

    #[tokio::test]
    async fn closing_one_endpoint_closes_the_bridge_for_both() {
        let (host_raw, content_raw) = Connection::pipe(ConnectionOptions {
            with_sync: true,
            ..Default::default()
        });
        let host = host_raw.bind(bind(&RpcSchema::new(), Handlers::new()).unwrap(), None);
        let content = content_raw.bind(bind(&RpcSchema::new(), Handlers::new()).unwrap(), None);

        host.close();
        let sync = content.sync().expect("bridge requested");
        let err = sync.call_sync("anything", json!({})).unwrap_err();
        assert!(matches!(err, RpcError::ConnectionClosed));
    }

    #[tokio::test]
    async fn message_reaches_specific_and_wildcard_across_the_pipe() {
        use std::sync::Mutex;
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let (host_raw, content_raw) = Connection::pipe(ConnectionOptions::default());
        let specific_seen = Arc::clone(&seen);
        let wildcard_seen = Arc::clone(&seen);
        let _host = host_raw.bind(
            bind(
                &RpcSchema::new().message("log_to_host"),
                Handlers::new()
                    .message("log_to_host", move |payload| {
                        specific_seen
                            .lock()
                            .unwrap()
                            .push(format!("specific:{}", payload["msg"].as_str().unwrap_or("")));
                    })
                    .on_any_message(move |name, _| {
                        wildcard_seen.lock().unwrap().push(format!("wildcard:{name}"));
                    }),
            )
            .unwrap(),
            None,
        );
        let content = content_raw.bind(bind(&RpcSchema::new(), Handlers::new()).unwrap(), None);

        content.send("log_to_host", json!({"msg": "hi"})).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let entries = seen.lock().unwrap();
        assert_eq!(
            *entries,
            vec!["specific:hi".to_string(), "wildcard:log_to_host".to_string()]
        );
    }
}
