//! Async RPC transport: correlated, timeout-bounded requests plus
//! uncorrelated one-way messages, multiplexed over one ordered connection.
//!
//! Each outgoing request registers a pending waiter keyed by a monotonically
//! assigned correlation id. The inbound pump resolves waiters as responses
//! arrive, dispatches inbound requests through the bound table, and delivers
//! messages. The pending table is owned exclusively by this transport and
//! mutated only by its send/receive paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::RpcError;
use crate::schema::DispatchTable;
use crate::wire::{Frame, WireError};

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, RpcError>>>>>;

/// One endpoint's async half of a connection.
pub struct RpcTransport {
    outbound: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    pending: PendingMap,
    next_id: AtomicU64,
    max_request_time: Duration,
    closed: Arc<AtomicBool>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl RpcTransport {
    /// Bind a dispatch table to one end of an ordered frame stream and start
    /// the inbound pump.
    pub(crate) fn spawn(
        table: DispatchTable,
        outbound: mpsc::UnboundedSender<Frame>,
        inbound: mpsc::UnboundedReceiver<Frame>,
        max_request_time: Duration,
    ) -> Arc<Self> {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let handle = tokio::spawn(pump(
            table,
            outbound.clone(),
            inbound,
            Arc::clone(&pending),
            Arc::clone(&closed),
        ));

        Arc::new(Self {
            outbound: Mutex::new(Some(outbound)),
            pending,
            next_id: AtomicU64::new(1),
            max_request_time,
            closed,
            pump: Mutex::new(Some(handle)),
        })
    }

    /// Issue a correlated request and await its reply.
    ///
    /// Resolves exactly once: with the handler's result, or with `Handler`,
    /// `UnknownRequest`, `Timeout`, or `ConnectionClosed`. The deadline runs
    /// from issue time, independently per request.
    pub async fn request(&self, name: &str, args: Value) -> Result<Value, RpcError> {
        if self.is_closed() {
            return Err(RpcError::ConnectionClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        let sent = {
            let outbound = self.outbound.lock().unwrap();
            match outbound.as_ref() {
                Some(out) => out
                    .send(Frame::Request {
                        id,
                        name: name.to_string(),
                        args,
                    })
                    .is_ok(),
                None => false,
            }
        };
        if !sent {
            self.pending.lock().unwrap().remove(&id);
            return Err(RpcError::ConnectionClosed);
        }

        match tokio::time::timeout(self.max_request_time, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Waiter dropped without a reply: the connection went away.
            Ok(Err(_)) => Err(RpcError::ConnectionClosed),
            Err(_elapsed) => {
                self.pending.lock().unwrap().remove(&id);
                debug!(request = %name, id, "request timed out");
                Err(RpcError::Timeout(self.max_request_time))
            }
        }
    }

    /// Fire-and-forget message: no correlation id, no acknowledgment. Never
    /// fails due to the remote side; fails synchronously only if the
    /// connection is already closed.
    pub fn send(&self, name: &str, payload: Value) -> Result<(), RpcError> {
        if self.is_closed() {
            return Err(RpcError::ConnectionClosed);
        }
        let outbound = self.outbound.lock().unwrap();
        match outbound.as_ref() {
            Some(out) => out
                .send(Frame::Message {
                    name: name.to_string(),
                    payload,
                })
                .map_err(|_| RpcError::ConnectionClosed),
            None => Err(RpcError::ConnectionClosed),
        }
    }

    /// Close this endpoint: reject every outstanding request with
    /// `ConnectionClosed`, stop the pump, and drop the outbound sender so the
    /// peer observes closure too.
    pub fn close(&self) {
        reject_pending(&self.pending, &self.closed);
        self.outbound.lock().unwrap().take();
        if let Some(handle) = self.pump.lock().unwrap().take() {
            handle.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn max_request_time(&self) -> Duration {
        self.max_request_time
    }

    /// Correlation ids still awaiting replies, sorted. Diagnostics only.
    pub fn pending_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.pending.lock().unwrap().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Drop for RpcTransport {
    fn drop(&mut self) {
        if let Some(handle) = self.pump.lock().unwrap().take() {
            handle.abort();
        }
    }
}

/// Inbound pump: delivers frames in the order they were written.
async fn pump(
    table: DispatchTable,
    outbound: mpsc::UnboundedSender<Frame>,
    mut inbound: mpsc::UnboundedReceiver<Frame>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
) {
    while let Some(frame) = inbound.recv().await {
        match frame {
            Frame::Request { id, name, args } => match table.request_handler(&name) {
                Some(handler) => {
                    // Each request runs on its own task so a slow handler
                    // cannot stall the pump. The task holds only a weak
                    // sender: a handler that never finishes must not keep the
                    // peer's inbound stream open past connection close.
                    let out = outbound.downgrade();
                    tokio::spawn(async move {
                        let reply = match handler(args).await {
                            Ok(result) => Frame::response_ok(id, result),
                            Err(e) => Frame::response_err(id, WireError::handler(e.to_string())),
                        };
                        if let Some(out) = out.upgrade() {
                            let _ = out.send(reply);
                        }
                    });
                }
                None => {
                    debug!(request = %name, id, "no handler for inbound request");
                    let _ = outbound.send(Frame::response_err(id, WireError::unknown_request(&name)));
                }
            },
            Frame::Message { name, payload } => table.dispatch_message(&name, payload),
            Frame::Response { id, result, error } => {
                let waiter = pending.lock().unwrap().remove(&id);
                match waiter {
                    Some(tx) => {
                        let outcome = match error {
                            Some(e) => Err(e.into_rpc_error()),
                            None => Ok(result.unwrap_or(Value::Null)),
                        };
                        let _ = tx.send(outcome);
                    }
                    // Late arrival after timeout, or a stale id.
                    None => debug!(id, "discarding response with no pending request"),
                }
            }
        }
    }
    // Peer dropped its sender: the connection is gone.
    reject_pending(&pending, &closed);
}

fn reject_pending(pending: &PendingMap, closed: &Arc<AtomicBool>) {
    if closed.swap(true, Ordering::SeqCst) {
        return;
    }
    let waiters: Vec<_> = pending.lock().unwrap().drain().collect();
    for (id, tx) in waiters {
        debug!(id, "rejecting pending request on connection close");
        let _ = tx.send(Err(RpcError::ConnectionClosed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, ConnectionOptions};
    use crate::schema::{bind, Handlers, RpcSchema};
    use serde_json::json;

    fn host_schema() -> RpcSchema {
        RpcSchema::new()
            .request("do_math")
            .request("never_returns")
            .request("fails")
            .request("slow")
            .message("log_to_host")
    }

    fn host_handlers() -> Handlers {
        Handlers::new()
            .request("do_math", |args| async move {
                let a = args["a"].as_i64().unwrap_or(0);
                let b = args["b"].as_i64().unwrap_or(0);
                Ok(json!(a + b))
            })
            .request("never_returns", |_| async {
                std::future::pending::<()>().await;
                Ok(Value::Null)
            })
            .request("fails", |_| async { Err(crate::HandlerError::new("boom")) })
            .request("slow", |args| async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(args)
            })
    }

    fn endpoints(
        max_request_time: Duration,
    ) -> (crate::connection::Endpoint, crate::connection::Endpoint) {
        let (host_raw, content_raw) = Connection::pipe(ConnectionOptions {
            max_request_time,
            with_sync: false,
        });
        let host = host_raw.bind(bind(&host_schema(), host_handlers()).unwrap(), None);
        let content = content_raw.bind(bind(&RpcSchema::new(), Handlers::new()).unwrap(), None);
        (host, content)
    }

    #[tokio::test]
    async fn round_trip_resolves_handler_result() {
        let (_host, content) = endpoints(DEFAULT_REQUEST_TIMEOUT);
        let result = content
            .request("do_math", json!({"a": 3, "b": 4}))
            .await
            .unwrap();
        assert_eq!(result, json!(7));
    }

    #[tokio::test]
    async fn unknown_request_is_reported() {
        let (_host, content) = endpoints(DEFAULT_REQUEST_TIMEOUT);
        let err = content.request("get_title", json!({})).await.unwrap_err();
        assert!(matches!(err, RpcError::UnknownRequest(ref n) if n == "get_title"));
    }

    #[tokio::test]
    async fn handler_failure_carries_remote_message() {
        let (_host, content) = endpoints(DEFAULT_REQUEST_TIMEOUT);
        let err = content.request("fails", json!({})).await.unwrap_err();
        assert!(matches!(err, RpcError::Handler(ref m) if m == "boom"));
    }

    #[tokio::test]
    async fn request_times_out_and_late_reply_is_discarded() {
        let (host, content) = endpoints(Duration::from_millis(50));

        let err = content.request("slow", json!({})).await.unwrap_err();
        assert!(matches!(err, RpcError::Timeout(_)));

        // The slow handler replies ~50ms after the deadline; the stale
        // response must be dropped without disturbing later requests.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(content.rpc().pending_ids().is_empty());

        let result = content
            .request("do_math", json!({"a": 1, "b": 2}))
            .await
            .unwrap();
        assert_eq!(result, json!(3));
        drop(host);
    }

    #[tokio::test]
    async fn each_request_is_timed_from_its_own_issue() {
        // The slow handler takes ~100ms against a 150ms deadline. The second
        // request is issued 60ms after the first; it only survives if its
        // deadline runs from its own issue time.
        let (_host, content) = endpoints(Duration::from_millis(150));

        let first = {
            let rpc = Arc::clone(content.rpc());
            tokio::spawn(async move { rpc.request("slow", json!({"n": 1})).await })
        };
        tokio::time::sleep(Duration::from_millis(60)).await;
        let second = content.request("slow", json!({"n": 2})).await;

        assert_eq!(first.await.unwrap().unwrap(), json!({"n": 1}));
        assert_eq!(second.unwrap(), json!({"n": 2}));
    }

    #[tokio::test]
    async fn close_rejects_all_outstanding_requests() {
        let (host, content) = endpoints(DEFAULT_REQUEST_TIMEOUT);

        let first = tokio::spawn({
            let rpc = Arc::clone(content.rpc());
            async move { rpc.request("never_returns", json!({})).await }
        });
        let second = tokio::spawn({
            let rpc = Arc::clone(content.rpc());
            async move { rpc.request("never_returns", json!({})).await }
        });

        // Let both requests register before tearing down.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(content.rpc().pending_ids().len(), 2);
        host.close();
        drop(host);

        let a = first.await.unwrap().unwrap_err();
        let b = second.await.unwrap().unwrap_err();
        assert!(matches!(a, RpcError::ConnectionClosed));
        assert!(matches!(b, RpcError::ConnectionClosed));
    }

    #[tokio::test]
    async fn send_fails_only_when_closed() {
        let (host, content) = endpoints(DEFAULT_REQUEST_TIMEOUT);
        assert!(content.send("log_to_host", json!({"msg": "hi"})).is_ok());

        content.close();
        let err = content.send("log_to_host", json!({"msg": "hi"})).unwrap_err();
        assert!(matches!(err, RpcError::ConnectionClosed));
        drop(host);
    }

    #[tokio::test]
    async fn request_after_close_fails_immediately() {
        let (host, content) = endpoints(DEFAULT_REQUEST_TIMEOUT);
        host.close();
        drop(host);

        // Give the content pump a moment to observe the dropped sender.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let err = content.request("do_math", json!({})).await.unwrap_err();
        assert!(matches!(err, RpcError::ConnectionClosed));
    }

    #[tokio::test]
    async fn correlation_ids_are_unique_while_outstanding() {
        let (_host, content) = endpoints(Duration::from_millis(500));
        let first = content.request("slow", json!({"n": 1}));
        let second = content.request("slow", json!({"n": 2}));

        // Both pending at once, under distinct ids.
        let pending = {
            let f = futures_util::future::join(first, second);
            tokio::pin!(f);
            tokio::select! {
                _ = &mut f => Vec::new(),
                _ = tokio::time::sleep(Duration::from_millis(30)) => content.rpc().pending_ids(),
            }
        };
        assert_eq!(pending.len(), 2);
        assert_ne!(pending[0], pending[1]);
    }
}
