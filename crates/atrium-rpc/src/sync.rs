//! Sync call bridge: a blocking call path that suspends the caller until the
//! other side replies.
//!
//! Deliberately a distinct channel from the async transport — one caller
//! fully suspended, exactly one outstanding exchange per direction — so the
//! two state machines and their error kinds never mix. Each endpoint services
//! inbound sync calls on a dedicated thread; callers block on plain std
//! channels. No deadline is imposed: only connection close can unblock a
//! caller whose peer never replies.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::errors::{HandlerError, RpcError};

pub type SyncHandler = Arc<dyn Fn(Value) -> Result<Value, HandlerError> + Send + Sync>;

/// Named sync handler map for one endpoint. Sync handlers are plain blocking
/// functions; the bridge exists precisely because the caller cannot proceed
/// until they return.
#[derive(Default)]
pub struct SyncHandlers {
    handlers: HashMap<String, SyncHandler>,
}

impl SyncHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(f));
        self
    }

    fn get(&self, name: &str) -> Option<SyncHandler> {
        self.handlers.get(name).cloned()
    }
}

/// How often a blocked caller or an idle service thread re-checks the
/// bridge's closed flag. Sync calls themselves have no deadline.
const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(50);

struct SyncExchange {
    name: String,
    args: Value,
    reply: Sender<Result<Value, RpcError>>,
}

/// State shared by both endpoints of one bridge.
#[derive(Debug)]
struct Shared {
    closed: AtomicBool,
    /// Thread currently executing a sync handler, per endpoint side.
    serving: [Mutex<Option<ThreadId>>; 2],
}

#[derive(Debug, Clone, Copy)]
enum Side {
    A = 0,
    B = 1,
}

pub(crate) struct SyncBridge;

impl SyncBridge {
    /// Create the two raw halves of a bridge. Each half is bound to its
    /// handler map via [`RawSyncEndpoint::serve`].
    pub(crate) fn pipe() -> (RawSyncEndpoint, RawSyncEndpoint) {
        let shared = Arc::new(Shared {
            closed: AtomicBool::new(false),
            serving: [Mutex::new(None), Mutex::new(None)],
        });
        let (a_tx, a_rx) = mpsc::channel();
        let (b_tx, b_rx) = mpsc::channel();
        (
            RawSyncEndpoint {
                to_peer: a_tx,
                incoming: b_rx,
                shared: Arc::clone(&shared),
                side: Side::A,
            },
            RawSyncEndpoint {
                to_peer: b_tx,
                incoming: a_rx,
                shared,
                side: Side::B,
            },
        )
    }
}

/// An unbound bridge half: owns its channels but serves nothing yet.
#[derive(Debug)]
pub(crate) struct RawSyncEndpoint {
    to_peer: Sender<SyncExchange>,
    incoming: Receiver<SyncExchange>,
    shared: Arc<Shared>,
    side: Side,
}

impl RawSyncEndpoint {
    /// Start this endpoint's service thread with its handler map.
    pub(crate) fn serve(self, handlers: SyncHandlers) -> SyncEndpoint {
        let shared = Arc::clone(&self.shared);
        let side = self.side;
        let incoming = self.incoming;
        thread::spawn(move || service_loop(incoming, handlers, shared, side));
        SyncEndpoint {
            to_peer: self.to_peer,
            in_flight: AtomicBool::new(false),
            shared: self.shared,
            side: self.side,
        }
    }
}

fn service_loop(
    incoming: Receiver<SyncExchange>,
    handlers: SyncHandlers,
    shared: Arc<Shared>,
    side: Side,
) {
    loop {
        if shared.closed.load(Ordering::SeqCst) {
            break;
        }
        let exchange = match incoming.recv_timeout(CLOSE_POLL_INTERVAL) {
            Ok(exchange) => exchange,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let result = match handlers.get(&exchange.name) {
            Some(handler) => {
                *shared.serving[side as usize].lock().unwrap() = Some(thread::current().id());
                let args = exchange.args;
                let outcome = catch_unwind(AssertUnwindSafe(|| handler(args)))
                    .unwrap_or_else(|_| Err(HandlerError::new("sync handler panicked")));
                *shared.serving[side as usize].lock().unwrap() = None;
                outcome.map_err(|e| RpcError::Handler(e.to_string()))
            }
            None => Err(RpcError::UnknownRequest(exchange.name.clone())),
        };
        let _ = exchange.reply.send(result);
    }
    debug!(side = ?side, "sync bridge service thread stopped");
}

/// A bound endpoint of the sync bridge.
pub struct SyncEndpoint {
    to_peer: Sender<SyncExchange>,
    in_flight: AtomicBool,
    shared: Arc<Shared>,
    side: Side,
}

impl SyncEndpoint {
    /// Blocking call across the connection. Suspends the calling thread until
    /// the peer's handler for `name` returns.
    ///
    /// Exactly one call may be outstanding per direction; a second attempt
    /// fails with `SyncCallInFlight`. A handler serving a call on this
    /// endpoint must not call back across the same connection — the original
    /// caller is suspended and can never service it — so such an attempt
    /// fails with `SyncReentryDeadlock`.
    pub fn call_sync(&self, name: &str, args: Value) -> Result<Value, RpcError> {
        if self.is_closed() {
            return Err(RpcError::ConnectionClosed);
        }
        let serving = *self.shared.serving[self.side as usize].lock().unwrap();
        if serving == Some(thread::current().id()) {
            return Err(RpcError::SyncReentryDeadlock);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RpcError::SyncCallInFlight);
        }

        let result = self.exchange(name, args);
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    fn exchange(&self, name: &str, args: Value) -> Result<Value, RpcError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let exchange = SyncExchange {
            name: name.to_string(),
            args,
            reply: reply_tx,
        };
        if self.to_peer.send(exchange).is_err() {
            return Err(RpcError::ConnectionClosed);
        }
        loop {
            match reply_rx.recv_timeout(CLOSE_POLL_INTERVAL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => {
                    if self.is_closed() {
                        return Err(RpcError::ConnectionClosed);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Err(RpcError::ConnectionClosed),
            }
        }
    }

    /// Close the bridge for both endpoints. Blocked callers fail with
    /// `ConnectionClosed`; service threads stop.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}
