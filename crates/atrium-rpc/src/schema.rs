//! Schema declaration and binding.
//!
//! A schema is the declaration-time contract for one endpoint of one
//! connection: the set of request names and message names it is willing to
//! handle. Binding validates a handler set against the schema and produces an
//! immutable dispatch table the transport invokes for inbound traffic.

use std::collections::{BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::error;

use crate::errors::{HandlerError, SchemaMismatch};

pub type RequestHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, HandlerError>> + Send + Sync>;
pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync>;
pub type WildcardHandler = Arc<dyn Fn(&str, Value) + Send + Sync>;

/// Declared request and message names for one endpoint of one connection.
#[derive(Debug, Clone, Default)]
pub struct RpcSchema {
    requests: BTreeSet<String>,
    messages: BTreeSet<String>,
}

impl RpcSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a request name (correlated call with a reply).
    pub fn request(mut self, name: impl Into<String>) -> Self {
        self.requests.insert(name.into());
        self
    }

    /// Declare a message name (fire-and-forget).
    pub fn message(mut self, name: impl Into<String>) -> Self {
        self.messages.insert(name.into());
        self
    }

    pub fn declares_request(&self, name: &str) -> bool {
        self.requests.contains(name)
    }

    pub fn declares_message(&self, name: &str) -> bool {
        self.messages.contains(name)
    }
}

/// Handler set registered against a schema at bind time.
///
/// Request handlers are async and report failures to the remote caller.
/// Message handlers are plain callbacks; the optional wildcard observer
/// additionally receives every message, after any specific handler.
#[derive(Default)]
pub struct Handlers {
    requests: HashMap<String, RequestHandler>,
    messages: HashMap<String, MessageHandler>,
    wildcard: Option<WildcardHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        let handler: RequestHandler = Arc::new(move |args| Box::pin(f(args)));
        self.requests.insert(name.into(), handler);
        self
    }

    pub fn message<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.messages.insert(name.into(), Arc::new(f));
        self
    }

    /// Register the wildcard observer. It sees every inbound message name and
    /// payload, whether or not a specific handler exists.
    pub fn on_any_message<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Value) + Send + Sync + 'static,
    {
        self.wildcard = Some(Arc::new(f));
        self
    }
}

/// Validate `handlers` against `schema` and produce the dispatch table.
///
/// Fails with `SchemaMismatch` if any handler is registered under a name the
/// schema does not declare. The wildcard observer is not a schema name and is
/// always accepted.
pub fn bind(schema: &RpcSchema, handlers: Handlers) -> Result<DispatchTable, SchemaMismatch> {
    for name in handlers.requests.keys() {
        if !schema.declares_request(name) {
            return Err(SchemaMismatch::Request(name.clone()));
        }
    }
    for name in handlers.messages.keys() {
        if !schema.declares_message(name) {
            return Err(SchemaMismatch::Message(name.clone()));
        }
    }
    Ok(DispatchTable {
        requests: handlers.requests,
        messages: handlers.messages,
        wildcard: handlers.wildcard,
    })
}

/// Immutable dispatch table for one endpoint of one connection. Safe to
/// invoke concurrently from multiple inbound calls.
pub struct DispatchTable {
    requests: HashMap<String, RequestHandler>,
    messages: HashMap<String, MessageHandler>,
    wildcard: Option<WildcardHandler>,
}

impl DispatchTable {
    pub(crate) fn request_handler(&self, name: &str) -> Option<RequestHandler> {
        self.requests.get(name).cloned()
    }

    /// Deliver a message: specific handler first, then the wildcard observer.
    ///
    /// Messages have no caller to report to, so handler panics are logged and
    /// swallowed; one misbehaving handler cannot break the connection or keep
    /// the other slot from running.
    pub fn dispatch_message(&self, name: &str, payload: Value) {
        if let Some(handler) = self.messages.get(name) {
            let specific_payload = payload.clone();
            if catch_unwind(AssertUnwindSafe(|| handler(specific_payload))).is_err() {
                error!(message = %name, "message handler panicked");
            }
        }
        if let Some(wildcard) = &self.wildcard {
            if catch_unwind(AssertUnwindSafe(|| wildcard(name, payload))).is_err() {
                error!(message = %name, "wildcard message handler panicked");
            }
        }
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("requests", &self.requests.keys().collect::<Vec<_>>())
            .field("messages", &self.messages.keys().collect::<Vec<_>>())
            .field("wildcard", &self.wildcard.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn math_schema() -> RpcSchema {
        RpcSchema::new()
            .request("do_math")
            .message("log_to_host")
            .message("status")
    }

    #[test]
    fn bind_accepts_declared_names() {
        let handlers = Handlers::new()
            .request("do_math", |args| async move {
                let a = args["a"].as_i64().unwrap_or(0);
                let b = args["b"].as_i64().unwrap_or(0);
                Ok(json!(a + b))
            })
            .message("log_to_host", |_payload| {});
        assert!(bind(&math_schema(), handlers).is_ok());
    }

    #[test]
    fn bind_accepts_empty_handlers() {
        assert!(bind(&math_schema(), Handlers::new()).is_ok());
        assert!(bind(&RpcSchema::new(), Handlers::new()).is_ok());
    }

    #[test]
    fn bind_rejects_undeclared_request() {
        let handlers = Handlers::new().request("not_declared", |_| async { Ok(Value::Null) });
        let err = bind(&math_schema(), handlers).unwrap_err();
        assert!(matches!(err, SchemaMismatch::Request(ref n) if n == "not_declared"));
    }

    #[test]
    fn bind_rejects_undeclared_message() {
        let handlers = Handlers::new().message("not_declared", |_| {});
        let err = bind(&math_schema(), handlers).unwrap_err();
        assert!(matches!(err, SchemaMismatch::Message(ref n) if n == "not_declared"));
    }

    #[test]
    fn specific_then_wildcard_exactly_once() {
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let specific_log = Arc::clone(&log);
        let wildcard_log = Arc::clone(&log);
        let handlers = Handlers::new()
            .message("log_to_host", move |payload| {
                specific_log
                    .lock()
                    .unwrap()
                    .push(format!("specific:{}", payload["msg"].as_str().unwrap()));
            })
            .on_any_message(move |name, payload| {
                wildcard_log
                    .lock()
                    .unwrap()
                    .push(format!("wildcard:{name}:{}", payload["msg"].as_str().unwrap()));
            });

        let table = bind(&math_schema(), handlers).unwrap();
        table.dispatch_message("log_to_host", json!({"msg": "hi"}));

        let entries = log.lock().unwrap();
        assert_eq!(
            *entries,
            vec!["specific:hi".to_string(), "wildcard:log_to_host:hi".to_string()]
        );
    }

    #[test]
    fn wildcard_receives_messages_without_specific_handler() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let wildcard_seen = Arc::clone(&seen);
        let handlers = Handlers::new().on_any_message(move |name, _payload| {
            wildcard_seen.lock().unwrap().push(name.to_string());
        });

        let table = bind(&math_schema(), handlers).unwrap();
        table.dispatch_message("status", json!({}));

        assert_eq!(*seen.lock().unwrap(), vec!["status".to_string()]);
    }

    #[test]
    fn panicking_specific_handler_does_not_stop_wildcard() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let wildcard_seen = Arc::clone(&seen);
        let handlers = Handlers::new()
            .message("log_to_host", |_| panic!("bad handler"))
            .on_any_message(move |name, _| {
                wildcard_seen.lock().unwrap().push(name.to_string());
            });

        let table = bind(&math_schema(), handlers).unwrap();
        table.dispatch_message("log_to_host", json!({"msg": "hi"}));

        assert_eq!(*seen.lock().unwrap(), vec!["log_to_host".to_string()]);
    }
}
