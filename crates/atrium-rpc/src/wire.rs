//! Logical wire frames for a connection's async channel.
//!
//! JSON is the reference encoding; the embedder owns physical framing.
//! `id` is opaque to the wire and only required to be unique while the
//! request is outstanding on its connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::RpcError;

/// Frames exchanged over the async channel, in write order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Request {
        id: u64,
        name: String,
        args: Value,
    },
    Response {
        id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<WireError>,
    },
    Message {
        name: String,
        payload: Value,
    },
}

impl Frame {
    pub fn response_ok(id: u64, result: Value) -> Self {
        Self::Response {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn response_err(id: u64, error: WireError) -> Self {
        Self::Response {
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Parse a frame from a raw JSON string.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Error shape carried inside a response frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub kind: WireErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireErrorKind {
    Handler,
    UnknownRequest,
}

impl WireError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self {
            kind: WireErrorKind::Handler,
            message: message.into(),
        }
    }

    pub fn unknown_request(name: impl Into<String>) -> Self {
        Self {
            kind: WireErrorKind::UnknownRequest,
            message: name.into(),
        }
    }

    /// Reconstruct the caller-facing error on the requesting side.
    pub fn into_rpc_error(self) -> RpcError {
        match self.kind {
            WireErrorKind::Handler => RpcError::Handler(self.message),
            WireErrorKind::UnknownRequest => RpcError::UnknownRequest(self.message),
        }
    }
}
