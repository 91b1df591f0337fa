use std::time::Duration;

use atrium_common::Rect;
use atrium_rpc::{Handlers, RpcSchema, SyncHandlers, DEFAULT_REQUEST_TIMEOUT};

use crate::errors::RegistryError;

/// Configuration for a top-level window.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub frame: Rect,
}

impl WindowConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            frame: Rect::default(),
        }
    }

    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = frame;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), RegistryError> {
        if !self.frame.is_valid() {
            return Err(RegistryError::InvalidConfig(format!(
                "malformed window frame: {:?}",
                self.frame
            )));
        }
        Ok(())
    }
}

/// Configuration for a content surface: navigation target, preload script,
/// and the host side of its connection (schema binding, sync handler map,
/// request deadline).
pub struct SurfaceConfig {
    pub url: String,
    pub preload: Option<String>,
    pub schema: RpcSchema,
    pub handlers: Handlers,
    pub sync_handlers: Option<SyncHandlers>,
    pub max_request_time: Duration,
}

impl SurfaceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            preload: None,
            schema: RpcSchema::new(),
            handlers: Handlers::new(),
            sync_handlers: None,
            max_request_time: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Script reference injected into the content context before navigation.
    pub fn with_preload(mut self, preload: impl Into<String>) -> Self {
        self.preload = Some(preload.into());
        self
    }

    /// Schema and handler set for the host side of this surface's connection.
    pub fn with_rpc(mut self, schema: RpcSchema, handlers: Handlers) -> Self {
        self.schema = schema;
        self.handlers = handlers;
        self
    }

    /// Sync handlers served by the host; their presence gives the connection
    /// its sync bridge.
    pub fn with_sync(mut self, handlers: SyncHandlers) -> Self {
        self.sync_handlers = Some(handlers);
        self
    }

    pub fn with_max_request_time(mut self, max: Duration) -> Self {
        self.max_request_time = max;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), RegistryError> {
        if !is_valid_target(&self.url) {
            return Err(RegistryError::InvalidConfig(format!(
                "malformed navigation target: {:?}",
                self.url
            )));
        }
        if let Some(preload) = &self.preload {
            if !is_valid_target(preload) {
                return Err(RegistryError::InvalidConfig(format!(
                    "malformed preload reference: {preload:?}"
                )));
            }
        }
        if self.max_request_time.is_zero() {
            return Err(RegistryError::InvalidConfig(
                "max_request_time must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Navigation targets are scheme-qualified (`https://`, `views://`, ...)
/// or the blank document.
fn is_valid_target(url: &str) -> bool {
    if url == "about:blank" {
        return true;
    }
    match url.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric()) && !rest.is_empty()
        }
        None => false,
    }
}
