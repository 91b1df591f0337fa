use std::sync::Arc;

use atrium_common::{SurfaceId, WindowId};
use atrium_events::{EventKind, EventPipeline, EventResponse, SurfaceEvent};
use atrium_rpc::{Endpoint, RpcError, RpcTransport, SyncEndpoint};
use serde_json::Value;
use tracing::{debug, warn};

/// Lifecycle of a content surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Created,
    Loading,
    Ready,
    Destroyed,
}

/// One content-rendering context, owned exclusively by the registry. Holds
/// the host end of the surface's connection.
pub struct Surface {
    id: SurfaceId,
    window_id: WindowId,
    url: String,
    preload: Option<String>,
    state: SurfaceState,
    endpoint: Endpoint,
    pipeline: Arc<EventPipeline>,
}

impl Surface {
    pub(crate) fn new(
        id: SurfaceId,
        window_id: WindowId,
        url: String,
        preload: Option<String>,
        endpoint: Endpoint,
        pipeline: Arc<EventPipeline>,
    ) -> Self {
        Self {
            id,
            window_id,
            url,
            preload,
            state: SurfaceState::Created,
            endpoint,
            pipeline,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    /// Current navigation target (best-effort tracking).
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn preload(&self) -> Option<&str> {
        self.preload.as_deref()
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// The host end of this surface's connection.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn rpc(&self) -> &Arc<RpcTransport> {
        self.endpoint.rpc()
    }

    pub fn sync(&self) -> Option<&SyncEndpoint> {
        self.endpoint.sync()
    }

    /// Issue an async request to this surface's content process.
    pub async fn request(&self, name: &str, args: Value) -> Result<Value, RpcError> {
        self.endpoint.request(name, args).await
    }

    /// Fire-and-forget message to the content process.
    pub fn send(&self, name: &str, payload: Value) -> Result<(), RpcError> {
        self.endpoint.send(name, payload)
    }

    /// Register this surface's handler for `kind`. It runs after every
    /// process-wide handler, sharing the same response.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&SurfaceEvent, &mut EventResponse) + Send + Sync + 'static,
    {
        self.pipeline.on_surface(self.id, kind, handler);
    }

    pub(crate) fn set_url(&mut self, url: String) {
        self.url = url;
    }

    pub(crate) fn set_state(&mut self, next: SurfaceState) {
        let legal = match next {
            SurfaceState::Created => false,
            SurfaceState::Loading => self.state != SurfaceState::Destroyed,
            SurfaceState::Ready => self.state == SurfaceState::Loading,
            SurfaceState::Destroyed => true,
        };
        if legal {
            debug!(surface_id = %self.id, from = ?self.state, to = ?next, "surface state");
            self.state = next;
        } else {
            warn!(
                surface_id = %self.id,
                from = ?self.state,
                to = ?next,
                "ignoring illegal surface state transition"
            );
        }
    }
}
