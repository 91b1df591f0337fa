//! Ordered handler chain over one shared response.
//!
//! The pipeline is an explicit registry with a documented lifecycle: created
//! at host startup, injected into the surface registry, torn down at
//! shutdown. It is not a request/response path — dispatch is synchronous,
//! in-process, and sequential, because the decision must exist before the
//! triggering action proceeds.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use atrium_common::SurfaceId;
use tracing::{debug, error};

use crate::event::{EventKind, EventResponse, SurfaceEvent};

pub type EventHandler = Arc<dyn Fn(&SurfaceEvent, &mut EventResponse) + Send + Sync>;

/// Registry and dispatcher for lifecycle event handlers.
#[derive(Default)]
pub struct EventPipeline {
    global: Mutex<HashMap<EventKind, Vec<EventHandler>>>,
    per_surface: Mutex<HashMap<(SurfaceId, EventKind), EventHandler>>,
}

impl EventPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process-wide handler for `kind`. Handlers run in
    /// registration order, before any per-surface handler.
    pub fn on_global<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&SurfaceEvent, &mut EventResponse) + Send + Sync + 'static,
    {
        self.global
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Register the per-surface handler for `kind` on one surface. A surface
    /// has at most one handler per kind; a second registration replaces the
    /// first.
    pub fn on_surface<F>(&self, surface_id: SurfaceId, kind: EventKind, handler: F)
    where
        F: Fn(&SurfaceEvent, &mut EventResponse) + Send + Sync + 'static,
    {
        self.per_surface
            .lock()
            .unwrap()
            .insert((surface_id, kind), Arc::new(handler));
    }

    /// Drop every per-surface handler registered for `surface_id`.
    pub fn remove_surface(&self, surface_id: SurfaceId) {
        self.per_surface
            .lock()
            .unwrap()
            .retain(|(id, _), _| *id != surface_id);
    }

    /// Deliver `event` through the chain and return the final response.
    ///
    /// Invocation order: process-wide handlers for the event's kind in
    /// registration order, then the owning surface's handler if present. All
    /// handlers share the one response; each sees mutations made by earlier
    /// ones. A panicking handler is logged, its partial write to the response
    /// is undone, and the rest of the chain still runs.
    pub fn dispatch(&self, event: &SurfaceEvent) -> EventResponse {
        let kind = event.kind();
        let chain: Vec<EventHandler> = {
            let global = self.global.lock().unwrap();
            let mut chain: Vec<EventHandler> =
                global.get(&kind).map(|v| v.to_vec()).unwrap_or_default();
            let per_surface = self.per_surface.lock().unwrap();
            if let Some(handler) = per_surface.get(&(event.surface_id(), kind)) {
                chain.push(Arc::clone(handler));
            }
            chain
        };

        let mut response = EventResponse::new();
        for handler in &chain {
            let snapshot = response.snapshot();
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(event, &mut response)));
            if outcome.is_err() {
                error!(surface_id = %event.surface_id(), kind = ?kind, "event handler panicked");
                response.restore(snapshot);
            }
        }
        debug!(
            surface_id = %event.surface_id(),
            kind = ?kind,
            handlers = chain.len(),
            was_set = response.was_set(),
            "event dispatched"
        );
        response
    }
}
