//! The surface registry: creation, lookup, teardown, and the navigation
//! interception entry point.

use std::collections::HashMap;
use std::sync::Arc;

use atrium_common::{SurfaceId, WindowId};
use atrium_events::{EventPipeline, Outcome, SurfaceEvent};
use atrium_rpc::{bind, Connection, ConnectionOptions, RawEndpoint};
use tracing::{debug, info};

use crate::backend::RenderBackend;
use crate::config::{SurfaceConfig, WindowConfig};
use crate::errors::RegistryError;
use crate::surface::{Surface, SurfaceState};
use crate::window::Window;

/// Tracks the set of live windows and surfaces and owns their connections.
///
/// Lookup by identifier is O(1); iteration over live entities follows
/// insertion order (stable for diagnostics, not semantically significant).
pub struct SurfaceRegistry {
    windows: HashMap<WindowId, Window>,
    window_order: Vec<WindowId>,
    surfaces: HashMap<SurfaceId, Surface>,
    surface_order: Vec<SurfaceId>,
    pipeline: Arc<EventPipeline>,
    backend: Arc<dyn RenderBackend>,
}

impl SurfaceRegistry {
    /// The pipeline and backend are injected: the pipeline is created at host
    /// startup and shared with the façade, the backend is the rendering
    /// engine seam.
    pub fn new(pipeline: Arc<EventPipeline>, backend: Arc<dyn RenderBackend>) -> Self {
        Self {
            windows: HashMap::new(),
            window_order: Vec::new(),
            surfaces: HashMap::new(),
            surface_order: Vec::new(),
            pipeline,
            backend,
        }
    }

    pub fn pipeline(&self) -> &Arc<EventPipeline> {
        &self.pipeline
    }

    /// Create a top-level window. Fails with `InvalidConfig` if the frame
    /// geometry is malformed.
    pub fn create_window(&mut self, config: WindowConfig) -> Result<WindowId, RegistryError> {
        config.validate()?;
        let id = WindowId::next();
        self.backend.create_window(id, &config.title, &config.frame);
        info!(window_id = %id, title = %config.title, "window created");
        self.windows
            .insert(id, Window::new(id, config.title, config.frame));
        self.window_order.push(id);
        Ok(id)
    }

    /// Create a surface inside `window_id`, bind the host side of its
    /// connection, and return the raw content side for the embedder to bind.
    ///
    /// Fails with `InvalidConfig` for a malformed target or preload, and with
    /// `SchemaMismatch` if a handler is registered for an undeclared name —
    /// both before any connection exists.
    pub fn create_surface(
        &mut self,
        window_id: WindowId,
        config: SurfaceConfig,
    ) -> Result<(SurfaceId, RawEndpoint), RegistryError> {
        if !self.windows.contains_key(&window_id) {
            return Err(RegistryError::UnknownWindow(window_id));
        }
        config.validate()?;
        let table = bind(&config.schema, config.handlers)?;

        let (host_raw, content_raw) = Connection::pipe(ConnectionOptions {
            max_request_time: config.max_request_time,
            with_sync: config.sync_handlers.is_some(),
        });
        let endpoint = host_raw.bind(table, config.sync_handlers);

        let id = SurfaceId::next();
        self.backend.attach(id, window_id, config.preload.as_deref());
        info!(surface_id = %id, window_id = %window_id, url = %config.url, "surface created");

        let surface = Surface::new(
            id,
            window_id,
            config.url,
            config.preload,
            endpoint,
            Arc::clone(&self.pipeline),
        );
        self.surfaces.insert(id, surface);
        self.surface_order.push(id);
        if let Some(window) = self.windows.get_mut(&window_id) {
            window.add_surface(id);
        }
        Ok((id, content_raw))
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    /// Live windows in creation order.
    pub fn windows(&self) -> impl Iterator<Item = &Window> {
        self.window_order.iter().filter_map(|id| self.windows.get(id))
    }

    /// Live surfaces in creation order.
    pub fn surfaces(&self) -> impl Iterator<Item = &Surface> {
        self.surface_order.iter().filter_map(|id| self.surfaces.get(id))
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Ask the event chain whether `surface_id` may navigate to `url`, and
    /// commit the navigation through the backend if it may.
    ///
    /// The rendering engine must call this before committing any navigation;
    /// the returned decision is the chain's final response, consumed exactly
    /// once here.
    pub fn request_navigation(
        &mut self,
        surface_id: SurfaceId,
        url: impl Into<String>,
    ) -> Result<bool, RegistryError> {
        let url = url.into();
        if !self.surfaces.contains_key(&surface_id) {
            return Err(RegistryError::UnknownSurface(surface_id));
        }

        let event = SurfaceEvent::WillNavigate {
            surface_id,
            url: url.clone(),
        };
        let allowed = self.pipeline.dispatch(&event).resolve() == Outcome::Allow;

        if allowed {
            if let Some(surface) = self.surfaces.get_mut(&surface_id) {
                surface.set_state(SurfaceState::Loading);
                surface.set_url(url.clone());
            }
            self.backend.navigate(surface_id, &url);
            debug!(surface_id = %surface_id, url = %url, "navigation allowed");
        } else {
            debug!(surface_id = %surface_id, url = %url, "navigation denied");
        }
        Ok(allowed)
    }

    /// The engine reports a finished load: the surface becomes `Ready` and a
    /// `DidNavigate` notification runs through the chain.
    pub fn mark_ready(&mut self, surface_id: SurfaceId) -> Result<(), RegistryError> {
        let url = {
            let surface = self
                .surfaces
                .get_mut(&surface_id)
                .ok_or(RegistryError::UnknownSurface(surface_id))?;
            surface.set_state(SurfaceState::Ready);
            surface.url().to_string()
        };
        self.pipeline
            .dispatch(&SurfaceEvent::DidNavigate { surface_id, url });
        Ok(())
    }

    /// The engine reports a document title change. Notification only.
    pub fn notify_title_changed(
        &mut self,
        surface_id: SurfaceId,
        title: impl Into<String>,
    ) -> Result<(), RegistryError> {
        if !self.surfaces.contains_key(&surface_id) {
            return Err(RegistryError::UnknownSurface(surface_id));
        }
        self.pipeline.dispatch(&SurfaceEvent::TitleChanged {
            surface_id,
            title: title.into(),
        });
        Ok(())
    }

    /// Run script in a surface's content context.
    pub fn execute_script(&self, surface_id: SurfaceId, js: &str) -> Result<(), RegistryError> {
        if !self.surfaces.contains_key(&surface_id) {
            return Err(RegistryError::UnknownSurface(surface_id));
        }
        self.backend.execute_script(surface_id, js);
        Ok(())
    }

    pub fn set_window_title(
        &mut self,
        window_id: WindowId,
        title: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let window = self
            .windows
            .get_mut(&window_id)
            .ok_or(RegistryError::UnknownWindow(window_id))?;
        let title = title.into();
        self.backend.set_window_title(window_id, &title);
        window.set_title(title);
        Ok(())
    }

    /// Destroy a surface: tear down its connection (rejecting outstanding
    /// async requests and any blocked sync call with `ConnectionClosed`),
    /// unregister its event handlers, and release its engine resources.
    pub fn destroy_surface(&mut self, surface_id: SurfaceId) -> Result<(), RegistryError> {
        let mut surface = self
            .surfaces
            .remove(&surface_id)
            .ok_or(RegistryError::UnknownSurface(surface_id))?;
        self.surface_order.retain(|id| *id != surface_id);

        surface.set_state(SurfaceState::Destroyed);
        surface.endpoint().close();
        self.pipeline
            .dispatch(&SurfaceEvent::SurfaceDestroyed { surface_id });
        self.pipeline.remove_surface(surface_id);
        self.backend.detach(surface_id);

        if let Some(window) = self.windows.get_mut(&surface.window_id()) {
            window.remove_surface(surface_id);
        }
        info!(surface_id = %surface_id, "surface destroyed");
        Ok(())
    }

    /// Destroy a window and, cascading, every surface it contains.
    pub fn destroy_window(&mut self, window_id: WindowId) -> Result<(), RegistryError> {
        if !self.windows.contains_key(&window_id) {
            return Err(RegistryError::UnknownWindow(window_id));
        }
        let contained: Vec<SurfaceId> = self
            .windows
            .get(&window_id)
            .map(|w| w.surfaces().to_vec())
            .unwrap_or_default();
        for surface_id in contained {
            self.destroy_surface(surface_id)?;
        }
        self.windows.remove(&window_id);
        self.window_order.retain(|id| *id != window_id);
        self.backend.destroy_window(window_id);
        info!(window_id = %window_id, "window destroyed");
        Ok(())
    }

    /// Destroy everything. Used during graceful shutdown.
    pub fn destroy_all(&mut self) {
        let windows: Vec<WindowId> = self.window_order.clone();
        for window_id in windows {
            let _ = self.destroy_window(window_id);
        }
    }
}
