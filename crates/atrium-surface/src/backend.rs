//! The seam to the rendering engine.
//!
//! The engine that actually paints surfaces and executes their script is an
//! external collaborator; this trait is the whole interface the core needs
//! from it. The engine must route every navigation attempt back through
//! [`crate::SurfaceRegistry::request_navigation`] before committing it, and
//! honor the returned decision exactly once.

use atrium_common::{Rect, SurfaceId, WindowId};

pub trait RenderBackend: Send + Sync {
    /// Realize window chrome for a newly created window.
    fn create_window(&self, window: WindowId, title: &str, frame: &Rect);

    /// Update a window's title.
    fn set_window_title(&self, window: WindowId, title: &str);

    /// Release a window's chrome.
    fn destroy_window(&self, window: WindowId);

    /// Realize a surface inside `window`. The preload reference, if any, is
    /// injected into the content context before the first navigation.
    fn attach(&self, surface: SurfaceId, window: WindowId, preload: Option<&str>);

    /// Commit a navigation the event chain has allowed.
    fn navigate(&self, surface: SurfaceId, url: &str);

    /// Run script in the surface's content context.
    fn execute_script(&self, surface: SurfaceId, js: &str);

    /// The surface is gone; release engine resources.
    fn detach(&self, surface: SurfaceId);
}
