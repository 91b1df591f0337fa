//! A render backend that only logs.
//!
//! Stands in for a real engine when the host runs without one (demo mode,
//! tests, CI). Every call the core would make against an engine is visible in
//! the log output.

use atrium_common::{Rect, SurfaceId, WindowId};
use atrium_surface::RenderBackend;
use tracing::{debug, info};

#[derive(Default)]
pub struct HeadlessBackend;

impl RenderBackend for HeadlessBackend {
    fn create_window(&self, window: WindowId, title: &str, frame: &Rect) {
        info!(window_id = %window, title = %title, ?frame, "create window chrome");
    }

    fn set_window_title(&self, window: WindowId, title: &str) {
        info!(window_id = %window, title = %title, "set window title");
    }

    fn destroy_window(&self, window: WindowId) {
        info!(window_id = %window, "destroy window chrome");
    }

    fn attach(&self, surface: SurfaceId, window: WindowId, preload: Option<&str>) {
        info!(surface_id = %surface, window_id = %window, ?preload, "attach surface");
    }

    fn navigate(&self, surface: SurfaceId, url: &str) {
        info!(surface_id = %surface, url = %url, "navigate");
    }

    fn execute_script(&self, surface: SurfaceId, js: &str) {
        debug!(surface_id = %surface, js = %js, "execute script");
    }

    fn detach(&self, surface: SurfaceId) {
        info!(surface_id = %surface, "detach surface");
    }
}
