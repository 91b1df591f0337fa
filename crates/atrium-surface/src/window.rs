use atrium_common::{Rect, SurfaceId, WindowId};

/// A top-level container. Owns its surfaces' lifetime: destroying a window
/// destroys its surfaces.
#[derive(Debug)]
pub struct Window {
    id: WindowId,
    title: String,
    frame: Rect,
    surfaces: Vec<SurfaceId>,
}

impl Window {
    pub(crate) fn new(id: WindowId, title: String, frame: Rect) -> Self {
        Self {
            id,
            title,
            frame,
            surfaces: Vec::new(),
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    /// Contained surfaces, in creation order.
    pub fn surfaces(&self) -> &[SurfaceId] {
        &self.surfaces
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub(crate) fn add_surface(&mut self, id: SurfaceId) {
        self.surfaces.push(id);
    }

    pub(crate) fn remove_surface(&mut self, id: SurfaceId) {
        self.surfaces.retain(|s| *s != id);
    }
}
