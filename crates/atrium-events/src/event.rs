//! Event types and the shared response record.

use atrium_common::SurfaceId;

/// Kind of a lifecycle event, used as the registration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A navigation is about to happen. The chain decides whether it may.
    WillNavigate,
    /// A navigation committed. Notification only.
    DidNavigate,
    /// The surface's document title changed. Notification only.
    TitleChanged,
    /// The surface was destroyed. Notification only.
    SurfaceDestroyed,
}

/// One dispatched lifecycle event. Handlers see this data immutably.
#[derive(Debug, Clone)]
pub enum SurfaceEvent {
    WillNavigate { surface_id: SurfaceId, url: String },
    DidNavigate { surface_id: SurfaceId, url: String },
    TitleChanged { surface_id: SurfaceId, title: String },
    SurfaceDestroyed { surface_id: SurfaceId },
}

impl SurfaceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::WillNavigate { .. } => EventKind::WillNavigate,
            Self::DidNavigate { .. } => EventKind::DidNavigate,
            Self::TitleChanged { .. } => EventKind::TitleChanged,
            Self::SurfaceDestroyed { .. } => EventKind::SurfaceDestroyed,
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        match self {
            Self::WillNavigate { surface_id, .. }
            | Self::DidNavigate { surface_id, .. }
            | Self::TitleChanged { surface_id, .. }
            | Self::SurfaceDestroyed { surface_id } => *surface_id,
        }
    }
}

/// Outcome a handler chain may decide for an interceptable event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allow,
    Deny,
}

/// The one record deliberately shared across a dispatch traversal.
///
/// Every handler in the chain may read whether an earlier handler already set
/// an outcome, overwrite it, or clear it back to unset; last write wins. The
/// record lives for a single traversal — handlers must not retain it, which
/// the `&mut` borrow enforces — and is consumed exactly once by the enforcing
/// collaborator via [`EventResponse::resolve`].
#[derive(Debug, Default)]
pub struct EventResponse {
    outcome: Option<Outcome>,
}

impl EventResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any handler so far has set an outcome.
    pub fn was_set(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn set(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }

    /// Return the decision to the unset state, restoring the default.
    pub fn clear(&mut self) {
        self.outcome = None;
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Final outcome after the chain completes. If no handler ever set a
    /// response, the default is `Allow`.
    pub fn resolve(self) -> Outcome {
        self.outcome.unwrap_or(Outcome::Allow)
    }

    pub(crate) fn snapshot(&self) -> Option<Outcome> {
        self.outcome
    }

    pub(crate) fn restore(&mut self, snapshot: Option<Outcome>) {
        self.outcome = snapshot;
    }
}
