use tokio::task::JoinHandle;

use crate::error::{BoardError, Result};
use crate::models::ApplicationPatch;
use crate::status::Status;
use crate::store::{ApplicationCollection, ApplicationStore, PatchOutcome};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub id: String,
    /// Set when the target is a column's empty space.
    pub zone: Option<Status>,
}

impl DropTarget {
    pub fn zone(status: Status) -> Self {
        Self {
            id: status.as_str().to_string(),
            zone: Some(status),
        }
    }

    /// A target known only by its element id: a card, or something else.
    pub fn element(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            zone: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Zone(Status),
    Card { id: String, status: Status },
    Symbol(Status),
}

impl Resolution {
    pub fn status(&self) -> Status {
        match self {
            Resolution::Zone(s) | Resolution::Symbol(s) => *s,
            Resolution::Card { status, .. } => *status,
        }
    }
}

/// Resolve a drop target against the cache. First match wins:
/// status zone, then a card (its current status), then an id spelled exactly
/// like a status.
pub fn resolve_target(target: &DropTarget, cache: &ApplicationCollection) -> Option<Resolution> {
    if let Some(status) = target.zone {
        return Some(Resolution::Zone(status));
    }
    if let Some(card) = cache.get(&target.id) {
        return Some(Resolution::Card {
            id: card.id.clone(),
            status: card.status,
        });
    }
    Status::from_symbol(&target.id).map(Resolution::Symbol)
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragPhase {
    Idle,
    Pressed { source: String, origin: Point },
    Dragging { source: String },
    Resolving { source: String },
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    NoTarget,
    UnresolvableTarget(String),
    UnknownSource(String),
    NotActivated,
}

#[derive(Debug)]
pub enum DragOutcome {
    Cancelled(CancelReason),
    /// Target status equals the current one; nothing was sent.
    Unchanged { id: String, status: Status },
    Dispatched {
        id: String,
        from: Status,
        to: Status,
        handle: JoinHandle<PatchOutcome>,
    },
}

pub struct DragReconciler {
    store: ApplicationStore,
    phase: DragPhase,
    activation_distance: f64,
}

impl DragReconciler {
    pub fn new(store: ApplicationStore, activation_distance: f64) -> Self {
        Self {
            store,
            phase: DragPhase::Idle,
            activation_distance,
        }
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn store(&self) -> &ApplicationStore {
        &self.store
    }

    fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            DragPhase::Pressed { .. } | DragPhase::Dragging { .. } | DragPhase::Resolving { .. }
        )
    }

    // --- Raw pointer events ---

    pub fn pointer_down(&mut self, source: impl Into<String>, at: Point) -> Result<()> {
        if self.is_busy() {
            return Err(BoardError::InvalidDragState(format!(
                "pointer down while {:?}",
                self.phase
            )));
        }
        self.phase = DragPhase::Pressed {
            source: source.into(),
            origin: at,
        };
        Ok(())
    }

    pub fn pointer_move(&mut self, to: Point) -> bool {
        match &self.phase {
            DragPhase::Pressed { source, origin } => {
                if origin.distance(to) >= self.activation_distance {
                    let source = source.clone();
                    tracing::debug!(%source, "drag activated");
                    self.phase = DragPhase::Dragging { source };
                    true
                } else {
                    false
                }
            }
            DragPhase::Dragging { .. } => true,
            _ => false,
        }
    }

    /// Pointer release. A press that never activated is a click, not a drop.
    pub fn pointer_up(&mut self, target: Option<DropTarget>) -> Result<DragOutcome> {
        match self.phase {
            DragPhase::Pressed { .. } => {
                self.phase = DragPhase::Idle;
                Ok(DragOutcome::Cancelled(CancelReason::NotActivated))
            }
            _ => self.end_drag(target),
        }
    }

    pub fn pointer_cancel(&mut self) {
        if self.is_busy() {
            tracing::debug!(phase = ?self.phase, "drag cancelled");
        }
        self.phase = DragPhase::Idle;
    }

    // --- Drag lifecycle ---

    /// Start a drag directly, skipping the activation constraint.
    pub fn begin_drag(&mut self, source: impl Into<String>) -> Result<()> {
        if self.is_busy() {
            return Err(BoardError::InvalidDragState(format!(
                "drag already in progress: {:?}",
                self.phase
            )));
        }
        let source = source.into();
        tracing::debug!(%source, "drag started");
        self.phase = DragPhase::Dragging { source };
        Ok(())
    }

    /// Finish the active drag. Must run inside a tokio runtime when the drop
    /// changes a status, since the patch is spawned.
    pub fn end_drag(&mut self, target: Option<DropTarget>) -> Result<DragOutcome> {
        let source = match std::mem::replace(&mut self.phase, DragPhase::Idle) {
            DragPhase::Dragging { source } => source,
            other => {
                self.phase = other;
                return Err(BoardError::InvalidDragState(format!(
                    "drag end without an active drag: {:?}",
                    self.phase
                )));
            }
        };
        self.phase = DragPhase::Resolving {
            source: source.clone(),
        };

        let outcome = self.resolve_and_dispatch(source, target);
        self.phase = match &outcome {
            DragOutcome::Cancelled(_) => DragPhase::Idle,
            _ => DragPhase::Settled,
        };
        Ok(outcome)
    }

    /// Drop `id` onto `target` (a status symbol or another card's id) without
    /// pointer events. Both cards are fetched first, so neither needs to be on
    /// a loaded page.
    pub async fn move_card(&mut self, id: &str, target: &str) -> Result<DragOutcome> {
        if self.is_busy() {
            return Err(BoardError::InvalidDragState(format!(
                "drag already in progress: {:?}",
                self.phase
            )));
        }
        self.store.get(id).await?;
        if Status::from_symbol(target).is_none() {
            match self.store.get(target).await {
                Ok(_) => {}
                // Left to resolution, which cancels the drop.
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        self.begin_drag(id)?;
        self.end_drag(Some(DropTarget::element(target)))
    }

    fn resolve_and_dispatch(&self, source: String, target: Option<DropTarget>) -> DragOutcome {
        let Some(target) = target else {
            tracing::debug!(%source, "drop without target");
            return DragOutcome::Cancelled(CancelReason::NoTarget);
        };

        let cache = self.store.snapshot();
        let Some(resolution) = resolve_target(&target, &cache) else {
            tracing::debug!(%source, target = %target.id, "unresolvable drop target");
            return DragOutcome::Cancelled(CancelReason::UnresolvableTarget(target.id));
        };
        let to = resolution.status();

        let Some(current) = cache.get(&source) else {
            tracing::debug!(%source, "drag source not in cache");
            return DragOutcome::Cancelled(CancelReason::UnknownSource(source));
        };
        let from = current.status;
        if from == to {
            tracing::debug!(%source, status = %to, "drop on own column");
            return DragOutcome::Unchanged { id: source, status: to };
        }

        let Some(pending) = self.store.apply_optimistic(&source, ApplicationPatch::status(to)) else {
            // Removed between the snapshot and now.
            return DragOutcome::Cancelled(CancelReason::UnknownSource(source));
        };
        tracing::info!(id = %source, %from, %to, via = ?resolution, "status change dispatched");
        let store = self.store.clone();
        let handle = tokio::spawn(async move { store.settle(pending).await });
        DragOutcome::Dispatched {
            id: source,
            from,
            to,
            handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationDraft;
    use chrono::NaiveDate;

    fn cache() -> ApplicationCollection {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ApplicationCollection::new(vec![
            ApplicationDraft::new("A", "R", date, Status::Applied).with_id("a"),
            ApplicationDraft::new("B", "R", date, Status::Offer).with_id("b"),
            // A card whose id happens to be a status spelling.
            ApplicationDraft::new("C", "R", date, Status::Rejected).with_id("INTERVIEW"),
        ])
    }

    #[test]
    fn zone_marker_wins() {
        let r = resolve_target(&DropTarget::zone(Status::Interview), &cache()).unwrap();
        assert_eq!(r, Resolution::Zone(Status::Interview));
    }

    #[test]
    fn card_resolves_to_its_status_not_its_id() {
        let r = resolve_target(&DropTarget::element("b"), &cache()).unwrap();
        assert_eq!(r.status(), Status::Offer);
        assert!(matches!(r, Resolution::Card { ref id, .. } if id == "b"));
    }

    #[test]
    fn card_takes_priority_over_symbol_spelling() {
        let r = resolve_target(&DropTarget::element("INTERVIEW"), &cache()).unwrap();
        assert_eq!(r.status(), Status::Rejected);
    }

    #[test]
    fn symbol_fallback_requires_exact_spelling() {
        let r = resolve_target(&DropTarget::element("ONLINE_ASSESSMENT"), &cache()).unwrap();
        assert_eq!(r, Resolution::Symbol(Status::OnlineAssessment));
        assert!(resolve_target(&DropTarget::element("online_assessment"), &cache()).is_none());
        assert!(resolve_target(&DropTarget::element("sidebar"), &cache()).is_none());
    }

    #[test]
    fn point_distance() {
        assert_eq!(Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)), 5.0);
    }
}
