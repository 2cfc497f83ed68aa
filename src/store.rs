use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::ApplicationBackend;
use crate::error::{BoardError, Result};
use crate::models::{
    Application, ApplicationDraft, ApplicationPatch, DecodedPage, ListQuery, WireDraft, WirePatch,
};
use crate::notice::{Notice, Notifier};
use crate::status::{self, Status};

// --- Collection ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationCollection {
    items: Vec<Application>,
}

impl ApplicationCollection {
    pub fn new(items: Vec<Application>) -> Self {
        let mut collection = Self::default();
        for item in items {
            collection.upsert(item);
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Application> {
        self.items.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Application> {
        self.items.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Application> {
        self.items.iter_mut().find(|a| a.id == id)
    }

    pub fn by_status(&self, status: Status) -> Vec<Application> {
        self.items.iter().filter(|a| a.status == status).cloned().collect()
    }

    pub fn upsert(&mut self, app: Application) {
        match self.get_mut(&app.id) {
            Some(existing) => *existing = app,
            None => self.items.push(app),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Application> {
        let idx = self.items.iter().position(|a| a.id == id)?;
        Some(self.items.remove(idx))
    }

    pub fn to_vec(&self) -> Vec<Application> {
        self.items.clone()
    }
}

// --- Outcomes ---

#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub id: String,
    pub ticket: u64,
    pub snapshot: Application,
    pub patch: ApplicationPatch,
}

#[derive(Debug)]
pub enum PatchOutcome {
    Confirmed(Application),
    /// Backend accepted, but a newer mutation on the same entity owns the cache entry.
    Stale,
    RolledBack(BoardError),
    Kept(BoardError),
}

impl PatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PatchOutcome::Confirmed(_) | PatchOutcome::Stale)
    }

    pub fn error(&self) -> Option<&BoardError> {
        match self {
            PatchOutcome::RolledBack(e) | PatchOutcome::Kept(e) => Some(e),
            _ => None,
        }
    }
}

// --- Store ---

// A response lands in the cache only while its ticket is still the latest one
// issued for that id. Tickets come from a single counter, so an id that was
// pruned and mutated again never sees an old number reissued.
#[derive(Debug, Default)]
struct StoreState {
    cache: ApplicationCollection,
    last_ticket: u64,
    latest: HashMap<String, u64>,
    in_flight: HashMap<String, usize>,
}

impl StoreState {
    fn begin(&mut self, id: &str) -> u64 {
        self.last_ticket += 1;
        self.latest.insert(id.to_string(), self.last_ticket);
        *self.in_flight.entry(id.to_string()).or_insert(0) += 1;
        self.last_ticket
    }

    fn finish(&mut self, id: &str) {
        if let Some(count) = self.in_flight.get_mut(id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.in_flight.remove(id);
            }
        }
    }

    fn current(&self, id: &str) -> u64 {
        self.latest.get(id).copied().unwrap_or(0)
    }

    /// Drop tickets for ids that are neither cached nor awaiting a response.
    fn prune(&mut self) {
        let StoreState {
            cache,
            latest,
            in_flight,
            ..
        } = self;
        latest.retain(|id, _| cache.get(id).is_some() || in_flight.contains_key(id));
    }
}

#[derive(Clone)]
pub struct ApplicationStore {
    pub(crate) backend: Arc<dyn ApplicationBackend>,
    state: Arc<Mutex<StoreState>>,
    notifier: Notifier,
    rollback_on_failure: bool,
}

impl ApplicationStore {
    pub fn new(backend: Arc<dyn ApplicationBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(StoreState::default())),
            notifier: Notifier::silent(),
            rollback_on_failure: true,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_rollback(mut self, rollback_on_failure: bool) -> Self {
        self.rollback_on_failure = rollback_on_failure;
        self
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        // Guards are never held across an await, so a poisoned lock still holds
        // a consistent cache.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Cache reads ---

    pub fn cached(&self) -> Vec<Application> {
        self.state().cache.to_vec()
    }

    pub fn cached_by_id(&self, id: &str) -> Option<Application> {
        self.state().cache.get(id).cloned()
    }

    pub fn cached_by_status(&self, status: Status) -> Vec<Application> {
        self.state().cache.by_status(status)
    }

    pub fn columns(&self) -> Vec<(Status, Vec<Application>)> {
        let state = self.state();
        Status::ALL
            .into_iter()
            .map(|s| (s, state.cache.by_status(s)))
            .collect()
    }

    pub fn snapshot(&self) -> ApplicationCollection {
        self.state().cache.clone()
    }

    // --- Backend operations ---

    pub async fn list(&self, query: &ListQuery) -> Result<DecodedPage> {
        let records = self
            .backend
            .list(query.status.map(status::encode), query.page, query.limit)
            .await?;
        let page = DecodedPage::decode(records);
        tracing::debug!(
            items = page.items.len(),
            failures = page.failures.len(),
            "listed applications"
        );
        let mut state = self.state();
        state.cache = ApplicationCollection::new(page.items.clone());
        state.prune();
        drop(state);
        Ok(page)
    }

    /// Every application with `status`. Does not touch the cache.
    pub async fn list_by_status(&self, status: Status) -> Result<DecodedPage> {
        let records = self.backend.list_by_status(status::encode(status)).await?;
        Ok(DecodedPage::decode(records))
    }

    pub async fn get(&self, id: &str) -> Result<Application> {
        let observed = self.state().current(id);
        match self.backend.get(id).await {
            Ok(wire) => {
                let app = Application::from_wire(wire)?;
                let mut state = self.state();
                if state.current(id) == observed {
                    state.cache.upsert(app.clone());
                }
                Ok(app)
            }
            Err(e) => {
                if e.is_not_found() {
                    self.state().cache.remove(id);
                }
                Err(e)
            }
        }
    }

    pub async fn create(&self, draft: ApplicationDraft) -> Result<Application> {
        let draft = draft.normalized();
        draft.validate()?;
        let result = async {
            let wire = self.backend.create(&WireDraft::from(&draft)).await?;
            Application::from_wire(wire)
        }
        .await;
        match result {
            Ok(app) => {
                tracing::info!(id = %app.id, company = %app.company_name, "created application");
                self.state().cache.upsert(app.clone());
                self.notifier.notify(Notice::success("Application added successfully!"));
                Ok(app)
            }
            Err(e) => {
                tracing::warn!(error = %e, "create failed");
                self.notifier.notify(Notice::error("Failed to add application"));
                Err(e)
            }
        }
    }

    /// Full overwrite: optional fields absent from `draft` are cleared.
    pub async fn replace(&self, id: &str, draft: ApplicationDraft) -> Result<Application> {
        let draft = draft.normalized();
        draft.validate()?;
        let ticket = self.state().begin(id);
        let result = async {
            let wire = self.backend.replace(id, &WireDraft::from(&draft)).await?;
            Application::from_wire(wire)
        }
        .await;
        self.finish_update(id, ticket, result, "Application updated successfully!", "Failed to update application")
    }

    pub async fn patch(&self, id: &str, patch: ApplicationPatch) -> Result<Application> {
        patch.validate()?;
        let ticket = self.state().begin(id);
        let result = self.send_patch(id, &patch).await;
        self.finish_update(id, ticket, result, "Application updated successfully!", "Failed to update application")
    }

    /// Delete on the backend. A missing id is reported as `NotFound`; the
    /// cache entry is dropped either way.
    pub async fn remove(&self, id: &str) -> Result<()> {
        // A fresh ticket turns any in-flight response for `id` stale.
        self.state().begin(id);
        let result = self.backend.delete(id).await;
        {
            let mut state = self.state();
            state.finish(id);
            if result.is_ok() || result.as_ref().is_err_and(BoardError::is_not_found) {
                state.cache.remove(id);
                state.prune();
            }
        }
        match &result {
            Ok(()) => {
                tracing::info!(id, "deleted application");
                self.notifier.notify(Notice::success("Application deleted"));
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(id, "delete of missing application");
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "delete failed");
                self.notifier.notify(Notice::error("Failed to delete application"));
            }
        }
        result
    }

    // --- Optimistic path ---

    /// Apply `patch` to the cached entry now and reserve a ticket for the
    /// backend call. `None` if `id` is not cached.
    pub fn apply_optimistic(&self, id: &str, patch: ApplicationPatch) -> Option<PendingMutation> {
        let mut state = self.state();
        let snapshot = state.cache.get(id)?.clone();
        let ticket = state.begin(id);
        if let Some(entry) = state.cache.get_mut(id) {
            entry.apply_patch(&patch);
        }
        tracing::debug!(id, ticket, "applied optimistic update");
        Some(PendingMutation {
            id: id.to_string(),
            ticket,
            snapshot,
            patch,
        })
    }

    pub async fn settle(&self, pending: PendingMutation) -> PatchOutcome {
        let result = self.send_patch(&pending.id, &pending.patch).await;
        let mut state = self.state();
        state.finish(&pending.id);
        let current = state.current(&pending.id) == pending.ticket;
        match result {
            Ok(app) if current => {
                state.cache.upsert(app.clone());
                drop(state);
                self.notifier.notify(Notice::success("Status updated!"));
                PatchOutcome::Confirmed(app)
            }
            Ok(_) => {
                tracing::debug!(id = %pending.id, ticket = pending.ticket, "discarding stale response");
                PatchOutcome::Stale
            }
            Err(e) => {
                tracing::warn!(id = %pending.id, error = %e, "status patch failed");
                let outcome = if self.rollback_on_failure && current {
                    state.cache.upsert(pending.snapshot);
                    PatchOutcome::RolledBack(e)
                } else {
                    PatchOutcome::Kept(e)
                };
                drop(state);
                self.notifier.notify(Notice::error("Failed to update status"));
                outcome
            }
        }
    }

    async fn send_patch(&self, id: &str, patch: &ApplicationPatch) -> Result<Application> {
        let wire = self.backend.patch(id, &WirePatch::from(patch)).await?;
        Application::from_wire(wire)
    }

    fn finish_update(
        &self,
        id: &str,
        ticket: u64,
        result: Result<Application>,
        ok_message: &str,
        err_message: &str,
    ) -> Result<Application> {
        let mut state = self.state();
        state.finish(id);
        match result {
            Ok(app) => {
                if state.current(id) == ticket {
                    state.cache.upsert(app.clone());
                } else {
                    tracing::debug!(id, ticket, "discarding stale response");
                }
                drop(state);
                self.notifier.notify(Notice::success(ok_message));
                Ok(app)
            }
            Err(e) => {
                drop(state);
                tracing::warn!(id, error = %e, "update failed");
                self.notifier.notify(Notice::error(err_message));
                Err(e)
            }
        }
    }
}
