use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use jobboard::models::{WireApplication, WireDraft, WirePatch};
use jobboard::{ApplicationBackend, ApplicationDraft, ApplicationStore, BoardError, Result, Status};

/// A backend call as the fake saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List {
        status: Option<i64>,
        page: Option<u32>,
        limit: Option<u32>,
    },
    ListByStatus(i64),
    Get(String),
    Create(WireDraft),
    Replace(String, WireDraft),
    Patch(String, WirePatch),
    Delete(String),
}

/// In-memory stand-in for the REST resource. Records every call; patches can
/// be held back with a gate or made to fail.
pub struct FakeBackend {
    records: Mutex<Vec<WireApplication>>,
    next_id: AtomicU64,
    calls: Mutex<Vec<Call>>,
    gated: AtomicBool,
    gate: Semaphore,
    fail_patches: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            calls: Mutex::new(Vec::new()),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
            fail_patches: AtomicBool::new(false),
        })
    }

    pub fn insert_raw(&self, record: WireApplication) {
        self.records.lock().unwrap().push(record);
    }

    pub fn raw(&self, id: &str) -> Option<WireApplication> {
        self.records.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    /// Rewrite a stored ordinal behind the store's back.
    pub fn set_raw_status(&self, id: &str, ordinal: i64) {
        if let Some(record) = self.records.lock().unwrap().iter_mut().find(|r| r.id == id) {
            record.status = ordinal;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn patch_calls(&self) -> Vec<(String, WirePatch)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Patch(id, p) => Some((id, p)),
                _ => None,
            })
            .collect()
    }

    /// Hold every patch until `release_patches` is called.
    pub fn gate_patches(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn release_patches(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn fail_patches(&self, fail: bool) {
        self.fail_patches.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn not_found(id: &str) -> BoardError {
        BoardError::NotFound { id: id.to_string() }
    }

    fn from_draft(id: String, draft: &WireDraft) -> WireApplication {
        WireApplication {
            id,
            company_name: draft.company_name.clone(),
            role_name: draft.role_name.clone(),
            date_of_application: draft.date_of_application,
            status: draft.status,
            job_link: draft.job_link.clone(),
            tailored: draft.tailored,
            job_description: draft.job_description.clone(),
            referral: draft.referral.clone(),
        }
    }
}

#[async_trait]
impl ApplicationBackend for FakeBackend {
    async fn list(
        &self,
        status: Option<i64>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<WireApplication>> {
        self.record(Call::List { status, page, limit });
        let records = self.records.lock().unwrap();
        let matching = records.iter().filter(|r| status.is_none_or(|s| r.status == s));
        let skip = match (page, limit) {
            (Some(p), Some(l)) => (p.saturating_sub(1) * l) as usize,
            _ => 0,
        };
        let take = limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(matching.skip(skip).take(take).cloned().collect())
    }

    async fn list_by_status(&self, status: i64) -> Result<Vec<WireApplication>> {
        self.record(Call::ListByStatus(status));
        let records = self.records.lock().unwrap();
        Ok(records.iter().filter(|r| r.status == status).cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<WireApplication> {
        self.record(Call::Get(id.to_string()));
        self.raw(id).ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, draft: &WireDraft) -> Result<WireApplication> {
        self.record(Call::Create(draft.clone()));
        let id = format!("app-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = Self::from_draft(id, draft);
        self.insert_raw(record.clone());
        Ok(record)
    }

    async fn replace(&self, id: &str, draft: &WireDraft) -> Result<WireApplication> {
        self.record(Call::Replace(id.to_string(), draft.clone()));
        let mut records = self.records.lock().unwrap();
        let slot = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        *slot = Self::from_draft(id.to_string(), draft);
        Ok(slot.clone())
    }

    async fn patch(&self, id: &str, patch: &WirePatch) -> Result<WireApplication> {
        self.record(Call::Patch(id.to_string(), patch.clone()));
        if self.gated.load(Ordering::SeqCst) {
            self.gate
                .acquire()
                .await
                .map_err(|e| BoardError::network(e.to_string()))?
                .forget();
        }
        if self.fail_patches.load(Ordering::SeqCst) {
            return Err(BoardError::NetworkFailure {
                status: Some(500),
                message: "Internal Server Error".to_string(),
            });
        }
        let mut records = self.records.lock().unwrap();
        let slot = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        if let Some(s) = patch.status {
            slot.status = s;
        }
        if let Some(v) = &patch.company_name {
            slot.company_name = v.clone();
        }
        if let Some(v) = &patch.role_name {
            slot.role_name = v.clone();
        }
        if let Some(v) = patch.tailored {
            slot.tailored = v;
        }
        Ok(slot.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.record(Call::Delete(id.to_string()));
        let mut records = self.records.lock().unwrap();
        let idx = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        records.remove(idx);
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

/// A raw backend record with the given status ordinal.
pub fn wire(id: &str, company: &str, ordinal: i64) -> WireApplication {
    WireApplication {
        id: id.to_string(),
        company_name: company.to_string(),
        role_name: "Software Engineer".to_string(),
        date_of_application: date(2024, 4, 15),
        status: ordinal,
        job_link: None,
        tailored: false,
        job_description: None,
        referral: None,
    }
}

pub fn make_draft(company: &str, status: Status) -> ApplicationDraft {
    ApplicationDraft::new(company, "Software Engineer", date(2024, 4, 15), status)
}

/// Store over a fake backend holding `records`, with the cache loaded.
pub async fn loaded_store(records: Vec<WireApplication>) -> (ApplicationStore, Arc<FakeBackend>) {
    let backend = FakeBackend::new();
    for record in records {
        backend.insert_raw(record);
    }
    let store = ApplicationStore::new(backend.clone());
    store
        .list(&Default::default())
        .await
        .expect("initial list should succeed");
    (store, backend)
}

/// Let spawned tasks run until the fake has seen `n` patch calls.
pub async fn wait_for_patches(backend: &FakeBackend, n: usize) {
    for _ in 0..1000 {
        if backend.patch_calls().len() >= n {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("expected {n} patch calls, saw {:?}", backend.patch_calls());
}
