use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};

use crate::pathways::checklist_summary::ChecklistSummary;
use crate::pathways::classifier::ComplianceUpdate;
use crate::pathways::domain::{
    ChecklistItem, Encounter, EncounterId, NewEncounter, PathwayType, ReportingWindow,
};
use crate::pathways::memory::InMemoryPathwayStore;
use crate::pathways::notification::{DispatchError, EncounterNotification, NotificationDispatcher};
use crate::pathways::repository::{
    ChecklistRepository, ComplianceRepository, EncounterQuery, EncounterRepository, StoreError,
    SummaryRepository,
};
use crate::pathways::rollup::MonthlySummary;
use crate::pathways::service::{EngineSettings, PathwayService};

pub(super) fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .expect("valid timestamp")
}

pub(super) fn april() -> ReportingWindow {
    ReportingWindow::new(4, 2025).expect("valid window")
}

pub(super) fn admission(pathway: PathwayType, admitted_at: NaiveDateTime) -> NewEncounter {
    NewEncounter {
        patient_name: "Siti Aminah".to_string(),
        record_number: "RM-000123".to_string(),
        pathway,
        admitted_at,
        attending_physician: Some("dr. Hana, Sp.OG".to_string()),
        verifier: None,
    }
}

pub(super) fn encounter(pathway: PathwayType, los: Option<u32>) -> Encounter {
    let admitted_at = at(2025, 4, 3, 8);
    Encounter {
        id: EncounterId(format!("fixture-{}-{los:?}", pathway.label())),
        patient_name: "Siti Aminah".to_string(),
        record_number: "RM-000123".to_string(),
        pathway,
        admitted_at,
        discharged_at: los.map(|days| admitted_at + chrono::Duration::days(i64::from(days))),
        length_of_stay: los,
        attending_physician: None,
        verifier: None,
        finalized: false,
    }
}

pub(super) fn item(index: usize, name: &str, days: &[bool]) -> ChecklistItem {
    ChecklistItem {
        index,
        name: name.to_string(),
        category: None,
        days: days.to_vec(),
    }
}

pub(super) type MemoryService = PathwayService<InMemoryPathwayStore, MemoryDispatcher>;

pub(super) fn memory_service(
    settings: EngineSettings,
) -> (Arc<InMemoryPathwayStore>, Arc<MemoryDispatcher>, MemoryService) {
    let store = Arc::new(InMemoryPathwayStore::default());
    let dispatcher = Arc::new(MemoryDispatcher::default());
    let service = PathwayService::new(store.clone(), dispatcher.clone(), settings);
    (store, dispatcher, service)
}

#[derive(Default)]
pub(super) struct MemoryDispatcher {
    events: Mutex<Vec<EncounterNotification>>,
    offline: AtomicBool,
}

impl NotificationDispatcher for MemoryDispatcher {
    fn dispatch(&self, notification: EncounterNotification) -> Result<(), DispatchError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DispatchError::Transport("gateway offline".to_string()));
        }
        self.events
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(notification);
        Ok(())
    }
}

impl MemoryDispatcher {
    pub(super) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(super) fn events(&self) -> Vec<EncounterNotification> {
        self.events
            .lock()
            .expect("dispatcher mutex poisoned")
            .clone()
    }
}

pub(super) struct OfflineDispatcher;

impl NotificationDispatcher for OfflineDispatcher {
    fn dispatch(&self, _notification: EncounterNotification) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("gateway offline".to_string()))
    }
}

/// Wraps the in-memory store with switchable faults.
#[derive(Default)]
pub(super) struct FaultyStore {
    pub(super) inner: InMemoryPathwayStore,
    pub(super) reads_down: AtomicBool,
    pub(super) failing_summary_pathway: Mutex<Option<PathwayType>>,
    pub(super) failing_monthly_pathway: Mutex<Option<PathwayType>>,
}

impl FaultyStore {
    pub(super) fn set_reads_down(&self, down: bool) {
        self.reads_down.store(down, Ordering::SeqCst);
    }

    pub(super) fn fail_summaries_for(&self, pathway: PathwayType) {
        *self
            .failing_summary_pathway
            .lock()
            .expect("fault mutex poisoned") = Some(pathway);
    }

    pub(super) fn fail_monthly_for(&self, pathway: PathwayType) {
        *self
            .failing_monthly_pathway
            .lock()
            .expect("fault mutex poisoned") = Some(pathway);
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.reads_down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("read replica offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl EncounterRepository for FaultyStore {
    fn insert(&self, encounter: Encounter) -> Result<Encounter, StoreError> {
        self.inner.insert(encounter)
    }

    fn update(&self, encounter: Encounter) -> Result<(), StoreError> {
        self.inner.update(encounter)
    }

    fn fetch(&self, id: &EncounterId) -> Result<Option<Encounter>, StoreError> {
        self.check_reads()?;
        self.inner.fetch(id)
    }

    fn list(&self, query: &EncounterQuery) -> Result<Vec<Encounter>, StoreError> {
        self.check_reads()?;
        self.inner.list(query)
    }

    fn delete(&self, id: &EncounterId) -> Result<(), StoreError> {
        self.inner.delete(id)
    }
}

impl ChecklistRepository for FaultyStore {
    fn replace_items(&self, id: &EncounterId, items: Vec<ChecklistItem>) -> Result<(), StoreError> {
        self.inner.replace_items(id, items)
    }

    fn items_for(&self, id: &EncounterId) -> Result<Vec<ChecklistItem>, StoreError> {
        self.check_reads()?;
        self.inner.items_for(id)
    }

    fn items_for_many(
        &self,
        ids: &[EncounterId],
    ) -> Result<HashMap<EncounterId, Vec<ChecklistItem>>, StoreError> {
        self.check_reads()?;
        self.inner.items_for_many(ids)
    }
}

impl ComplianceRepository for FaultyStore {
    fn fetch_overrides(&self, id: &EncounterId) -> Result<Option<ComplianceUpdate>, StoreError> {
        self.check_reads()?;
        self.inner.fetch_overrides(id)
    }

    fn fetch_overrides_many(
        &self,
        ids: &[EncounterId],
    ) -> Result<HashMap<EncounterId, ComplianceUpdate>, StoreError> {
        self.check_reads()?;
        self.inner.fetch_overrides_many(ids)
    }

    fn upsert_overrides(
        &self,
        id: &EncounterId,
        update: &ComplianceUpdate,
    ) -> Result<ComplianceUpdate, StoreError> {
        self.inner.upsert_overrides(id, update)
    }
}

impl SummaryRepository for FaultyStore {
    fn upsert_checklist_summary(&self, summary: ChecklistSummary) -> Result<(), StoreError> {
        let failing = self
            .failing_summary_pathway
            .lock()
            .expect("fault mutex poisoned")
            .clone();
        if failing.as_ref() == Some(&summary.pathway) {
            return Err(StoreError::Unavailable("summary table locked".to_string()));
        }
        self.inner.upsert_checklist_summary(summary)
    }

    fn checklist_summaries(
        &self,
        window: &ReportingWindow,
    ) -> Result<Vec<ChecklistSummary>, StoreError> {
        self.check_reads()?;
        self.inner.checklist_summaries(window)
    }

    fn upsert_monthly_summary(&self, summary: MonthlySummary) -> Result<(), StoreError> {
        let failing = self
            .failing_monthly_pathway
            .lock()
            .expect("fault mutex poisoned")
            .clone();
        if failing.as_ref() == Some(&summary.pathway) {
            return Err(StoreError::Unavailable("monthly view locked".to_string()));
        }
        self.inner.upsert_monthly_summary(summary)
    }

    fn monthly_summaries(
        &self,
        window: &ReportingWindow,
    ) -> Result<Vec<MonthlySummary>, StoreError> {
        self.check_reads()?;
        self.inner.monthly_summaries(window)
    }

    fn remove_checklist_summary(
        &self,
        window: &ReportingWindow,
        pathway: &PathwayType,
    ) -> Result<(), StoreError> {
        self.inner.remove_checklist_summary(window, pathway)
    }

    fn remove_monthly_summary(
        &self,
        window: &ReportingWindow,
        pathway: &PathwayType,
    ) -> Result<(), StoreError> {
        self.inner.remove_monthly_summary(window, pathway)
    }
}
