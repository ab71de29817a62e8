use std::collections::HashMap;

use chrono::NaiveDate;

use super::checklist_summary::ChecklistSummary;
use super::classifier::ComplianceUpdate;
use super::domain::{
    ChecklistItem, DiagnosisFilter, Encounter, EncounterId, PathwayType, ReportingWindow,
};
use super::rollup::MonthlySummary;

/// Read-by-filter arguments for encounter listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterQuery {
    pub admitted_from: NaiveDate,
    pub admitted_before: NaiveDate,
    pub diagnosis: DiagnosisFilter,
}

impl EncounterQuery {
    pub fn for_window(window: &ReportingWindow, diagnosis: DiagnosisFilter) -> Self {
        Self {
            admitted_from: window.start(),
            admitted_before: window.end(),
            diagnosis,
        }
    }

    pub fn matches(&self, encounter: &Encounter) -> bool {
        let admitted = encounter.admission_date();
        admitted >= self.admitted_from
            && admitted < self.admitted_before
            && self.diagnosis.matches(&encounter.pathway)
    }
}

/// Encounter storage. `delete` cascades to checklist items and compliance overrides.
pub trait EncounterRepository: Send + Sync {
    fn insert(&self, encounter: Encounter) -> Result<Encounter, StoreError>;
    fn update(&self, encounter: Encounter) -> Result<(), StoreError>;
    fn fetch(&self, id: &EncounterId) -> Result<Option<Encounter>, StoreError>;
    fn list(&self, query: &EncounterQuery) -> Result<Vec<Encounter>, StoreError>;
    fn delete(&self, id: &EncounterId) -> Result<(), StoreError>;
}

/// Checklist storage; saving replaces the encounter's whole item set.
pub trait ChecklistRepository: Send + Sync {
    fn replace_items(&self, id: &EncounterId, items: Vec<ChecklistItem>)
        -> Result<(), StoreError>;
    /// Items ordered by index.
    fn items_for(&self, id: &EncounterId) -> Result<Vec<ChecklistItem>, StoreError>;
    fn items_for_many(
        &self,
        ids: &[EncounterId],
    ) -> Result<HashMap<EncounterId, Vec<ChecklistItem>>, StoreError>;
}

/// Operator overrides per encounter. Only supplied fields are kept; the
/// rest of each judgment is re-derived on read.
pub trait ComplianceRepository: Send + Sync {
    fn fetch_overrides(&self, id: &EncounterId) -> Result<Option<ComplianceUpdate>, StoreError>;
    fn fetch_overrides_many(
        &self,
        ids: &[EncounterId],
    ) -> Result<HashMap<EncounterId, ComplianceUpdate>, StoreError>;
    /// Layer `update` over the stored overrides, creating the row when absent.
    /// Returns the overrides as persisted.
    fn upsert_overrides(
        &self,
        id: &EncounterId,
        update: &ComplianceUpdate,
    ) -> Result<ComplianceUpdate, StoreError>;
}

/// Materialized aggregates keyed by (month, year, diagnosis).
pub trait SummaryRepository: Send + Sync {
    /// Replaces any row sharing the summary's key.
    fn upsert_checklist_summary(&self, summary: ChecklistSummary) -> Result<(), StoreError>;
    fn checklist_summaries(
        &self,
        window: &ReportingWindow,
    ) -> Result<Vec<ChecklistSummary>, StoreError>;
    /// Replaces any row sharing the summary's key.
    fn upsert_monthly_summary(&self, summary: MonthlySummary) -> Result<(), StoreError>;
    fn monthly_summaries(&self, window: &ReportingWindow)
        -> Result<Vec<MonthlySummary>, StoreError>;
    /// Drop one row; removing an absent row is not an error.
    fn remove_checklist_summary(
        &self,
        window: &ReportingWindow,
        pathway: &PathwayType,
    ) -> Result<(), StoreError>;
    fn remove_monthly_summary(
        &self,
        window: &ReportingWindow,
        pathway: &PathwayType,
    ) -> Result<(), StoreError>;
}

/// Everything the engine needs from the backing store.
pub trait PathwayStore:
    EncounterRepository + ChecklistRepository + ComplianceRepository + SummaryRepository
{
}

impl<T> PathwayStore for T where
    T: EncounterRepository + ChecklistRepository + ComplianceRepository + SummaryRepository
{
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
