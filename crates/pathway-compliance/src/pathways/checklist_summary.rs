use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::domain::{
    ChecklistItem, DiagnosisFilter, Encounter, EncounterId, PathwayType, ReportingWindow,
};
use super::repository::{
    ChecklistRepository, EncounterQuery, EncounterRepository, StoreError, SummaryRepository,
};

/// Checklist completion for one (month, year, diagnosis) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistSummary {
    pub window: ReportingWindow,
    pub pathway: PathwayType,
    pub total_items: usize,
    pub completed_items: usize,
    pub completion_pct: f64,
    pub patient_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ChecklistSummary {
    pub fn key(&self) -> (ReportingWindow, PathwayType) {
        (self.window, self.pathway.clone())
    }
}

pub(crate) fn completion_pct(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * completed as f64 / total as f64
    }
}

#[derive(Default)]
struct ItemTally {
    completed: usize,
    total: usize,
}

#[derive(Default)]
struct GroupTally {
    patients: usize,
    total: usize,
    completed: usize,
    per_item: BTreeMap<String, ItemTally>,
}

/// Sum checklist items per diagnosis over the given encounters.
///
/// Every diagnosis with at least one encounter yields a row, even when none of
/// its encounters has a saved checklist.
pub fn summarize_checklists(
    window: &ReportingWindow,
    encounters: &[Encounter],
    checklists: &HashMap<EncounterId, Vec<ChecklistItem>>,
) -> Vec<ChecklistSummary> {
    let mut groups: BTreeMap<&PathwayType, GroupTally> = BTreeMap::new();

    for encounter in encounters {
        let group = groups.entry(&encounter.pathway).or_default();
        group.patients += 1;

        let items = checklists
            .get(&encounter.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for item in items {
            let completed = item.is_completed();
            group.total += 1;
            group.completed += usize::from(completed);

            let entry = group.per_item.entry(item.name.clone()).or_default();
            entry.total += 1;
            entry.completed += usize::from(completed);
        }
    }

    groups
        .into_iter()
        .map(|(pathway, group)| {
            let detail = if group.per_item.is_empty() {
                None
            } else {
                let items: Vec<_> = group
                    .per_item
                    .iter()
                    .map(|(name, tally)| {
                        json!({
                            "item": name,
                            "completed": tally.completed,
                            "total": tally.total,
                        })
                    })
                    .collect();
                Some(json!({ "items": items }))
            };

            ChecklistSummary {
                window: *window,
                pathway: pathway.clone(),
                total_items: group.total,
                completed_items: group.completed,
                completion_pct: completion_pct(group.completed, group.total),
                patient_count: group.patients,
                detail,
            }
        })
        .collect()
}

/// Which materialized table a generation outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    Checklist,
    Monthly,
}

impl SummaryKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Checklist => "checklist",
            Self::Monthly => "monthly",
        }
    }
}

/// Outcome of a "generate summary" run, split by diagnosis.
///
/// `succeeded` lists checklist rows written and `materialized` the monthly
/// rows. `removed` holds rows dropped because their diagnosis no longer has
/// encounters in the window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryGenerationReport {
    pub window: Option<ReportingWindow>,
    pub succeeded: Vec<PathwayType>,
    pub materialized: Vec<PathwayType>,
    pub removed: Vec<RemovedSummary>,
    pub failed: Vec<SummaryFailure>,
}

impl SummaryGenerationReport {
    pub fn for_window(window: &ReportingWindow) -> Self {
        Self {
            window: Some(*window),
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Fold another run over the same window into this one.
    pub fn absorb(&mut self, other: SummaryGenerationReport) {
        self.window = self.window.or(other.window);
        self.succeeded.extend(other.succeeded);
        self.materialized.extend(other.materialized);
        self.removed.extend(other.removed);
        self.failed.extend(other.failed);
    }

    pub(crate) fn record_write(
        &mut self,
        kind: SummaryKind,
        pathway: PathwayType,
        outcome: Result<(), StoreError>,
    ) {
        match outcome {
            Ok(()) if kind == SummaryKind::Checklist => self.succeeded.push(pathway),
            Ok(()) => self.materialized.push(pathway),
            Err(err) => self.record_failure(kind, pathway, err, "summary row not persisted"),
        }
    }

    pub(crate) fn record_removal(
        &mut self,
        kind: SummaryKind,
        pathway: PathwayType,
        outcome: Result<(), StoreError>,
    ) {
        match outcome {
            Ok(()) => self.removed.push(RemovedSummary { kind, pathway }),
            Err(err) => self.record_failure(kind, pathway, err, "stale summary row not removed"),
        }
    }

    fn record_failure(
        &mut self,
        kind: SummaryKind,
        pathway: PathwayType,
        err: StoreError,
        message: &'static str,
    ) {
        warn!(
            window = ?self.window,
            kind = kind.label(),
            pathway = %pathway,
            error = %err,
            "{}",
            message
        );
        self.failed.push(SummaryFailure {
            kind,
            pathway,
            error: err.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryFailure {
    pub kind: SummaryKind,
    pub pathway: PathwayType,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedSummary {
    pub kind: SummaryKind,
    pub pathway: PathwayType,
}

/// Stored diagnoses that are missing from `present`, in stored order.
pub(crate) fn stale_pathways<'a>(
    stored: impl IntoIterator<Item = &'a PathwayType>,
    present: &[PathwayType],
) -> Vec<PathwayType> {
    stored
        .into_iter()
        .filter(|pathway| !present.contains(pathway))
        .cloned()
        .collect()
}

/// Computes and persists checklist completion summaries.
pub struct ChecklistAggregator<S> {
    store: Arc<S>,
}

impl<S> Clone for ChecklistAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> ChecklistAggregator<S>
where
    S: EncounterRepository + ChecklistRepository + SummaryRepository,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn aggregate_checklist(
        &self,
        window: &ReportingWindow,
        filter: &DiagnosisFilter,
    ) -> Result<Vec<ChecklistSummary>, StoreError> {
        let query = EncounterQuery::for_window(window, filter.clone());
        let encounters = self.store.list(&query)?;
        let ids: Vec<EncounterId> = encounters.iter().map(|encounter| encounter.id.clone()).collect();
        let checklists = self.store.items_for_many(&ids)?;
        Ok(summarize_checklists(window, &encounters, &checklists))
    }

    /// Upsert keyed on (month, year, diagnosis); repeated calls replace the row.
    pub fn persist(&self, summary: ChecklistSummary) -> Result<(), StoreError> {
        self.store.upsert_checklist_summary(summary)
    }

    /// Aggregate the window and persist each diagnosis independently.
    ///
    /// A read failure aborts the run; a write failure is recorded against its
    /// diagnosis and the remaining rows are still written. Rows for diagnoses
    /// with no encounters left in the window are removed.
    pub fn generate(&self, window: &ReportingWindow) -> Result<SummaryGenerationReport, StoreError> {
        let summaries = self.aggregate_checklist(window, &DiagnosisFilter::All)?;
        let present: Vec<PathwayType> = summaries.iter().map(|summary| summary.pathway.clone()).collect();
        let stored = self.store.checklist_summaries(window)?;
        let mut report = SummaryGenerationReport::for_window(window);

        for summary in summaries {
            let pathway = summary.pathway.clone();
            report.record_write(SummaryKind::Checklist, pathway, self.persist(summary));
        }

        for pathway in stale_pathways(stored.iter().map(|row| &row.pathway), &present) {
            let outcome = self.store.remove_checklist_summary(window, &pathway);
            report.record_removal(SummaryKind::Checklist, pathway, outcome);
        }

        info!(
            %window,
            succeeded = report.succeeded.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            "checklist summaries generated"
        );
        Ok(report)
    }

    pub fn summaries(&self, window: &ReportingWindow) -> Result<Vec<ChecklistSummary>, StoreError> {
        self.store.checklist_summaries(window)
    }
}
