use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::checklist_summary::{
    stale_pathways, ChecklistAggregator, ChecklistSummary, SummaryGenerationReport, SummaryKind,
};
use super::classifier::{ComplianceClassifier, ComplianceFacts, ComplianceUpdate};
use super::compliance::ComplianceLedger;
use super::dashboard::{DashboardComposer, DashboardSource, DashboardView};
use super::domain::{
    ChecklistEntry, ChecklistItem, DiagnosisFilter, Encounter, EncounterError, EncounterId,
    NewEncounter, PathwayType, ReportingWindow,
};
use super::import::ImportedEncounter;
use super::notification::{
    render_notification, DispatchError, EncounterNotification, NotificationDispatcher,
    DEFAULT_TEMPLATE,
};
use super::policy::checklist_day_slots;
use super::repository::{EncounterQuery, PathwayStore, StoreError};
use super::rollup::monthly_summaries;
use super::template::blank_checklist;

/// Engine settings shared by the service's components.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub classifier: ComplianceClassifier,
    pub dashboard_source: DashboardSource,
    pub notification_template: Option<String>,
}

/// Facade composing the encounter lifecycle, compliance ledger, aggregators and dashboard.
pub struct PathwayService<S, N> {
    store: Arc<S>,
    dispatcher: Arc<N>,
    ledger: ComplianceLedger<S>,
    checklists: ChecklistAggregator<S>,
    dashboard: DashboardComposer<S>,
    template: String,
}

static ENCOUNTER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_encounter_id() -> EncounterId {
    let id = ENCOUNTER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EncounterId(format!("enc-{id:06}"))
}

impl<S, N> PathwayService<S, N>
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<N>, settings: EngineSettings) -> Self {
        let ledger = ComplianceLedger::new(Arc::clone(&store), settings.classifier);
        let checklists = ChecklistAggregator::new(Arc::clone(&store));
        let dashboard =
            DashboardComposer::new(Arc::clone(&store), ledger.clone(), settings.dashboard_source);
        let template = settings
            .notification_template
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());

        Self {
            store,
            dispatcher,
            ledger,
            checklists,
            dashboard,
            template,
        }
    }

    pub fn ledger(&self) -> &ComplianceLedger<S> {
        &self.ledger
    }

    pub fn checklist_aggregator(&self) -> &ChecklistAggregator<S> {
        &self.checklists
    }

    pub fn dashboard(&self) -> &DashboardComposer<S> {
        &self.dashboard
    }

    pub fn admit(&self, admission: NewEncounter) -> Result<Encounter, ServiceError> {
        let encounter = Encounter::admit(next_encounter_id(), admission)?;
        let stored = self.store.insert(encounter)?;
        info!(encounter = %stored.id, pathway = %stored.pathway, "encounter admitted");
        Ok(stored)
    }

    pub fn get(&self, id: &EncounterId) -> Result<Encounter, ServiceError> {
        Ok(self.store.fetch(id)?.ok_or(StoreError::NotFound)?)
    }

    /// Record the discharge and recompute LOS.
    ///
    /// The target judgment follows the new LOS on the next read unless an
    /// operator has overridden it.
    pub fn discharge(
        &self,
        id: &EncounterId,
        discharged_at: NaiveDateTime,
    ) -> Result<Encounter, ServiceError> {
        let mut encounter = self.get(id)?;
        encounter.discharge(discharged_at)?;
        self.store.update(encounter.clone())?;
        Ok(encounter)
    }

    /// Replace the encounter's checklist wholesale, indexing rows in submitted order.
    pub fn save_checklist(
        &self,
        id: &EncounterId,
        entries: Vec<ChecklistEntry>,
    ) -> Result<Vec<ChecklistItem>, ServiceError> {
        let encounter = self.get(id)?;
        encounter.ensure_mutable()?;

        let slots = checklist_day_slots(&encounter.pathway);
        let items: Vec<ChecklistItem> = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let mut days = entry.days;
                days.resize(slots, false);
                ChecklistItem {
                    index,
                    name: entry.name,
                    category: entry.category,
                    days,
                }
            })
            .collect();

        self.store.replace_items(id, items.clone())?;
        Ok(items)
    }

    /// Unticked protocol steps for a new encounter on `pathway`.
    pub fn checklist_template(&self, pathway: &PathwayType) -> Vec<ChecklistEntry> {
        blank_checklist(pathway)
    }

    pub fn checklist(&self, id: &EncounterId) -> Result<Vec<ChecklistItem>, ServiceError> {
        self.get(id)?;
        Ok(self.store.items_for(id)?)
    }

    /// Classifier judgments with any operator overrides applied.
    pub fn compliance(&self, id: &EncounterId) -> Result<ComplianceFacts, ServiceError> {
        Ok(self.ledger.effective(id)?)
    }

    pub fn update_compliance(
        &self,
        id: &EncounterId,
        update: ComplianceUpdate,
    ) -> Result<ComplianceFacts, ServiceError> {
        Ok(self.ledger.upsert(id, update)?)
    }

    /// Lock the encounter, persist its compliance row and hand it to the dispatcher.
    ///
    /// A dispatch failure releases the lock again so the call can be retried.
    pub fn finalize(&self, id: &EncounterId) -> Result<Encounter, ServiceError> {
        let mut encounter = self.get(id)?;
        encounter.ensure_mutable()?;
        encounter.finalized = true;
        self.store.update(encounter.clone())?;
        self.ledger.upsert(id, ComplianceUpdate::default())?;

        let notification = EncounterNotification {
            encounter_id: encounter.id.clone(),
            record_number: encounter.record_number.clone(),
            message: render_notification(&self.template, &encounter),
        };
        if let Err(err) = self.dispatcher.dispatch(notification) {
            encounter.finalized = false;
            if let Err(unlock) = self.store.update(encounter) {
                warn!(encounter = %id, error = %unlock, "finalize lock not released");
            }
            return Err(err.into());
        }

        info!(encounter = %encounter.id, "encounter finalized");
        Ok(encounter)
    }

    pub fn delete(&self, id: &EncounterId) -> Result<(), ServiceError> {
        self.store.delete(id)?;
        info!(encounter = %id, "encounter deleted");
        Ok(())
    }

    /// Admit (and discharge where present) every imported row, in order.
    pub fn import(&self, rows: Vec<ImportedEncounter>) -> Result<Vec<Encounter>, ServiceError> {
        let mut imported = Vec::with_capacity(rows.len());
        for row in rows {
            let encounter = self.admit(row.admission)?;
            let encounter = match row.discharged_at {
                Some(discharged_at) => self.discharge(&encounter.id, discharged_at)?,
                None => encounter,
            };
            imported.push(encounter);
        }
        Ok(imported)
    }

    pub fn dashboard_view(
        &self,
        filter: &DiagnosisFilter,
        window: &ReportingWindow,
    ) -> Result<DashboardView, ServiceError> {
        Ok(self.dashboard.view(filter, window)?)
    }

    /// Store the window's per-diagnosis monthly rows for the dashboard fallback.
    ///
    /// Each diagnosis is written independently and rows for diagnoses with no
    /// encounters left in the window are removed.
    pub fn materialize_monthly(
        &self,
        window: &ReportingWindow,
    ) -> Result<SummaryGenerationReport, ServiceError> {
        let encounters = self
            .store
            .list(&EncounterQuery::for_window(window, DiagnosisFilter::All))?;
        let classified = self.ledger.resolve(encounters)?;
        let summaries = monthly_summaries(&classified, window);
        let present: Vec<PathwayType> = summaries.iter().map(|row| row.pathway.clone()).collect();
        let stored = self.store.monthly_summaries(window)?;
        let mut report = SummaryGenerationReport::for_window(window);

        for summary in summaries {
            let pathway = summary.pathway.clone();
            let outcome = self.store.upsert_monthly_summary(summary);
            report.record_write(SummaryKind::Monthly, pathway, outcome);
        }

        for pathway in stale_pathways(stored.iter().map(|row| &row.pathway), &present) {
            let outcome = self.store.remove_monthly_summary(window, &pathway);
            report.record_removal(SummaryKind::Monthly, pathway, outcome);
        }

        info!(
            %window,
            rows = report.materialized.len(),
            failed = report.failed.len(),
            "monthly view materialized"
        );
        Ok(report)
    }

    /// Materialize the monthly view, then regenerate checklist summaries.
    ///
    /// Safe to repeat: every row is an upsert on (month, year, diagnosis). A
    /// failed write in either table does not stop the other.
    pub fn generate_summaries(
        &self,
        window: &ReportingWindow,
    ) -> Result<SummaryGenerationReport, ServiceError> {
        let mut report = self.materialize_monthly(window)?;
        report.absorb(self.checklists.generate(window)?);
        Ok(report)
    }

    pub fn checklist_summaries(
        &self,
        window: &ReportingWindow,
    ) -> Result<Vec<ChecklistSummary>, ServiceError> {
        Ok(self.checklists.summaries(window)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Encounter(#[from] EncounterError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
