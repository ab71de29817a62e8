use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::checklist_summary::ChecklistSummary;
use super::classifier::ComplianceUpdate;
use super::domain::{ChecklistItem, Encounter, EncounterId, PathwayType, ReportingWindow};
use super::repository::{
    ChecklistRepository, ComplianceRepository, EncounterQuery, EncounterRepository, StoreError,
    SummaryRepository,
};
use super::rollup::MonthlySummary;

type SummaryKey = (ReportingWindow, PathwayType);

#[derive(Default)]
struct Tables {
    encounters: HashMap<EncounterId, Encounter>,
    checklists: HashMap<EncounterId, Vec<ChecklistItem>>,
    overrides: HashMap<EncounterId, ComplianceUpdate>,
    checklist_summaries: HashMap<SummaryKey, ChecklistSummary>,
    monthly_summaries: HashMap<SummaryKey, MonthlySummary>,
}

/// Process-local backing store; every call is one transaction on a single lock.
#[derive(Default, Clone)]
pub struct InMemoryPathwayStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryPathwayStore {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    pub fn checklist_summary_count(&self) -> usize {
        self.tables()
            .map(|tables| tables.checklist_summaries.len())
            .unwrap_or(0)
    }
}

impl EncounterRepository for InMemoryPathwayStore {
    fn insert(&self, encounter: Encounter) -> Result<Encounter, StoreError> {
        let mut tables = self.tables()?;
        if tables.encounters.contains_key(&encounter.id) {
            return Err(StoreError::Conflict);
        }
        tables
            .encounters
            .insert(encounter.id.clone(), encounter.clone());
        Ok(encounter)
    }

    fn update(&self, encounter: Encounter) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        match tables.encounters.get_mut(&encounter.id) {
            Some(stored) => {
                *stored = encounter;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn fetch(&self, id: &EncounterId) -> Result<Option<Encounter>, StoreError> {
        Ok(self.tables()?.encounters.get(id).cloned())
    }

    fn list(&self, query: &EncounterQuery) -> Result<Vec<Encounter>, StoreError> {
        let tables = self.tables()?;
        let mut encounters: Vec<Encounter> = tables
            .encounters
            .values()
            .filter(|encounter| query.matches(encounter))
            .cloned()
            .collect();
        encounters.sort_by(|a, b| a.admitted_at.cmp(&b.admitted_at).then_with(|| a.id.cmp(&b.id)));
        Ok(encounters)
    }

    fn delete(&self, id: &EncounterId) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.encounters.remove(id).is_none() {
            return Err(StoreError::NotFound);
        }
        tables.checklists.remove(id);
        tables.overrides.remove(id);
        Ok(())
    }
}

impl ChecklistRepository for InMemoryPathwayStore {
    fn replace_items(
        &self,
        id: &EncounterId,
        mut items: Vec<ChecklistItem>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if !tables.encounters.contains_key(id) {
            return Err(StoreError::NotFound);
        }
        items.sort_by_key(|item| item.index);
        tables.checklists.insert(id.clone(), items);
        Ok(())
    }

    fn items_for(&self, id: &EncounterId) -> Result<Vec<ChecklistItem>, StoreError> {
        Ok(self
            .tables()?
            .checklists
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    fn items_for_many(
        &self,
        ids: &[EncounterId],
    ) -> Result<HashMap<EncounterId, Vec<ChecklistItem>>, StoreError> {
        let tables = self.tables()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                tables
                    .checklists
                    .get(id)
                    .map(|items| (id.clone(), items.clone()))
            })
            .collect())
    }
}

impl ComplianceRepository for InMemoryPathwayStore {
    fn fetch_overrides(&self, id: &EncounterId) -> Result<Option<ComplianceUpdate>, StoreError> {
        Ok(self.tables()?.overrides.get(id).copied())
    }

    fn fetch_overrides_many(
        &self,
        ids: &[EncounterId],
    ) -> Result<HashMap<EncounterId, ComplianceUpdate>, StoreError> {
        let tables = self.tables()?;
        Ok(ids
            .iter()
            .filter_map(|id| tables.overrides.get(id).map(|row| (id.clone(), *row)))
            .collect())
    }

    fn upsert_overrides(
        &self,
        id: &EncounterId,
        update: &ComplianceUpdate,
    ) -> Result<ComplianceUpdate, StoreError> {
        let mut tables = self.tables()?;
        if !tables.encounters.contains_key(id) {
            return Err(StoreError::NotFound);
        }
        let row = tables.overrides.entry(id.clone()).or_default();
        row.overlay(update);
        Ok(*row)
    }
}

impl SummaryRepository for InMemoryPathwayStore {
    fn upsert_checklist_summary(&self, summary: ChecklistSummary) -> Result<(), StoreError> {
        self.tables()?
            .checklist_summaries
            .insert(summary.key(), summary);
        Ok(())
    }

    fn checklist_summaries(
        &self,
        window: &ReportingWindow,
    ) -> Result<Vec<ChecklistSummary>, StoreError> {
        let tables = self.tables()?;
        let mut rows: Vec<ChecklistSummary> = tables
            .checklist_summaries
            .values()
            .filter(|summary| summary.window == *window)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.pathway.cmp(&b.pathway));
        Ok(rows)
    }

    fn upsert_monthly_summary(&self, summary: MonthlySummary) -> Result<(), StoreError> {
        let key = (summary.window, summary.pathway.clone());
        self.tables()?.monthly_summaries.insert(key, summary);
        Ok(())
    }

    fn monthly_summaries(
        &self,
        window: &ReportingWindow,
    ) -> Result<Vec<MonthlySummary>, StoreError> {
        let tables = self.tables()?;
        let mut rows: Vec<MonthlySummary> = tables
            .monthly_summaries
            .values()
            .filter(|summary| summary.window == *window)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.pathway.cmp(&b.pathway));
        Ok(rows)
    }

    fn remove_checklist_summary(
        &self,
        window: &ReportingWindow,
        pathway: &PathwayType,
    ) -> Result<(), StoreError> {
        self.tables()?
            .checklist_summaries
            .remove(&(*window, pathway.clone()));
        Ok(())
    }

    fn remove_monthly_summary(
        &self,
        window: &ReportingWindow,
        pathway: &PathwayType,
    ) -> Result<(), StoreError> {
        self.tables()?
            .monthly_summaries
            .remove(&(*window, pathway.clone()));
        Ok(())
    }
}
