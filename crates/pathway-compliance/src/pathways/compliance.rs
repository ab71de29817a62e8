use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::classifier::{ClassifiedEncounter, ComplianceClassifier, ComplianceFacts, ComplianceUpdate};
use super::domain::{Encounter, EncounterId};
use super::repository::{
    ChecklistRepository, ComplianceRepository, EncounterRepository, StoreError,
};

/// Operator overrides layered over classifier-derived judgments.
///
/// An explicitly written field always beats the derived one. Fields never
/// written keep following the classifier, so they track later changes such as
/// a discharge.
pub struct ComplianceLedger<S> {
    store: Arc<S>,
    classifier: ComplianceClassifier,
}

impl<S> Clone for ComplianceLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            classifier: self.classifier,
        }
    }
}

impl<S> ComplianceLedger<S>
where
    S: EncounterRepository + ChecklistRepository + ComplianceRepository,
{
    pub fn new(store: Arc<S>, classifier: ComplianceClassifier) -> Self {
        Self { store, classifier }
    }

    pub fn classifier(&self) -> &ComplianceClassifier {
        &self.classifier
    }

    /// Effective facts, or `None` while no row has been written for the encounter.
    pub fn get(&self, id: &EncounterId) -> Result<Option<ComplianceFacts>, StoreError> {
        match self.store.fetch_overrides(id)? {
            Some(overrides) => Ok(Some(self.derive(id)?.merged(&overrides))),
            None => Ok(None),
        }
    }

    /// [`Self::get`] for many encounters; ids without a row are left out.
    pub fn bulk_get(
        &self,
        ids: &[EncounterId],
    ) -> Result<HashMap<EncounterId, ComplianceFacts>, StoreError> {
        let overrides = self.store.fetch_overrides_many(ids)?;
        let mut encounters = Vec::with_capacity(overrides.len());
        for id in ids.iter().filter(|id| overrides.contains_key(*id)) {
            if let Some(encounter) = self.store.fetch(id)? {
                encounters.push(encounter);
            }
        }

        Ok(self
            .resolve(encounters)?
            .into_iter()
            .map(|classified| (classified.encounter.id, classified.facts))
            .collect())
    }

    /// Classifier output for the encounter as currently stored.
    pub fn derive(&self, id: &EncounterId) -> Result<ComplianceFacts, StoreError> {
        let encounter = self.store.fetch(id)?.ok_or(StoreError::NotFound)?;
        let items = self.store.items_for(id)?;
        Ok(self.classifier.classify(&encounter, Some(&items)))
    }

    /// Derived facts with any stored overrides applied.
    pub fn effective(&self, id: &EncounterId) -> Result<ComplianceFacts, StoreError> {
        let derived = self.derive(id)?;
        Ok(match self.store.fetch_overrides(id)? {
            Some(overrides) => derived.merged(&overrides),
            None => derived,
        })
    }

    /// Record only the supplied fields; creates the row on first write.
    pub fn upsert(
        &self,
        id: &EncounterId,
        update: ComplianceUpdate,
    ) -> Result<ComplianceFacts, StoreError> {
        let overrides = self.store.upsert_overrides(id, &update)?;
        debug!(encounter = %id, ?update, "compliance overrides upserted");
        Ok(self.derive(id)?.merged(&overrides))
    }

    /// Pair each encounter with its effective facts using two bulk reads.
    pub fn resolve(&self, encounters: Vec<Encounter>) -> Result<Vec<ClassifiedEncounter>, StoreError> {
        let ids: Vec<EncounterId> = encounters.iter().map(|encounter| encounter.id.clone()).collect();
        let overrides = self.store.fetch_overrides_many(&ids)?;
        let checklists = self.store.items_for_many(&ids)?;

        Ok(encounters
            .into_iter()
            .map(|encounter| {
                let derived = self
                    .classifier
                    .classify(&encounter, checklists.get(&encounter.id).map(Vec::as_slice));
                let facts = match overrides.get(&encounter.id) {
                    Some(overrides) => derived.merged(overrides),
                    None => derived,
                };
                ClassifiedEncounter { encounter, facts }
            })
            .collect())
    }
}
