use serde::{Deserialize, Serialize};

use super::domain::{ChecklistItem, Encounter};
use super::policy::target_los;
use super::template::ChecklistCategory;

/// Per-encounter compliance judgments.
///
/// Serialized with the field names used by the ward reporting forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceFacts {
    #[serde(rename = "sesuai_target")]
    pub los_within_target: bool,
    #[serde(rename = "kepatuhan_cp")]
    pub cp_compliant: bool,
    #[serde(rename = "kepatuhan_penunjang")]
    pub support_compliant: bool,
    #[serde(rename = "kepatuhan_terapi")]
    pub therapy_compliant: bool,
}

impl ComplianceFacts {
    /// Overwrite only the fields present in `update`.
    pub fn apply(&mut self, update: &ComplianceUpdate) {
        if let Some(value) = update.los_within_target {
            self.los_within_target = value;
        }
        if let Some(value) = update.cp_compliant {
            self.cp_compliant = value;
        }
        if let Some(value) = update.support_compliant {
            self.support_compliant = value;
        }
        if let Some(value) = update.therapy_compliant {
            self.therapy_compliant = value;
        }
    }

    /// Copy of `self` with the fields present in `update` overwritten.
    pub fn merged(mut self, update: &ComplianceUpdate) -> Self {
        self.apply(update);
        self
    }
}

/// Operator override; `None` fields keep following the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceUpdate {
    #[serde(rename = "sesuai_target", skip_serializing_if = "Option::is_none")]
    pub los_within_target: Option<bool>,
    #[serde(rename = "kepatuhan_cp", skip_serializing_if = "Option::is_none")]
    pub cp_compliant: Option<bool>,
    #[serde(rename = "kepatuhan_penunjang", skip_serializing_if = "Option::is_none")]
    pub support_compliant: Option<bool>,
    #[serde(rename = "kepatuhan_terapi", skip_serializing_if = "Option::is_none")]
    pub therapy_compliant: Option<bool>,
}

impl ComplianceUpdate {
    /// True when no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.los_within_target.is_none()
            && self.cp_compliant.is_none()
            && self.support_compliant.is_none()
            && self.therapy_compliant.is_none()
    }

    /// Layer `later` on top; fields it leaves out keep their current override.
    pub fn overlay(&mut self, later: &ComplianceUpdate) {
        self.los_within_target = later.los_within_target.or(self.los_within_target);
        self.cp_compliant = later.cp_compliant.or(self.cp_compliant);
        self.support_compliant = later.support_compliant.or(self.support_compliant);
        self.therapy_compliant = later.therapy_compliant.or(self.therapy_compliant);
    }
}

/// How the protocol, support and therapy judgments are derived before any override.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DerivationPolicy {
    /// Every dimension is assumed compliant until an operator says otherwise.
    #[default]
    Placeholder,
    /// A dimension is compliant when its checklist completion reaches the threshold.
    ChecklistThreshold { threshold_pct: f64 },
}

/// Pure transform from encounter facts to compliance judgments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceClassifier {
    derivation: DerivationPolicy,
}

impl ComplianceClassifier {
    pub fn new(derivation: DerivationPolicy) -> Self {
        let derivation = match derivation {
            DerivationPolicy::ChecklistThreshold { threshold_pct } => {
                let threshold_pct = if threshold_pct.is_finite() {
                    threshold_pct.clamp(0.0, 100.0)
                } else {
                    100.0
                };
                DerivationPolicy::ChecklistThreshold { threshold_pct }
            }
            placeholder => placeholder,
        };

        Self { derivation }
    }

    pub fn derivation(&self) -> DerivationPolicy {
        self.derivation
    }

    pub fn classify(
        &self,
        encounter: &Encounter,
        checklist: Option<&[ChecklistItem]>,
    ) -> ComplianceFacts {
        let los_within_target = encounter
            .length_of_stay
            .map(|los| los <= target_los(&encounter.pathway))
            .unwrap_or(false);

        let (cp_compliant, support_compliant, therapy_compliant) = match self.derivation {
            DerivationPolicy::Placeholder => (true, true, true),
            DerivationPolicy::ChecklistThreshold { threshold_pct } => {
                let items = checklist.unwrap_or(&[]);
                (
                    meets_threshold(items, None, threshold_pct),
                    meets_threshold(items, Some(ChecklistCategory::Support), threshold_pct),
                    meets_threshold(items, Some(ChecklistCategory::Therapy), threshold_pct),
                )
            }
        };

        ComplianceFacts {
            los_within_target,
            cp_compliant,
            support_compliant,
            therapy_compliant,
        }
    }
}

/// Classify with the default placeholder derivation.
pub fn classify(encounter: &Encounter, checklist: Option<&[ChecklistItem]>) -> ComplianceFacts {
    ComplianceClassifier::default().classify(encounter, checklist)
}

// No relevant items means no signal, which keeps the placeholder default.
fn meets_threshold(
    items: &[ChecklistItem],
    category: Option<ChecklistCategory>,
    threshold_pct: f64,
) -> bool {
    let (total, completed) = items
        .iter()
        .filter(|item| category.is_none() || item.category == category)
        .fold((0usize, 0usize), |(total, completed), item| {
            (total + 1, completed + usize::from(item.is_completed()))
        });

    if total == 0 {
        return true;
    }

    (completed as f64 / total as f64) * 100.0 >= threshold_pct
}

/// An encounter paired with its effective compliance facts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedEncounter {
    pub encounter: Encounter,
    pub facts: ComplianceFacts,
}
