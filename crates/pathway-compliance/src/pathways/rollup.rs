use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::classifier::ClassifiedEncounter;
use super::domain::{DiagnosisFilter, PathwayType, ReportingWindow};

/// Percentages and averages over a group of encounters.
///
/// Percentages are unrounded; rounding is left to presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceMetrics {
    pub total_patients: usize,
    pub pathway_compliance_pct: f64,
    pub los_compliance_pct: f64,
    pub therapy_compliance_pct: f64,
    pub support_compliance_pct: f64,
    pub avg_los: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    patients: usize,
    los_target_met: usize,
    cp_compliant: usize,
    therapy_compliant: usize,
    support_compliant: usize,
    total_los_days: u64,
}

impl Tally {
    fn record(&mut self, classified: &ClassifiedEncounter) {
        let facts = &classified.facts;
        self.patients += 1;
        self.los_target_met += usize::from(facts.los_within_target);
        self.cp_compliant += usize::from(facts.cp_compliant);
        self.therapy_compliant += usize::from(facts.therapy_compliant);
        self.support_compliant += usize::from(facts.support_compliant);
        self.total_los_days += u64::from(classified.encounter.length_of_stay.unwrap_or(0));
    }

    fn absorb(&mut self, summary: &MonthlySummary) {
        self.patients += summary.patient_count;
        self.los_target_met += summary.los_target_met;
        self.cp_compliant += summary.cp_compliant;
        self.therapy_compliant += summary.therapy_compliant;
        self.support_compliant += summary.support_compliant;
        self.total_los_days += summary.total_los_days;
    }

    fn metrics(&self) -> ComplianceMetrics {
        if self.patients == 0 {
            return ComplianceMetrics::default();
        }

        let n = self.patients as f64;
        let pct = |count: usize| 100.0 * count as f64 / n;
        ComplianceMetrics {
            total_patients: self.patients,
            pathway_compliance_pct: pct(self.cp_compliant),
            los_compliance_pct: pct(self.los_target_met),
            therapy_compliance_pct: pct(self.therapy_compliant),
            support_compliance_pct: pct(self.support_compliant),
            avg_los: self.total_los_days as f64 / n,
        }
    }
}

/// Monthly counts for one diagnosis; a derived read model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub window: ReportingWindow,
    pub pathway: PathwayType,
    pub patient_count: usize,
    pub los_target_met: usize,
    pub cp_compliant: usize,
    pub therapy_compliant: usize,
    pub support_compliant: usize,
    pub total_los_days: u64,
    pub avg_los: f64,
}

impl MonthlySummary {
    fn from_tally(window: ReportingWindow, pathway: PathwayType, tally: &Tally) -> Self {
        Self {
            window,
            pathway,
            patient_count: tally.patients,
            los_target_met: tally.los_target_met,
            cp_compliant: tally.cp_compliant,
            therapy_compliant: tally.therapy_compliant,
            support_compliant: tally.support_compliant,
            total_los_days: tally.total_los_days,
            avg_los: tally.metrics().avg_los,
        }
    }

    pub fn metrics(&self) -> ComplianceMetrics {
        let mut tally = Tally::default();
        tally.absorb(self);
        tally.metrics()
    }
}

fn in_scope<'a>(
    encounters: &'a [ClassifiedEncounter],
    window: &'a ReportingWindow,
    filter: &'a DiagnosisFilter,
) -> impl Iterator<Item = &'a ClassifiedEncounter> + 'a {
    encounters.iter().filter(move |classified| {
        window.contains(classified.encounter.admission_date())
            && filter.matches(&classified.encounter.pathway)
    })
}

/// Compliance metrics for encounters admitted inside `window` that match `filter`.
///
/// Encounters without a length of stay count toward the patient total and add
/// zero days to the average.
pub fn rollup(
    encounters: &[ClassifiedEncounter],
    window: &ReportingWindow,
    filter: &DiagnosisFilter,
) -> ComplianceMetrics {
    let mut tally = Tally::default();
    for classified in in_scope(encounters, window, filter) {
        tally.record(classified);
    }
    tally.metrics()
}

/// One summary per diagnosis present in the window, in pathway order.
pub fn monthly_summaries(
    encounters: &[ClassifiedEncounter],
    window: &ReportingWindow,
) -> Vec<MonthlySummary> {
    let mut groups: BTreeMap<&PathwayType, Tally> = BTreeMap::new();
    for classified in in_scope(encounters, window, &DiagnosisFilter::All) {
        groups
            .entry(&classified.encounter.pathway)
            .or_default()
            .record(classified);
    }

    groups
        .into_iter()
        .map(|(pathway, tally)| MonthlySummary::from_tally(*window, pathway.clone(), &tally))
        .collect()
}

/// Recombine stored monthly rows (e.g. every diagnosis for an "all" view).
pub fn combine(summaries: &[MonthlySummary]) -> ComplianceMetrics {
    let mut tally = Tally::default();
    for summary in summaries {
        tally.absorb(summary);
    }
    tally.metrics()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathways::classifier::ComplianceFacts;
    use crate::pathways::domain::{Encounter, EncounterId};
    use chrono::NaiveDate;

    fn classified(pathway: PathwayType, day: u32, los: Option<u32>, cp: bool) -> ClassifiedEncounter {
        let admitted_at = NaiveDate::from_ymd_opt(2025, 4, day)
            .and_then(|date| date.and_hms_opt(9, 0, 0))
            .expect("valid admission");
        ClassifiedEncounter {
            encounter: Encounter {
                id: EncounterId(format!("enc-{day}")),
                patient_name: "Pasien".to_string(),
                record_number: format!("RM-{day}"),
                pathway,
                admitted_at,
                discharged_at: None,
                length_of_stay: los,
                attending_physician: None,
                verifier: None,
                finalized: false,
            },
            facts: ComplianceFacts {
                los_within_target: los.is_some_and(|days| days <= 2),
                cp_compliant: cp,
                support_compliant: true,
                therapy_compliant: true,
            },
        }
    }

    #[test]
    fn empty_group_yields_zeroed_metrics() {
        let window = ReportingWindow::new(4, 2025).expect("window");
        assert_eq!(
            rollup(&[], &window, &DiagnosisFilter::All),
            ComplianceMetrics::default()
        );
    }

    #[test]
    fn groups_by_diagnosis_with_los_totals() {
        let window = ReportingWindow::new(4, 2025).expect("window");
        let encounters = vec![
            classified(PathwayType::SectioCaesaria, 1, Some(2), true),
            classified(PathwayType::SectioCaesaria, 2, Some(4), false),
            classified(PathwayType::DengueFever, 3, None, true),
        ];

        let summaries = monthly_summaries(&encounters, &window);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].pathway, PathwayType::SectioCaesaria);
        assert_eq!(summaries[0].patient_count, 2);
        assert_eq!(summaries[0].los_target_met, 1);
        assert_eq!(summaries[0].total_los_days, 6);
        assert!((summaries[0].avg_los - 3.0).abs() < f64::EPSILON);
        assert_eq!(summaries[1].patient_count, 1);
        assert!(summaries[1].avg_los.abs() < f64::EPSILON);

        let combined = combine(&summaries);
        assert_eq!(
            combined,
            rollup(&encounters, &window, &DiagnosisFilter::All),
            "recombined rows must match a direct rollup"
        );
    }
}
