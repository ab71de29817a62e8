use super::common::*;
use crate::pathways::classifier::{classify, ComplianceClassifier, DerivationPolicy};
use crate::pathways::domain::{ChecklistItem, PathwayType};
use crate::pathways::template::ChecklistCategory;

#[test]
fn los_within_target_compares_against_pathway_table() {
    let on_target = classify(&encounter(PathwayType::SectioCaesaria, Some(2)), None);
    assert!(on_target.los_within_target);

    let over_target = classify(&encounter(PathwayType::SectioCaesaria, Some(3)), None);
    assert!(!over_target.los_within_target);

    let pneumonia = classify(&encounter(PathwayType::Pneumonia, Some(6)), None);
    assert!(pneumonia.los_within_target);
}

#[test]
fn undischarged_encounter_never_meets_target() {
    let facts = classify(&encounter(PathwayType::DengueFever, None), None);
    assert!(!facts.los_within_target);
}

#[test]
fn unknown_pathway_uses_default_target() {
    let pathway = PathwayType::from_label("Appendisitis Akut");
    assert!(classify(&encounter(pathway.clone(), Some(2)), None).los_within_target);
    assert!(!classify(&encounter(pathway, Some(3)), None).los_within_target);
}

#[test]
fn placeholder_derivation_defaults_to_compliant() {
    let checklist = vec![item(0, "Antibiotik empiris", &[false; 6])];
    let facts = classify(&encounter(PathwayType::Pneumonia, Some(4)), Some(&checklist));
    assert!(facts.cp_compliant);
    assert!(facts.support_compliant);
    assert!(facts.therapy_compliant);
}

#[test]
fn classification_is_pure() {
    let subject = encounter(PathwayType::StrokeHemoragik, Some(7));
    let checklist = vec![item(0, "CT scan kepala", &[true, false, false])];
    let first = classify(&subject, Some(&checklist));
    let second = classify(&subject, Some(&checklist));
    assert_eq!(first, second);
}

fn categorized(index: usize, category: ChecklistCategory, done: bool) -> ChecklistItem {
    ChecklistItem {
        category: Some(category),
        ..item(index, "langkah", &[done, false, false, false])
    }
}

#[test]
fn threshold_derivation_uses_category_completion() {
    let classifier = ComplianceClassifier::new(DerivationPolicy::ChecklistThreshold {
        threshold_pct: 75.0,
    });
    let checklist = vec![
        categorized(0, ChecklistCategory::Therapy, true),
        categorized(1, ChecklistCategory::Therapy, true),
        categorized(2, ChecklistCategory::Therapy, true),
        categorized(3, ChecklistCategory::Therapy, false),
        categorized(4, ChecklistCategory::Support, true),
        categorized(5, ChecklistCategory::Support, false),
    ];

    let facts = classifier.classify(&encounter(PathwayType::Pneumonia, Some(5)), Some(&checklist));
    assert!(facts.therapy_compliant, "3 of 4 therapy steps meets 75%");
    assert!(!facts.support_compliant, "1 of 2 support steps misses 75%");
    assert!(!facts.cp_compliant, "4 of 6 steps overall misses 75%");
    assert!(facts.los_within_target);
}

#[test]
fn threshold_derivation_without_checklist_keeps_default() {
    let classifier = ComplianceClassifier::new(DerivationPolicy::ChecklistThreshold {
        threshold_pct: 90.0,
    });
    let facts = classifier.classify(&encounter(PathwayType::Pneumonia, Some(5)), None);
    assert!(facts.cp_compliant && facts.support_compliant && facts.therapy_compliant);
}

#[test]
fn threshold_is_clamped_to_percentage_range() {
    let classifier = ComplianceClassifier::new(DerivationPolicy::ChecklistThreshold {
        threshold_pct: 250.0,
    });
    assert_eq!(
        classifier.derivation(),
        DerivationPolicy::ChecklistThreshold {
            threshold_pct: 100.0
        }
    );
}
