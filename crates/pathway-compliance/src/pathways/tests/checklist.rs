use std::collections::HashMap;
use std::sync::Arc;

use super::common::*;
use crate::pathways::checklist_summary::{
    summarize_checklists, ChecklistAggregator, RemovedSummary, SummaryKind,
};
use crate::pathways::domain::{ChecklistEntry, DiagnosisFilter, PathwayType};
use crate::pathways::repository::{EncounterRepository, SummaryRepository};
use crate::pathways::service::{EngineSettings, PathwayService};

fn entry(name: &str, days: &[bool]) -> ChecklistEntry {
    ChecklistEntry {
        name: name.to_string(),
        category: None,
        days: days.to_vec(),
    }
}

#[test]
fn item_ticked_only_on_first_day_counts_as_completed() {
    let mut fixture = encounter(PathwayType::SectioCaesaria, Some(2));
    fixture.id.0 = "enc-sc".to_string();
    let checklists = HashMap::from([(
        fixture.id.clone(),
        vec![
            item(0, "Asesmen awal medis", &[true, false, false, false]),
            item(1, "Edukasi menyusui", &[false, false, false, false]),
        ],
    )]);

    let summaries = summarize_checklists(&april(), &[fixture], &checklists);
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.total_items, 2);
    assert_eq!(summary.completed_items, 1);
    assert!((summary.completion_pct - 50.0).abs() < 1e-9);
    assert_eq!(summary.patient_count, 1);

    let detail = summary.detail.as_ref().expect("detail present");
    let items = detail["items"].as_array().expect("items array");
    assert_eq!(items.len(), 2);
}

#[test]
fn diagnosis_without_checklists_reports_zero_items() {
    let fixture = encounter(PathwayType::DengueFever, None);
    let summaries = summarize_checklists(&april(), &[fixture], &HashMap::new());
    assert_eq!(summaries[0].total_items, 0);
    assert_eq!(summaries[0].completion_pct, 0.0);
    assert!(summaries[0].detail.is_none());
}

#[test]
fn regenerating_replaces_the_stored_row() {
    let (store, _dispatcher, service) = memory_service(EngineSettings::default());
    let admitted = service
        .admit(admission(PathwayType::Pneumonia, at(2025, 4, 7, 10)))
        .expect("admit");
    service
        .save_checklist(&admitted.id, vec![entry("Kultur sputum", &[false])])
        .expect("save checklist");

    let first = service.generate_summaries(&april()).expect("first run");
    assert!(first.is_complete());

    service
        .save_checklist(&admitted.id, vec![entry("Kultur sputum", &[false, true])])
        .expect("save checklist");
    service.generate_summaries(&april()).expect("second run");

    assert_eq!(store.checklist_summary_count(), 1);
    let rows = service.checklist_summaries(&april()).expect("summaries");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].completed_items, 1);
    assert!((rows[0].completion_pct - 100.0).abs() < 1e-9);
}

#[test]
fn failure_for_one_diagnosis_does_not_block_others() {
    let store = Arc::new(FaultyStore::default());
    for (pathway, day) in [
        (PathwayType::SectioCaesaria, 3),
        (PathwayType::Pneumonia, 4),
        (PathwayType::DengueFever, 5),
    ] {
        let mut fixture = encounter(pathway, None);
        fixture.id.0 = format!("enc-{day}");
        fixture.admitted_at = at(2025, 4, day, 9);
        store.insert(fixture).expect("insert");
    }
    store.fail_summaries_for(PathwayType::Pneumonia);

    let aggregator = ChecklistAggregator::new(Arc::clone(&store));
    let report = aggregator.generate(&april()).expect("generation runs");

    assert!(!report.is_complete());
    assert_eq!(
        report.succeeded,
        vec![PathwayType::SectioCaesaria, PathwayType::DengueFever]
    );
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].pathway, PathwayType::Pneumonia);
    assert_eq!(report.failed[0].kind, SummaryKind::Checklist);

    let stored = store.checklist_summaries(&april()).expect("read rows");
    assert_eq!(stored.len(), 2);
}

#[test]
fn monthly_write_failure_does_not_block_checklist_rows() {
    let store = Arc::new(FaultyStore::default());
    for (pathway, day) in [
        (PathwayType::SectioCaesaria, 3),
        (PathwayType::Pneumonia, 4),
        (PathwayType::DengueFever, 5),
    ] {
        let mut fixture = encounter(pathway, Some(2));
        fixture.id.0 = format!("enc-{day}");
        fixture.admitted_at = at(2025, 4, day, 9);
        store.insert(fixture).expect("insert");
    }
    store.fail_monthly_for(PathwayType::Pneumonia);
    let service = PathwayService::new(
        Arc::clone(&store),
        Arc::new(MemoryDispatcher::default()),
        EngineSettings::default(),
    );

    let report = service.generate_summaries(&april()).expect("generation runs");

    assert!(!report.is_complete());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].kind, SummaryKind::Monthly);
    assert_eq!(report.failed[0].pathway, PathwayType::Pneumonia);
    assert_eq!(
        report.materialized,
        vec![PathwayType::SectioCaesaria, PathwayType::DengueFever]
    );
    assert_eq!(report.succeeded.len(), 3);
    assert_eq!(store.checklist_summaries(&april()).expect("rows").len(), 3);
    assert_eq!(store.monthly_summaries(&april()).expect("rows").len(), 2);
}

#[test]
fn regenerating_drops_rows_for_diagnoses_no_longer_present() {
    let (store, _dispatcher, service) = memory_service(EngineSettings::default());
    let pneumonia = service
        .admit(admission(PathwayType::Pneumonia, at(2025, 4, 7, 10)))
        .expect("admit");
    service
        .admit(admission(PathwayType::DengueFever, at(2025, 4, 8, 10)))
        .expect("admit");
    service.generate_summaries(&april()).expect("first run");
    assert_eq!(store.checklist_summary_count(), 2);

    service.delete(&pneumonia.id).expect("delete");
    let report = service.generate_summaries(&april()).expect("second run");

    assert!(report.is_complete());
    assert_eq!(report.succeeded, vec![PathwayType::DengueFever]);
    assert_eq!(
        report.removed,
        vec![
            RemovedSummary {
                kind: SummaryKind::Monthly,
                pathway: PathwayType::Pneumonia,
            },
            RemovedSummary {
                kind: SummaryKind::Checklist,
                pathway: PathwayType::Pneumonia,
            },
        ]
    );

    let checklist_rows = service.checklist_summaries(&april()).expect("summaries");
    assert_eq!(checklist_rows.len(), 1);
    assert_eq!(checklist_rows[0].pathway, PathwayType::DengueFever);
    let monthly_rows = store.monthly_summaries(&april()).expect("monthly rows");
    assert_eq!(monthly_rows.len(), 1);
    assert_eq!(monthly_rows[0].pathway, PathwayType::DengueFever);
}

#[test]
fn aggregate_honours_the_diagnosis_filter() {
    let (_store, _dispatcher, service) = memory_service(EngineSettings::default());
    for pathway in [PathwayType::StrokeHemoragik, PathwayType::DengueFever] {
        service
            .admit(admission(pathway, at(2025, 4, 12, 9)))
            .expect("admit");
    }

    let rows = service
        .checklist_aggregator()
        .aggregate_checklist(&april(), &DiagnosisFilter::Only(PathwayType::DengueFever))
        .expect("aggregate");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pathway, PathwayType::DengueFever);
}

#[test]
fn read_failure_aborts_generation() {
    let store = Arc::new(FaultyStore::default());
    store.set_reads_down(true);
    let aggregator = ChecklistAggregator::new(store);
    assert!(aggregator.generate(&april()).is_err());
}
