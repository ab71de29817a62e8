//! Clinical pathway compliance: classification, per-encounter overrides, and
//! monthly rollups for reporting.

pub mod checklist_summary;
pub mod classifier;
pub mod compliance;
pub mod dashboard;
pub mod domain;
pub mod import;
pub mod memory;
pub mod notification;
pub mod policy;
pub mod repository;
pub mod rollup;
pub mod router;
pub mod service;
pub mod template;

#[cfg(test)]
mod tests;

pub use checklist_summary::{
    ChecklistAggregator, ChecklistSummary, RemovedSummary, SummaryFailure,
    SummaryGenerationReport, SummaryKind,
};
pub use classifier::{
    classify, ClassifiedEncounter, ComplianceClassifier, ComplianceFacts, ComplianceUpdate,
    DerivationPolicy,
};
pub use compliance::ComplianceLedger;
pub use dashboard::{DashboardComposer, DashboardSource, DashboardView, DisplayMetrics, MetricsOrigin};
pub use domain::{
    ChecklistEntry, ChecklistItem, DiagnosisFilter, Encounter, EncounterError, EncounterId,
    NewEncounter, PathwayType, ReportingWindow,
};
pub use import::{EncounterImporter, ImportError, ImportedEncounter};
pub use memory::InMemoryPathwayStore;
pub use notification::{
    render_notification, DispatchError, EncounterNotification, NotificationDispatcher,
};
pub use policy::{target_los, target_los_for_label};
pub use repository::{
    ChecklistRepository, ComplianceRepository, EncounterQuery, EncounterRepository, PathwayStore,
    StoreError, SummaryRepository,
};
pub use rollup::{monthly_summaries, rollup, ComplianceMetrics, MonthlySummary};
pub use router::pathway_router;
pub use service::{EngineSettings, PathwayService, ServiceError};
pub use template::{checklist_template, ChecklistCategory};
