use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, warn};

use super::checklist_summary::completion_pct;
use super::compliance::ComplianceLedger;
use super::domain::{DiagnosisFilter, PathwayType, ReportingWindow};
use super::repository::{EncounterQuery, PathwayStore, StoreError};
use super::rollup::{combine, rollup, ComplianceMetrics};

/// Which data the dashboard may read, in order of preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DashboardSource {
    /// Live encounter data when the window has any, otherwise the stored view.
    #[default]
    LiveFirst,
    LiveOnly,
    PrecomputedOnly,
}

impl DashboardSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::LiveFirst => "live_first",
            Self::LiveOnly => "live_only",
            Self::PrecomputedOnly => "precomputed_only",
        }
    }

    fn reads_live(self) -> bool {
        !matches!(self, Self::PrecomputedOnly)
    }

    fn reads_precomputed(self) -> bool {
        !matches!(self, Self::LiveOnly)
    }
}

impl FromStr for DashboardSource {
    type Err = UnknownDashboardSource;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "live_first" | "live-first" => Ok(Self::LiveFirst),
            "live_only" | "live-only" | "live" => Ok(Self::LiveOnly),
            "precomputed_only" | "precomputed-only" | "precomputed" => Ok(Self::PrecomputedOnly),
            _ => Err(UnknownDashboardSource(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDashboardSource(pub String);

impl fmt::Display for UnknownDashboardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown dashboard source '{}'", self.0)
    }
}

impl std::error::Error for UnknownDashboardSource {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsOrigin {
    Live,
    Precomputed,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMetrics {
    pub diagnosis: String,
    pub window: ReportingWindow,
    pub origin: MetricsOrigin,
    #[serde(flatten)]
    pub metrics: ComplianceMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist_completion_pct: Option<f64>,
}

/// Metrics handed to a consumer; `stale` marks a last-known value served after a failed refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    #[serde(flatten)]
    pub metrics: DisplayMetrics,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type DashboardKey = (DiagnosisFilter, ReportingWindow);

/// Upper bound on remembered views; the oldest window is evicted first.
pub const MAX_REMEMBERED_VIEWS: usize = 256;

/// Query layer producing dashboard metrics for a diagnosis filter and month.
pub struct DashboardComposer<S> {
    store: Arc<S>,
    ledger: ComplianceLedger<S>,
    source: DashboardSource,
    last_known: Mutex<HashMap<DashboardKey, DisplayMetrics>>,
}

impl<S> DashboardComposer<S>
where
    S: PathwayStore,
{
    pub fn new(store: Arc<S>, ledger: ComplianceLedger<S>, source: DashboardSource) -> Self {
        Self {
            store,
            ledger,
            source,
            last_known: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> DashboardSource {
        self.source
    }

    pub fn metrics_for(
        &self,
        filter: &DiagnosisFilter,
        window: &ReportingWindow,
    ) -> Result<DisplayMetrics, StoreError> {
        let (origin, metrics) = self.compose(filter, window)?;
        debug!(diagnosis = filter.label(), %window, ?origin, "dashboard metrics composed");

        let checklist_completion_pct = self.checklist_completion(filter, window)?;
        Ok(DisplayMetrics {
            diagnosis: filter.label().to_string(),
            window: *window,
            origin,
            metrics,
            checklist_completion_pct,
        })
    }

    /// Like [`Self::metrics_for`], but a failed refresh serves the last metrics
    /// produced for the same filter and window instead of failing.
    pub fn view(
        &self,
        filter: &DiagnosisFilter,
        window: &ReportingWindow,
    ) -> Result<DashboardView, StoreError> {
        let key = (filter.clone(), *window);
        match self.metrics_for(filter, window) {
            Ok(metrics) => {
                self.remember(key, metrics.clone());
                Ok(DashboardView {
                    metrics,
                    stale: false,
                    error: None,
                })
            }
            Err(err) => {
                let cached = self
                    .last_known
                    .lock()
                    .ok()
                    .and_then(|cache| cache.get(&key).cloned());
                match cached {
                    Some(metrics) => {
                        warn!(diagnosis = filter.label(), %window, error = %err, "serving last known dashboard metrics");
                        Ok(DashboardView {
                            metrics,
                            stale: true,
                            error: Some(err.to_string()),
                        })
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Number of views currently held for stale fallback.
    pub fn remembered_views(&self) -> usize {
        self.last_known.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    // Free-text diagnoses are never cached.
    fn remember(&self, key: DashboardKey, metrics: DisplayMetrics) {
        if matches!(key.0, DiagnosisFilter::Only(PathwayType::Unrecognized(_))) {
            return;
        }
        if let Ok(mut cache) = self.last_known.lock() {
            if !cache.contains_key(&key) && cache.len() >= MAX_REMEMBERED_VIEWS {
                let oldest = cache.keys().min_by_key(|(_, window)| *window).cloned();
                if let Some(oldest) = oldest {
                    cache.remove(&oldest);
                }
            }
            cache.insert(key, metrics);
        }
    }

    fn compose(
        &self,
        filter: &DiagnosisFilter,
        window: &ReportingWindow,
    ) -> Result<(MetricsOrigin, ComplianceMetrics), StoreError> {
        if self.source.reads_live() {
            let query = EncounterQuery::for_window(window, filter.clone());
            let encounters = self.store.list(&query)?;
            if !encounters.is_empty() {
                let classified = self.ledger.resolve(encounters)?;
                return Ok((MetricsOrigin::Live, rollup(&classified, window, filter)));
            }
        }

        if self.source.reads_precomputed() {
            let views: Vec<_> = self
                .store
                .monthly_summaries(window)?
                .into_iter()
                .filter(|summary| filter.matches(&summary.pathway))
                .collect();
            if !views.is_empty() {
                return Ok((MetricsOrigin::Precomputed, combine(&views)));
            }
        }

        Ok((MetricsOrigin::Empty, ComplianceMetrics::default()))
    }

    fn checklist_completion(
        &self,
        filter: &DiagnosisFilter,
        window: &ReportingWindow,
    ) -> Result<Option<f64>, StoreError> {
        let (completed, total, rows) = self
            .store
            .checklist_summaries(window)?
            .iter()
            .filter(|summary| filter.matches(&summary.pathway))
            .fold((0usize, 0usize, 0usize), |(completed, total, rows), summary| {
                (
                    completed + summary.completed_items,
                    total + summary.total_items,
                    rows + 1,
                )
            });

        Ok((rows > 0).then(|| completion_pct(completed, total)))
    }
}
