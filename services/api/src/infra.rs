use metrics_exporter_prometheus::PrometheusHandle;
use pathway_compliance::pathways::{
    DispatchError, EncounterNotification, EngineSettings, InMemoryPathwayStore,
    NotificationDispatcher, PathwayService,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Logs finalization notices; stands in for a messaging gateway.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingDispatcher;

impl NotificationDispatcher for TracingDispatcher {
    fn dispatch(&self, notification: EncounterNotification) -> Result<(), DispatchError> {
        info!(
            encounter = %notification.encounter_id,
            record_number = %notification.record_number,
            message = %notification.message,
            "finalization notice dispatched"
        );
        Ok(())
    }
}

pub(crate) type MemoryPathwayService = PathwayService<InMemoryPathwayStore, TracingDispatcher>;

pub(crate) fn memory_service(settings: EngineSettings) -> Arc<MemoryPathwayService> {
    Arc::new(PathwayService::new(
        Arc::new(InMemoryPathwayStore::default()),
        Arc::new(TracingDispatcher),
        settings,
    ))
}

pub(crate) fn parse_month(raw: &str) -> Result<u32, String> {
    let month: u32 = raw
        .trim()
        .parse()
        .map_err(|err| format!("failed to parse '{raw}' as a month number ({err})"))?;
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(format!("month must be between 1 and 12 (found {month})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_month_accepts_calendar_months_only() {
        assert_eq!(parse_month(" 4 "), Ok(4));
        assert!(parse_month("0").is_err());
        assert!(parse_month("13").is_err());
        assert!(parse_month("April").is_err());
    }
}
