use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Extension;
use axum::Json;
use pathway_compliance::error::AppError;
use pathway_compliance::pathways::{
    pathway_router, Encounter, EncounterImporter, NotificationDispatcher, PathwayService,
    PathwayStore,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct ImportRequest {
    pub(crate) csv: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportResponse {
    pub(crate) imported: usize,
    pub(crate) encounters: Vec<Encounter>,
}

pub(crate) fn with_pathway_routes<S, N>(service: Arc<PathwayService<S, N>>) -> axum::Router
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let importer = Arc::clone(&service);
    pathway_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/v1/encounters/import",
            post(move |Json(payload): Json<ImportRequest>| {
                let service = Arc::clone(&importer);
                async move { import_endpoint(&service, payload) }
            }),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Admit every row of an encounter export into the running service.
pub(crate) fn import_endpoint<S, N>(
    service: &PathwayService<S, N>,
    payload: ImportRequest,
) -> Result<Json<ImportResponse>, AppError>
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let rows = EncounterImporter::from_reader(Cursor::new(payload.csv.into_bytes()))?;
    let encounters = service.import(rows)?;
    Ok(Json(ImportResponse {
        imported: encounters.len(),
        encounters,
    }))
}
