use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::json;

use super::classifier::ComplianceUpdate;
use super::domain::{
    ChecklistEntry, DiagnosisFilter, EncounterId, NewEncounter, PathwayType, ReportingWindow,
};
use super::notification::NotificationDispatcher;
use super::repository::{PathwayStore, StoreError};
use super::service::{PathwayService, ServiceError};

type SharedService<S, N> = Arc<PathwayService<S, N>>;

/// Router builder exposing encounter, compliance, dashboard and summary endpoints.
pub fn pathway_router<S, N>(service: SharedService<S, N>) -> Router
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route("/api/v1/encounters", post(admit_handler::<S, N>))
        .route(
            "/api/v1/encounters/:encounter_id",
            get(encounter_handler::<S, N>).delete(delete_handler::<S, N>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/discharge",
            put(discharge_handler::<S, N>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/checklist",
            put(save_checklist_handler::<S, N>).get(checklist_handler::<S, N>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/finalize",
            post(finalize_handler::<S, N>),
        )
        .route(
            "/api/v1/encounters/:encounter_id/compliance",
            get(compliance_handler::<S, N>).patch(update_compliance_handler::<S, N>),
        )
        .route(
            "/api/v1/pathways/:pathway/template",
            get(template_handler::<S, N>),
        )
        .route("/api/v1/dashboard", get(dashboard_handler::<S, N>))
        .route("/api/v1/summaries", get(summaries_handler::<S, N>))
        .route("/api/v1/summaries/generate", post(generate_handler::<S, N>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct DischargeRequest {
    pub discharged_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub month: u32,
    pub year: i32,
    #[serde(default)]
    pub diagnosis: Option<String>,
}

impl WindowQuery {
    fn window(&self) -> Result<ReportingWindow, Response> {
        ReportingWindow::new(self.month, self.year).map_err(|err| {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        })
    }
}

fn error_response(error: ServiceError) -> Response {
    let status = match &error {
        ServiceError::Encounter(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        ServiceError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        ServiceError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Dispatch(_) => StatusCode::BAD_GATEWAY,
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn admit_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Json(admission): Json<NewEncounter>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::CREATED, service.admit(admission))
}

pub(crate) async fn encounter_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(encounter_id): Path<String>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.get(&EncounterId(encounter_id)))
}

pub(crate) async fn delete_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(encounter_id): Path<String>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.delete(&EncounterId(encounter_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn discharge_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(encounter_id): Path<String>,
    Json(request): Json<DischargeRequest>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.discharge(&EncounterId(encounter_id), request.discharged_at),
    )
}

pub(crate) async fn save_checklist_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(encounter_id): Path<String>,
    Json(entries): Json<Vec<ChecklistEntry>>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(
        StatusCode::OK,
        service.save_checklist(&EncounterId(encounter_id), entries),
    )
}

pub(crate) async fn checklist_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(encounter_id): Path<String>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.checklist(&EncounterId(encounter_id)))
}

pub(crate) async fn finalize_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(encounter_id): Path<String>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.finalize(&EncounterId(encounter_id)))
}

pub(crate) async fn compliance_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(encounter_id): Path<String>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.compliance(&EncounterId(encounter_id)))
}

pub(crate) async fn update_compliance_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(encounter_id): Path<String>,
    Json(update): Json<ComplianceUpdate>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    if update.is_empty() {
        let payload = json!({ "error": "no compliance field supplied" });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
    }
    respond(
        StatusCode::OK,
        service.update_compliance(&EncounterId(encounter_id), update),
    )
}

pub(crate) async fn template_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(pathway): Path<String>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let pathway = PathwayType::from_label(&pathway);
    (StatusCode::OK, Json(service.checklist_template(&pathway))).into_response()
}

pub(crate) async fn dashboard_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Query(query): Query<WindowQuery>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let window = match query.window() {
        Ok(window) => window,
        Err(response) => return response,
    };
    let filter = DiagnosisFilter::parse(query.diagnosis.as_deref());
    respond(StatusCode::OK, service.dashboard_view(&filter, &window))
}

pub(crate) async fn summaries_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Query(query): Query<WindowQuery>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let window = match query.window() {
        Ok(window) => window,
        Err(response) => return response,
    };
    respond(StatusCode::OK, service.checklist_summaries(&window))
}

pub(crate) async fn generate_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Json(window): Json<ReportingWindow>,
) -> Response
where
    S: PathwayStore + 'static,
    N: NotificationDispatcher + 'static,
{
    respond(StatusCode::OK, service.generate_summaries(&window))
}
