use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::workflows::roster::RosterImportError;

use super::domain::{
    Actor, ActorRole, CriteriaDraft, NominationId, NominationStatus, ProgramDraft, ProgramId,
    StaffId,
};
use super::lifecycle::LifecycleError;
use super::repository::{AuditLog, RepositoryError, TrainingStore};
use super::service::{NominationService, NominationServiceError};

pub(crate) const ACTOR_HEADER: &str = "x-actor";
pub(crate) const ROLE_HEADER: &str = "x-actor-role";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

type SharedService<S, L> = Arc<NominationService<S, L>>;

/// Router builder exposing the nomination desk over HTTP.
pub fn nomination_router<S, L>(service: SharedService<S, L>) -> Router
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    Router::new()
        .route("/api/v1/programs", post(create_program_handler::<S, L>))
        .route(
            "/api/v1/programs/:program_id/schedule",
            put(reschedule_handler::<S, L>),
        )
        .route(
            "/api/v1/programs/:program_id/criteria",
            post(criteria_handler::<S, L>),
        )
        .route("/api/v1/nominations", get(list_handler::<S, L>))
        .route(
            "/api/v1/nominations/:nomination_id",
            get(nomination_handler::<S, L>),
        )
        .route(
            "/api/v1/nominations/:nomination_id/candidates",
            get(candidates_handler::<S, L>),
        )
        .route(
            "/api/v1/nominations/:nomination_id/members",
            post(add_member_handler::<S, L>),
        )
        .route(
            "/api/v1/nominations/:nomination_id/members/:staff_id",
            delete(remove_member_handler::<S, L>),
        )
        .route(
            "/api/v1/nominations/:nomination_id/submit",
            post(submit_handler::<S, L>),
        )
        .route(
            "/api/v1/nominations/:nomination_id/approve",
            post(approve_handler::<S, L>),
        )
        .route(
            "/api/v1/nominations/:nomination_id/reject",
            post(reject_handler::<S, L>),
        )
        .route(
            "/api/v1/nominations/:nomination_id/print",
            post(print_handler::<S, L>),
        )
        .route(
            "/api/v1/nominations/:nomination_id/verify",
            get(verify_handler::<S, L>),
        )
        .route(
            "/api/v1/nominations/:nomination_id/audit",
            get(audit_handler::<S, L>),
        )
        .route("/api/v1/roster/import", post(import_handler::<S, L>))
        .route(
            "/api/v1/roster/reset",
            get(reset_preview_handler::<S, L>).post(reset_handler::<S, L>),
        )
        .route("/api/v1/roster/uploads", get(uploads_handler::<S, L>))
        .route(
            "/api/v1/roster/staff/:staff_id",
            delete(remove_staff_handler::<S, L>),
        )
        .route(
            "/api/v1/staff/:staff_id/history",
            get(history_handler::<S, L>),
        )
        .route("/api/v1/org/hierarchy", get(hierarchy_handler::<S, L>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleRequest {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MemberRequest {
    staff_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusQuery {
    status: NominationStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ImportQuery {
    #[serde(default)]
    file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ForceQuery {
    #[serde(default)]
    force: bool,
}

/// Resolve the caller from headers set by the fronting authentication layer.
pub(crate) fn actor_from_request(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> Result<Actor, Response> {
    let username = headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| unauthenticated("missing x-actor header"))?;

    let role = match headers
        .get(ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(raw) => raw
            .parse::<ActorRole>()
            .map_err(|err| unauthenticated(&err.to_string()))?,
        None => ActorRole::TrainingStaff,
    };

    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());

    Ok(Actor::new(username, role).with_origin(forwarded.or(peer.map(|addr| addr.ip()))))
}

fn unauthenticated(reason: &str) -> Response {
    let payload = json!({ "error": reason });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

fn status_for(error: &NominationServiceError) -> StatusCode {
    match error {
        NominationServiceError::Intake(_) | NominationServiceError::QueryTooShort(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        NominationServiceError::Lifecycle(LifecycleError::Unauthorized { .. }) => {
            StatusCode::FORBIDDEN
        }
        NominationServiceError::Lifecycle(_) | NominationServiceError::MissingCriteria(_) => {
            StatusCode::CONFLICT
        }
        NominationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        NominationServiceError::Repository(
            RepositoryError::Conflict | RepositoryError::StaffProtected(_),
        ) => StatusCode::CONFLICT,
        NominationServiceError::Import(
            RosterImportError::Csv(_) | RosterImportError::MissingColumns(_),
        ) => StatusCode::UNPROCESSABLE_ENTITY,
        NominationServiceError::Repository(RepositoryError::Unavailable(_))
        | NominationServiceError::Import(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(error: NominationServiceError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!(error = %error, "nomination request failed");
    }
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, NominationServiceError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

macro_rules! actor_or_reject {
    ($headers:expr, $peer:expr) => {
        match actor_from_request(&$headers, $peer.map(|ConnectInfo(addr)| addr)) {
            Ok(actor) => actor,
            Err(response) => return response,
        }
    };
}

/// Re-read the nomination after a successful mutation.
fn view_after<S, L, T>(
    service: &NominationService<S, L>,
    nomination_id: &NominationId,
    result: Result<T, NominationServiceError>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    respond(
        StatusCode::OK,
        result.and_then(|_| service.get(nomination_id)),
    )
}

pub(crate) async fn create_program_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    axum::Json(draft): axum::Json<ProgramDraft>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    respond(StatusCode::CREATED, service.create_program(draft, &actor))
}

pub(crate) async fn reschedule_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Path(program_id): Path<String>,
    axum::Json(request): axum::Json<ScheduleRequest>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    respond(
        StatusCode::OK,
        service.reschedule_program(
            &ProgramId(program_id),
            request.start_date,
            request.end_date,
            &actor,
        ),
    )
}

/// Store criteria and immediately generate a draft nomination from them.
pub(crate) async fn criteria_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Path(program_id): Path<String>,
    axum::Json(draft): axum::Json<CriteriaDraft>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    let program_id = ProgramId(program_id);

    let result = service
        .set_criteria(&program_id, draft, &actor)
        .and_then(|criteria| {
            let nomination = service.generate_nomination(&program_id, &actor)?;
            let view = service.get(&nomination.id)?;
            Ok(json!({
                "criteria": criteria,
                "nomination": view,
            }))
        });

    respond(StatusCode::CREATED, result)
}

pub(crate) async fn list_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    Query(query): Query<StatusQuery>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    respond(StatusCode::OK, service.list_nominations(query.status))
}

pub(crate) async fn nomination_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    Path(nomination_id): Path<String>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    respond(StatusCode::OK, service.get(&NominationId(nomination_id)))
}

pub(crate) async fn candidates_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    Path(nomination_id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    respond(
        StatusCode::OK,
        service.search_candidates(&NominationId(nomination_id), &query.q),
    )
}

pub(crate) async fn add_member_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Path(nomination_id): Path<String>,
    axum::Json(request): axum::Json<MemberRequest>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    let nomination_id = NominationId(nomination_id);
    let result = service.add_member(&nomination_id, &StaffId(request.staff_id), &actor);
    view_after(&service, &nomination_id, result)
}

pub(crate) async fn remove_member_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Path((nomination_id, staff_id)): Path<(String, String)>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    let nomination_id = NominationId(nomination_id);
    let result = service.remove_member(&nomination_id, &StaffId(staff_id), &actor);
    view_after(&service, &nomination_id, result)
}

pub(crate) async fn submit_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Path(nomination_id): Path<String>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    let nomination_id = NominationId(nomination_id);
    let result = service.submit(&nomination_id, &actor);
    view_after(&service, &nomination_id, result)
}

pub(crate) async fn approve_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Path(nomination_id): Path<String>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    let nomination_id = NominationId(nomination_id);
    let result = service.approve(&nomination_id, &actor);
    view_after(&service, &nomination_id, result)
}

pub(crate) async fn reject_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Path(nomination_id): Path<String>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    let nomination_id = NominationId(nomination_id);
    let result = service.reject(&nomination_id, &actor);
    view_after(&service, &nomination_id, result)
}

pub(crate) async fn print_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Path(nomination_id): Path<String>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    respond(
        StatusCode::OK,
        service.seal_on_first_print(&NominationId(nomination_id), &actor),
    )
}

pub(crate) async fn verify_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    Path(nomination_id): Path<String>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    respond(StatusCode::OK, service.verify(&NominationId(nomination_id)))
}

pub(crate) async fn audit_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    Path(nomination_id): Path<String>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    respond(
        StatusCode::OK,
        service.audit_trail(&NominationId(nomination_id)),
    )
}

pub(crate) async fn import_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    let file_name = query.file_name.unwrap_or_default();
    respond(
        StatusCode::OK,
        service.import_roster(body.as_bytes(), &file_name, &actor),
    )
}

pub(crate) async fn uploads_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    respond(StatusCode::OK, service.upload_history(&actor))
}

/// Counts a reset would produce; nothing is deleted.
pub(crate) async fn reset_preview_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    respond(StatusCode::OK, service.reset_preview(&actor))
}

pub(crate) async fn reset_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Query(query): Query<ForceQuery>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    respond(StatusCode::OK, service.reset_roster(query.force, &actor))
}

pub(crate) async fn remove_staff_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Path(staff_id): Path<String>,
    Query(query): Query<ForceQuery>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    let actor = actor_or_reject!(headers, peer);
    match service.remove_staff(&StaffId(staff_id), query.force, &actor) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<S, L>(
    State(service): State<SharedService<S, L>>,
    Path(staff_id): Path<String>,
) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    respond(
        StatusCode::OK,
        service.training_history(&StaffId(staff_id)),
    )
}

pub(crate) async fn hierarchy_handler<S, L>(State(service): State<SharedService<S, L>>) -> Response
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    respond(StatusCode::OK, service.org_hierarchy())
}
