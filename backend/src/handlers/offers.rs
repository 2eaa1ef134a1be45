use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::identity::Actor;
use crate::services::documents::check_documents;
use crate::services::offers::{DeadlineStatus, OfferOutcome};
use crate::store::OfferFilter;
use crate::AppState;
use cantiere_shared::{
    AnalysisData, Appointment, CompanyDocument, DocumentCheck, Offer, OfferState, ProcessingData,
};

pub fn offer_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_offers).post(create_offer))
        .route("/:id", get(get_offer))
        .route("/:id/analysis", post(submit_analysis))
        .route("/:id/processing", post(submit_processing))
        .route("/:id/approve", post(approve_offer))
        .route("/:id/deadline", get(check_deadline))
        .route("/:id/extension", post(log_extension))
        .route("/:id/archive", post(archive_offer))
        .route("/:id/sent/platform", post(mark_sent_platform))
        .route("/:id/email-reminder", post(request_email_send))
        .route("/:id/sent/email", post(mark_sent_email))
        .route("/:id/outcome", post(record_outcome))
        .route("/:id/documents/check", post(check_offer_documents))
}

#[derive(Debug, Deserialize)]
pub struct OfferQuery {
    pub client_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub state: Option<OfferState>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct OfferCreate {
    pub name: Option<String>,
    pub client_id: Uuid,
    pub company_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EmailReminderPayload {
    pub target_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct OutcomePayload {
    pub outcome: OfferOutcome,
}

#[derive(Debug, Deserialize)]
pub struct DocumentCheckPayload {
    pub on_file: Vec<CompanyDocument>,
}

async fn list_offers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OfferQuery>,
    _actor: Actor,
) -> ApiResult<Json<Vec<Offer>>> {
    let filter = OfferFilter {
        client_id: params.client_id,
        company_id: params.company_id,
        state: params.state,
        active_only: params.active.unwrap_or(false),
    };
    Ok(Json(state.offers.list(&filter).await?))
}

async fn create_offer(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<OfferCreate>,
) -> ApiResult<(StatusCode, Json<Offer>)> {
    let offer = state
        .offers
        .create_offer(&actor, payload.name, payload.client_id, payload.company_id)
        .await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

async fn get_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    _actor: Actor,
) -> ApiResult<Json<Offer>> {
    Ok(Json(state.offers.get(id).await?))
}

async fn submit_analysis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(data): Json<AnalysisData>,
) -> ApiResult<Json<Offer>> {
    Ok(Json(state.offers.submit_analysis(id, &actor, data).await?))
}

async fn submit_processing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(data): Json<ProcessingData>,
) -> ApiResult<Json<Offer>> {
    Ok(Json(state.offers.submit_processing(id, &actor, data).await?))
}

async fn approve_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<Json<Offer>> {
    Ok(Json(state.offers.approve(id, &actor).await?))
}

async fn check_deadline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    _actor: Actor,
) -> ApiResult<Json<DeadlineStatus>> {
    Ok(Json(state.offers.check_deadline(id).await?))
}

async fn log_extension(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<Json<Offer>> {
    Ok(Json(state.offers.log_extension(id, &actor).await?))
}

async fn archive_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<Json<Offer>> {
    Ok(Json(state.offers.archive(id, &actor).await?))
}

async fn mark_sent_platform(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<Json<Offer>> {
    Ok(Json(state.offers.mark_sent_via_platform(id, &actor).await?))
}

async fn request_email_send(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<EmailReminderPayload>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    let appointment = state
        .offers
        .request_email_send(id, &actor, payload.target_id)
        .await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn mark_sent_email(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<Json<Offer>> {
    Ok(Json(
        state.offers.mark_sent_via_email_confirmed(id, &actor).await?,
    ))
}

async fn record_outcome(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<OutcomePayload>,
) -> ApiResult<Json<Offer>> {
    Ok(Json(
        state.offers.record_outcome(id, &actor, payload.outcome).await?,
    ))
}

/// Run the document matcher over the offer's required documents and
/// the on-file documents supplied by the caller.
async fn check_offer_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    _actor: Actor,
    Json(payload): Json<DocumentCheckPayload>,
) -> ApiResult<Json<Vec<DocumentCheck>>> {
    let offer = state.offers.get(id).await?;
    let required = offer
        .analysis
        .as_ref()
        .map(|a| a.required_documents.clone())
        .unwrap_or_default();
    let report = check_documents(&required, &payload.on_file, state.clock.now());
    Ok(Json(report))
}
