use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::identity::Actor;
use crate::services::negotiation::{AppointmentChanges, AppointmentDraft};
use crate::store::AppointmentFilter;
use crate::AppState;
use cantiere_shared::{Appointment, AppointmentKind, AppointmentState, Offer};

pub fn appointment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route(
            "/:id",
            get(get_appointment)
                .put(edit_appointment)
                .delete(delete_appointment),
        )
        .route("/:id/propose", post(propose_change))
        .route("/:id/confirm", post(confirm_appointment))
        .route("/:id/reject", post(reject_appointment))
}

#[derive(Debug, Deserialize)]
pub struct AppointmentQuery {
    pub participant_id: Option<Uuid>,
    pub offer_id: Option<Uuid>,
    pub kind: Option<AppointmentKind>,
    pub state: Option<AppointmentState>,
}

#[derive(Debug, Deserialize)]
pub struct ProposePayload {
    #[serde(flatten)]
    pub changes: AppointmentChanges,
    pub message: Option<String>,
}

/// Confirming a derived appointment can advance the linked offer; the
/// response carries both records so the caller sees the follow-up.
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub appointment: Appointment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<Offer>,
}

async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AppointmentQuery>,
    _actor: Actor,
) -> ApiResult<Json<Vec<Appointment>>> {
    let filter = AppointmentFilter {
        participant_id: params.participant_id,
        linked_offer_id: params.offer_id,
        kind: params.kind,
        state: params.state,
        ..Default::default()
    };
    let appointments = state.negotiation.list(&filter).await?;
    Ok(Json(appointments))
}

async fn create_appointment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(draft): Json<AppointmentDraft>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    let appointment = state.negotiation.create(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    _actor: Actor,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.negotiation.get(id).await?))
}

async fn edit_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(changes): Json<AppointmentChanges>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.negotiation.edit(id, &actor, changes).await?))
}

async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<StatusCode> {
    state.negotiation.delete(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn propose_change(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<ProposePayload>,
) -> ApiResult<Json<Appointment>> {
    let appointment = state
        .negotiation
        .propose(id, &actor, payload.changes, payload.message)
        .await?;
    Ok(Json(appointment))
}

async fn confirm_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<Json<ConfirmResponse>> {
    let appointment = state.negotiation.confirm(id, &actor).await?;
    let offer = state
        .dispatcher
        .resolve_confirmed(&appointment, &actor, &state.offers)
        .await?;
    Ok(Json(ConfirmResponse { appointment, offer }))
}

async fn reject_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.negotiation.reject(id, &actor).await?))
}
