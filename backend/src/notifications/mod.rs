use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    routing::{delete, get, put},
    Router,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiResult, AppError};
use crate::identity::Actor;
use crate::store::Store;
use crate::AppState;
use cantiere_shared::Notification;

/// Fire-and-forget notification sink. Failures are logged, never
/// surfaced to the transition that produced the notification.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn enqueue(&self, notification: Notification);
}

pub struct StoreNotifier {
    store: Arc<dyn Store>,
}

impl StoreNotifier {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn enqueue(&self, notification: Notification) {
        if let Err(e) = self.store.insert_notification(&notification).await {
            warn!(
                "Failed to enqueue notification for {}: {}",
                notification.recipient_id, e
            );
        }
    }
}

/// Build a notification record with a fresh id.
pub fn notification(
    recipient_id: Uuid,
    message: String,
    kind: &str,
    reference_id: Option<Uuid>,
    at: DateTime<Utc>,
) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        recipient_id,
        message,
        kind: kind.to_string(),
        reference_id,
        read: false,
        created_at: at,
    }
}

pub fn notification_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:id/read", put(mark_as_read))
        .route("/read-all", put(mark_all_as_read))
        .route("/:id", delete(delete_notification))
        .route("/unread-count", get(get_unread_count))
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListNotificationsQuery>,
    actor: Actor,
) -> ApiResult<impl IntoResponse> {
    let notifications = state
        .store
        .query_notifications(actor.id, query.unread.unwrap_or(false))
        .await?;
    Ok(Json(notifications))
}

async fn mark_as_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<impl IntoResponse> {
    if !state.store.mark_notification_read(id, actor.id).await? {
        return Err(AppError::not_found(format!("Notification {}", id)));
    }
    Ok(Json(serde_json::json!({ "message": "Notification marked as read" })))
}

async fn mark_all_as_read(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> ApiResult<impl IntoResponse> {
    let updated = state.store.mark_all_notifications_read(actor.id).await?;
    Ok(Json(serde_json::json!({
        "message": "All notifications marked as read",
        "updated_count": updated
    })))
}

async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<impl IntoResponse> {
    if !state.store.delete_notification(id, actor.id).await? {
        return Err(AppError::not_found(format!("Notification {}", id)));
    }
    Ok(Json(serde_json::json!({ "message": "Notification deleted" })))
}

async fn get_unread_count(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> ApiResult<impl IntoResponse> {
    let unread = state.store.query_notifications(actor.id, true).await?;
    Ok(Json(UnreadCountResponse {
        unread_count: unread.len() as u64,
    }))
}
