use axum::{http::StatusCode, response::Json};
use serde_json::json;

pub mod appointments;
pub mod offers;

pub use appointments::appointment_routes;
pub use offers::offer_routes;

pub async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({"status": "healthy", "service": "cantiere-api"})),
    )
}
