use axum::{
    http::Method,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod clock;
mod config;
mod error;
mod handlers;
mod identity;
mod notifications;
mod services;
mod store;
mod validation;

pub use error::{ApiError, ApiResult, AppError};

#[cfg(test)]
mod tests;

use clock::{Clock, SystemClock};
use notifications::{Notifier, StoreNotifier};
use services::{NegotiationService, OfferService, TaskDispatcher};
use store::{MemoryStore, Store};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub negotiation: Arc<NegotiationService>,
    pub offers: Arc<OfferService>,
    pub dispatcher: Arc<TaskDispatcher>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env()?;

    let store: Arc<dyn Store> = MemoryStore::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier: Arc<dyn Notifier> = Arc::new(StoreNotifier::new(store.clone()));
    let negotiation = Arc::new(NegotiationService::new(
        store.clone(),
        notifier.clone(),
        clock.clone(),
    ));
    let dispatcher = Arc::new(TaskDispatcher::new(
        negotiation.clone(),
        clock.clone(),
        config.dispatch.clone(),
    ));
    let offers = Arc::new(OfferService::new(
        store.clone(),
        notifier,
        clock.clone(),
        dispatcher.clone(),
    ));

    let app_state = Arc::new(AppState {
        store,
        clock,
        negotiation,
        offers,
        dispatcher,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(|| async { "Cantiere Workflow API v1.0.0" }))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1/appointments", handlers::appointment_routes())
        .nest("/api/v1/offers", handlers::offer_routes())
        .nest("/api/v1/notifications", notifications::notification_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Server running on {}", config.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
