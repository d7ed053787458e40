// src/main.rs

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::{Pool, Postgres};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

mod auth;
mod config;
mod db;
mod error;
mod models;
mod notify;
mod pricing;
mod routes;
mod tracking;

use config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub config: AppConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env();
    let pool = db::connect().await?;
    let state = AppState { pool, config: config.clone() };

    // Very permissive CORS for local dev (tighten for prod)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public surface: health, calculator, tracking — no session required
    let public = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/v1/calculator", post(routes::calculator::calculate))
        .route("/api/v1/tracking", get(routes::tracking::track));

    // CRM surface: mutations require the admin session token
    let crm = Router::new()
        // orders
        .route(
            "/api/v1/orders",
            post(routes::orders::create_order).get(routes::orders::list_orders),
        )
        .route(
            "/api/v1/orders/:id",
            get(routes::orders::get_order).patch(routes::orders::patch_order),
        )
        .route("/api/v1/orders/:id/history", get(routes::orders::order_history))
        .route("/api/v1/orders/:id/status", post(routes::orders::update_status))
        .route("/api/v1/orders/bulk-delete", post(routes::orders::bulk_delete))
        .route("/api/v1/orders/bulk-route", post(routes::orders::bulk_assign_route))
        .route(
            "/api/v1/orders/bulk-priority",
            post(routes::orders::bulk_assign_priority),
        )
        // clients
        .route(
            "/api/v1/clients",
            post(routes::clients::create_client).get(routes::clients::list_clients),
        )
        .route(
            "/api/v1/clients/:id",
            get(routes::clients::get_client)
                .patch(routes::clients::patch_client)
                .delete(routes::clients::delete_client),
        )
        // notifications
        .route(
            "/api/v1/notifications",
            post(routes::notifications::create_notification)
                .get(routes::notifications::list_notifications),
        )
        .route(
            "/api/v1/notifications/:id/read",
            post(routes::notifications::mark_read),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/api/v1/notifications/:id",
            delete(routes::notifications::delete_notification),
        )
        // settings & telegram
        .route("/api/v1/settings", get(routes::settings::list_settings))
        .route("/api/v1/settings/:key", put(routes::settings::upsert_setting))
        .route(
            "/api/v1/telegram-config",
            get(routes::settings::get_telegram_config)
                .post(routes::settings::set_telegram_config),
        )
        // calendar & reports
        .route("/api/v1/calendar", get(routes::calendar::calendar))
        .route("/api/v1/reports/summary", get(routes::reports::summary))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    let api = Router::new()
        .merge(public)
        .merge(crm)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API listening on http://127.0.0.1:{}", config.port);

    axum::serve(listener, api.into_make_service()).await?;
    Ok(())
}
