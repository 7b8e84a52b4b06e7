use actix_web::{web, HttpResponse};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::AppError;
use crate::state::app_state::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    app_version: &'static str,
    connections: usize,
    players: usize,
    games: usize,
    time: String,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    status: &'static str,
    backend: &'static str,
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Liveness plus in-memory registry sizes. Never touches the backend.
async fn health(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let coordinator = app_state.coordinator();
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        app_version: env!("CARGO_PKG_VERSION"),
        connections: coordinator.connections().active_connections_count(),
        players: coordinator.players().len(),
        games: coordinator.games().len(),
        time: now_rfc3339(),
    }))
}

/// Readiness: the backend must answer its health check.
async fn ready(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    app_state.coordinator().gateway().health_check().await?;
    Ok(HttpResponse::Ok().json(ReadyResponse {
        status: "ok",
        backend: "ok",
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(health))
        .route("/ready", web::get().to(ready));
}
