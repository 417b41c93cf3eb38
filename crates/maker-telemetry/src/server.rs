//! HTTP server for the health and metrics endpoints.

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::TelemetryResult;
use crate::health::{HealthReport, HealthState};
use crate::metrics::Metrics;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    health: HealthState,
}

impl AppState {
    pub fn new(health: HealthState) -> Self {
        Self { health }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(get_health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

async fn get_health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.report())
}

async fn get_metrics() -> Response {
    match Metrics::render() {
        Ok(body) => body.into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "encode error").into_response()
        }
    }
}

/// Run the telemetry HTTP server until the token is cancelled.
pub async fn run_server(
    port: u16,
    health: HealthState,
    shutdown: CancellationToken,
) -> TelemetryResult<()> {
    let app = create_router(AppState::new(health));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting telemetry server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Telemetry server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_handler_reports_state() {
        let health = HealthState::new();
        health.record_tick(0.5, 2, 1.5);
        let state = AppState::new(health);

        let Json(report) = get_health(State(state)).await;
        assert_eq!(report.status, "ok");
        assert_eq!(report.active_orders, 2);
    }

    #[tokio::test]
    async fn test_server_stops_on_cancel() {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_server(0, HealthState::new(), token.clone()));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        token.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
