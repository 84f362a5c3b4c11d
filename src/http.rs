use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::metrics::Metrics;

/// Serves `/metrics` (Prometheus text exposition) and `/health` (liveness).
/// No zone, cache, or blocking admin endpoints live here — this crate has
/// none of those subsystems.
pub struct HttpServer {
    metrics: Arc<Metrics>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    pub fn new(metrics: Arc<Metrics>, bind_addr: SocketAddr) -> Self {
        Self { metrics, bind_addr }
    }

    pub async fn start(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> std::io::Result<()> {
        let app = Router::new()
            .route("/health", get(health_check))
            .route("/metrics", get(prometheus_metrics))
            .with_state(self.metrics)
            .layer(CorsLayer::permissive());

        info!(bind_addr = %self.bind_addr, "starting metrics http server");
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

async fn prometheus_metrics(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    match metrics.export() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .unwrap(),
        Err(err) => {
            error!(%err, "failed to export metrics");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body("failed to export metrics".to_string())
                .unwrap()
        }
    }
}
