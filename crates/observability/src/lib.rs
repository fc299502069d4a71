//! # gleaphe-observability
//!
//! Observability-Crate fuer Gleaphe:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Presence-Status (`/status`, `/api/users`, `/api/user/:peer_id`)
//! - Structured Logging via tracing-subscriber
//! - Request-Timing Middleware

pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod status;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, GleapheMetrics};
pub use middleware::{request_timing_layer, timing_middleware};
pub use status::{status_router, StatusQuelle};

use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

/// Baut den vollstaendigen HTTP-Router
///
/// Endpunkte:
/// - `GET /health`
/// - `GET /status`, `GET /api/users`, `GET /api/user/:peer_id`
/// - `GET /metrics` (nur wenn `metriken_aktiv`)
pub fn http_router(
    quelle: Arc<dyn StatusQuelle>,
    metriken: GleapheMetrics,
    health: HealthState,
    metriken_aktiv: bool,
) -> Router {
    let mut app = Router::new()
        .merge(health_router(health))
        .merge(status_router(quelle));

    if metriken_aktiv {
        app = app.merge(metrics_router(metriken.clone()));
    }

    app.layer(axum::middleware::from_fn_with_state(
        metriken,
        timing_middleware,
    ))
    .layer(request_timing_layer())
    .layer(CorsLayer::permissive())
}

/// Startet den HTTP-Server auf einem bereits gebundenen Listener
///
/// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
pub async fn http_server_starten(
    listener: TcpListener,
    app: Router,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, "HTTP-Server gestartet");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while shutdown_rx.changed().await.is_ok() {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        })
        .await?;

    tracing::info!("HTTP-Server gestoppt");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use gleaphe_core::types::PeerId;
    use gleaphe_protocol::status::{PresenceDetail, StatusSnapshot};
    use tower::ServiceExt;

    struct LeereQuelle;

    impl StatusQuelle for LeereQuelle {
        fn server_name(&self) -> &str {
            "leer"
        }

        fn snapshot(&self) -> StatusSnapshot {
            StatusSnapshot {
                online: 0,
                queue_length: 0,
                active_pairs: 0,
                users: Vec::new(),
                total_connections: 0,
                messages_relayed: 0,
                uptime_seconds: 0,
            }
        }

        fn detail(&self, _peer_id: &PeerId) -> Option<PresenceDetail> {
            None
        }
    }

    fn router(metriken_aktiv: bool) -> Router {
        http_router(
            Arc::new(LeereQuelle),
            GleapheMetrics::neu().unwrap(),
            HealthState::neu(),
            metriken_aktiv,
        )
    }

    #[tokio::test]
    async fn metrics_nur_wenn_aktiv() {
        let antwort = router(false)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::NOT_FOUND);

        let antwort = router(true)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_header_wird_gesetzt() {
        let antwort = router(true)
            .oneshot(
                Request::get("/status")
                    .header("origin", "http://example.org")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);
        assert!(antwort
            .headers()
            .contains_key("access-control-allow-origin"));
    }
}
