//! Prometheus-kompatible Metriken fuer Gleaphe
//!
//! Registrierte Metriken:
//! - `gleaphe_online_users` – Gauge: Angemeldete Peers
//! - `gleaphe_queue_length` – Gauge: Wartende in der Matchmaking-Schlange
//! - `gleaphe_active_pairs` – Gauge: Laufende Anrufe
//! - `gleaphe_connections_total` – Counter: Angenommene Transport-Verbindungen
//! - `gleaphe_messages_relayed_total` – Counter: Weitergeleitete Nachrichten und Geschenke
//! - `gleaphe_matches_total` – Counter: Gebildete Paare
//! - `gleaphe_stale_removed_total` – Counter: Vom Sweeper entfernte Peers
//! - `gleaphe_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `gleaphe_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit
//!
//! Auf Linux kommen die Standard-Prozessmetriken (`process_*`) hinzu.

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Gleaphe-Prometheus-Metriken
///
/// Clone teilt die Registry und alle Metrik-Handles.
#[derive(Clone)]
pub struct GleapheMetrics {
    pub registry: Arc<Registry>,

    // Presence-Metriken
    pub online_users: IntGauge,
    pub queue_length: IntGauge,
    pub active_pairs: IntGauge,

    // Zaehler
    pub connections_total: IntCounter,
    pub messages_relayed_total: IntCounter,
    pub matches_total: IntCounter,
    pub stale_removed_total: IntCounter,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl GleapheMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Presence-Metriken ---
        let online_users = IntGauge::with_opts(Opts::new(
            "gleaphe_online_users",
            "Anzahl angemeldeter Peers",
        ))?;
        registry.register(Box::new(online_users.clone()))?;

        let queue_length = IntGauge::with_opts(Opts::new(
            "gleaphe_queue_length",
            "Anzahl wartender Peers in der Matchmaking-Schlange",
        ))?;
        registry.register(Box::new(queue_length.clone()))?;

        let active_pairs = IntGauge::with_opts(Opts::new(
            "gleaphe_active_pairs",
            "Anzahl laufender Anrufe",
        ))?;
        registry.register(Box::new(active_pairs.clone()))?;

        // --- Zaehler ---
        let connections_total = IntCounter::with_opts(Opts::new(
            "gleaphe_connections_total",
            "Gesamtanzahl angenommener Transport-Verbindungen",
        ))?;
        registry.register(Box::new(connections_total.clone()))?;

        let messages_relayed_total = IntCounter::with_opts(Opts::new(
            "gleaphe_messages_relayed_total",
            "Gesamtanzahl weitergeleiteter Nachrichten und Geschenke",
        ))?;
        registry.register(Box::new(messages_relayed_total.clone()))?;

        let matches_total = IntCounter::with_opts(Opts::new(
            "gleaphe_matches_total",
            "Gesamtanzahl gebildeter Paare",
        ))?;
        registry.register(Box::new(matches_total.clone()))?;

        let stale_removed_total = IntCounter::with_opts(Opts::new(
            "gleaphe_stale_removed_total",
            "Gesamtanzahl wegen Inaktivitaet entfernter Peers",
        ))?;
        registry.register(Box::new(stale_removed_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("gleaphe_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "gleaphe_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry: Arc::new(registry),
            online_users,
            queue_length,
            active_pairs,
            connections_total,
            messages_relayed_total,
            matches_total,
            stale_removed_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Setzt die drei Presence-Gauges auf einmal
    pub fn presence_setzen(&self, online: usize, wartend: usize, paare: usize) {
        self.online_users.set(online as i64);
        self.queue_length.set(wartend as i64);
        self.active_pairs.set(paare as i64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: GleapheMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<GleapheMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
