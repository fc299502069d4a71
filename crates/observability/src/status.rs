//! Status-Endpunkte fuer den Presence-Zustand
//!
//! - `GET /status` – Zusammenfassung mit Zaehlern und Nutzerliste
//! - `GET /api/users` – Vollstaendige Presence-Liste
//! - `GET /api/user/:peer_id` – Einzelner Peer oder 404
//!
//! Die Daten liefert eine `StatusQuelle`; dieses Crate kennt den
//! Signaling-Zustand selbst nicht.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use gleaphe_core::types::PeerId;
use gleaphe_protocol::status::{PresenceDetail, StatusSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lesender Zugriff auf den Presence-Zustand
pub trait StatusQuelle: Send + Sync + 'static {
    /// Anzeigename des Servers
    fn server_name(&self) -> &str;

    /// Aktuelle Momentaufnahme
    fn snapshot(&self) -> StatusSnapshot;

    /// Details zu einem einzelnen Peer
    fn detail(&self, peer_id: &PeerId) -> Option<PresenceDetail>;
}

/// Nutzer-Eintrag in der `/status`-Antwort (ohne Peer-ID)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusNutzer {
    pub display_name: String,
    pub searching: bool,
}

/// Antwort des `/status`-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusAntwort {
    pub name: String,
    pub version: String,
    pub online: usize,
    pub queue_length: usize,
    pub active_pairs: usize,
    pub users: Vec<StatusNutzer>,
    pub total_connections: u64,
    pub messages_relayed: u64,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

impl StatusAntwort {
    fn aus_snapshot(name: &str, snapshot: StatusSnapshot) -> Self {
        Self {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            online: snapshot.online,
            queue_length: snapshot.queue_length,
            active_pairs: snapshot.active_pairs,
            users: snapshot
                .users
                .into_iter()
                .map(|u| StatusNutzer {
                    display_name: u.display_name,
                    searching: u.searching,
                })
                .collect(),
            total_connections: snapshot.total_connections,
            messages_relayed: snapshot.messages_relayed,
            uptime_seconds: snapshot.uptime_seconds,
            timestamp: Utc::now(),
        }
    }
}

/// JSON-Fehlerantwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FehlerAntwort {
    pub error: String,
}

fn fehler(status: StatusCode, nachricht: impl Into<String>) -> Response {
    (
        status,
        Json(FehlerAntwort {
            error: nachricht.into(),
        }),
    )
        .into_response()
}

type Quelle = Arc<dyn StatusQuelle>;

/// Axum-Router fuer die Status-Endpunkte
pub fn status_router(quelle: Arc<dyn StatusQuelle>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/api/users", get(users_handler))
        .route("/api/user/:peer_id", get(user_handler))
        .with_state(quelle)
}

async fn status_handler(State(quelle): State<Quelle>) -> Json<StatusAntwort> {
    Json(StatusAntwort::aus_snapshot(
        quelle.server_name(),
        quelle.snapshot(),
    ))
}

async fn users_handler(State(quelle): State<Quelle>) -> impl IntoResponse {
    Json(quelle.snapshot().users)
}

async fn user_handler(State(quelle): State<Quelle>, Path(roh): Path<String>) -> Response {
    let peer_id = match PeerId::parse(&roh) {
        Ok(p) => p,
        Err(e) => return fehler(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match quelle.detail(&peer_id) {
        Some(detail) => Json(detail).into_response(),
        None => fehler(StatusCode::NOT_FOUND, "Nutzer nicht gefunden"),
    }
}
