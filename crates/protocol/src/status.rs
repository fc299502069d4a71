//! Status-Strukturen fuer Monitoring-Abfragen
//!
//! Werden sowohl im `presence_list`-Broadcast als auch von den
//! HTTP-Endpunkten (`/status`, `/api/users`) ausgeliefert.

use chrono::{DateTime, Utc};
use gleaphe_core::types::PeerId;
use serde::{Deserialize, Serialize};

/// Oeffentlich sichtbarer Eintrag eines verbundenen Peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub peer_id: PeerId,
    pub display_name: String,
    pub searching: bool,
}

/// Detailansicht eines einzelnen Peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceDetail {
    pub peer_id: PeerId,
    pub display_name: String,
    pub searching: bool,
    /// Aktueller Gespraechspartner (falls gepaart)
    pub paired_with: Option<PeerId>,
    pub connected_at: DateTime<Utc>,
    /// Sekunden seit der letzten Aktivitaet
    pub idle_seconds: u64,
}

/// Momentaufnahme des Presence-Zustands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub online: usize,
    pub queue_length: usize,
    /// Anzahl aktiver Paare (Haelfte der Pairing-Eintraege)
    pub active_pairs: usize,
    pub users: Vec<PresenceEntry>,
    /// Seit dem Start akzeptierte Transport-Verbindungen
    pub total_connections: u64,
    /// Seit dem Start zugestellte Nachrichten und Geschenke
    pub messages_relayed: u64,
    pub uptime_seconds: u64,
}
