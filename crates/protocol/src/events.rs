//! Presence-Protokoll (TCP)
//!
//! Definiert alle Ereignisse die ueber die TCP-Verbindung zwischen Client
//! und Server ausgetauscht werden.
//!
//! ## Design
//! - Geschlossene Tagged Enums fuer eingehende (`ClientEvent`) und
//!   ausgehende (`ServerEvent`) Ereignisse
//! - JSON-Serialisierung via serde, Feld `type` in snake_case
//! - Pflichtfelder werden an der Transportgrenze beim Deserialisieren geprueft

use gleaphe_core::types::PeerId;
use serde::{Deserialize, Serialize};

use crate::status::PresenceEntry;

/// Maximale Laenge eines Anzeigenamens in Zeichen
pub const MAX_ANZEIGENAME_ZEICHEN: usize = 64;

/// Maximale Laenge einer Direktnachricht in Zeichen
pub const MAX_NACHRICHT_ZEICHEN: usize = 4096;

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Ereignisse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InternalError,
    InvalidRequest,
    ServerFull,
}

// ---------------------------------------------------------------------------
// Eingehende Nachrichten (Client -> Server)
// ---------------------------------------------------------------------------

/// Anmeldung eines Peers am Presence-Dienst
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub peer_id: PeerId,
    pub display_name: String,
}

impl ConnectRequest {
    /// Bereinigter Anzeigename: getrimmt und auf
    /// [`MAX_ANZEIGENAME_ZEICHEN`] gekuerzt, leer faellt auf die Peer-ID zurueck
    pub fn anzeigename(&self) -> String {
        let name: String = self
            .display_name
            .trim()
            .chars()
            .take(MAX_ANZEIGENAME_ZEICHEN)
            .collect();
        if name.is_empty() {
            self.peer_id.as_str().to_string()
        } else {
            name
        }
    }
}

/// Suche starten oder abbrechen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub peer_id: PeerId,
}

/// Laufenden Anruf beenden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndCallRequest {
    pub peer_id: PeerId,
}

/// Textnachricht an einen bestimmten Peer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub from: PeerId,
    #[serde(default)]
    pub from_display_name: String,
    pub to: PeerId,
    pub text: String,
}

/// Geschenk/Effekt an einen bestimmten Peer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendGiftRequest {
    pub from: PeerId,
    #[serde(default)]
    pub from_display_name: String,
    pub to: PeerId,
    /// Art des Geschenks (vom Client frei gewaehlt, z.B. "heart")
    pub gift: String,
}

/// Alle Ereignisse die ein Client senden darf
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Connect(ConnectRequest),
    Heartbeat,
    StartSearch(SearchRequest),
    StopSearch(SearchRequest),
    EndCall(EndCallRequest),
    GetUsers,
    SendMessage(SendMessageRequest),
    SendGift(SendGiftRequest),
}

impl ClientEvent {
    /// Kurzer Name fuer Logs und Metriken
    pub fn art(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Heartbeat => "heartbeat",
            Self::StartSearch(_) => "start_search",
            Self::StopSearch(_) => "stop_search",
            Self::EndCall(_) => "end_call",
            Self::GetUsers => "get_users",
            Self::SendMessage(_) => "send_message",
            Self::SendGift(_) => "send_gift",
        }
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten (Server -> Client)
// ---------------------------------------------------------------------------

/// Vollstaendige Presence-Liste
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceListEvent {
    pub users: Vec<PresenceEntry>,
}

/// Gegenueber eines Matches bzw. Peer der den Dienst verlassen hat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub peer_id: PeerId,
    pub display_name: String,
}

/// Server-Benachrichtigung (z.B. Willkommen)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: String,
    pub message: String,
}

/// Zugestellte Textnachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessageEvent {
    pub from: PeerId,
    pub from_display_name: String,
    pub text: String,
    /// Server-Zeitstempel (Unix-Millisekunden)
    pub timestamp_ms: i64,
}

/// Zugestelltes Geschenk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftReceivedEvent {
    pub from: PeerId,
    pub from_display_name: String,
    pub gift: String,
}

/// Fehler-Ereignis (z.B. nicht dekodierbarer Frame)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub code: ErrorCode,
    pub message: String,
}

/// Alle Ereignisse die der Server senden kann
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    PresenceList(PresenceListEvent),
    SearchStarted,
    PartnerFound(PeerInfo),
    CallEnded,
    PartnerDisconnected,
    HeartbeatAck,
    Notification(Notification),
    NewMessage(NewMessageEvent),
    GiftReceived(GiftReceivedEvent),
    UserLeft(PeerInfo),
    Error(ErrorEvent),
}

impl ServerEvent {
    /// Erstellt eine Presence-Liste
    pub fn presence_list(users: Vec<PresenceEntry>) -> Self {
        Self::PresenceList(PresenceListEvent { users })
    }

    /// Erstellt die Willkommens-Benachrichtigung
    pub fn willkommen(anzeigename: &str) -> Self {
        Self::Notification(Notification {
            kind: "welcome".into(),
            message: format!("Welcome to Gleaphe Chat, {anzeigename}!"),
        })
    }

    /// Erstellt ein Fehler-Ereignis
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorEvent {
            code,
            message: message.into(),
        })
    }

    /// Kurzer Name fuer Logs
    pub fn art(&self) -> &'static str {
        match self {
            Self::PresenceList(_) => "presence_list",
            Self::SearchStarted => "search_started",
            Self::PartnerFound(_) => "partner_found",
            Self::CallEnded => "call_ended",
            Self::PartnerDisconnected => "partner_disconnected",
            Self::HeartbeatAck => "heartbeat_ack",
            Self::Notification(_) => "notification",
            Self::NewMessage(_) => "new_message",
            Self::GiftReceived(_) => "gift_received",
            Self::UserLeft(_) => "user_left",
            Self::Error(_) => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(s: &str) -> PeerId {
        PeerId::parse(s).unwrap()
    }

    #[test]
    fn connect_aus_json() {
        let json = r#"{"type":"connect","peer_id":"p-1","display_name":"alice"}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::Connect(req) => {
                assert_eq!(req.peer_id, peer("p-1"));
                assert_eq!(req.display_name, "alice");
            }
            andere => panic!("Erwartet Connect, erhalten {andere:?}"),
        }
    }

    #[test]
    fn einheits_varianten_aus_json() {
        let hb: ClientEvent = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert!(matches!(hb, ClientEvent::Heartbeat));
        let gu: ClientEvent = serde_json::from_str(r#"{"type":"get_users"}"#).unwrap();
        assert!(matches!(gu, ClientEvent::GetUsers));
    }

    #[test]
    fn fehlende_pflichtfelder_abgelehnt() {
        let ohne_peer = r#"{"type":"start_search"}"#;
        assert!(serde_json::from_str::<ClientEvent>(ohne_peer).is_err());

        let leere_peer = r#"{"type":"end_call","peer_id":""}"#;
        assert!(serde_json::from_str::<ClientEvent>(leere_peer).is_err());

        let unbekannt = r#"{"type":"self_destruct"}"#;
        assert!(serde_json::from_str::<ClientEvent>(unbekannt).is_err());
    }

    #[test]
    fn send_message_anzeigename_optional() {
        let json = r#"{"type":"send_message","from":"a","to":"b","text":"hi"}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        let ClientEvent::SendMessage(req) = event else {
            panic!("Erwartet SendMessage");
        };
        assert!(req.from_display_name.is_empty());
        assert_eq!(req.text, "hi");
    }

    #[test]
    fn anzeigename_wird_bereinigt() {
        let req = ConnectRequest {
            peer_id: peer("p"),
            display_name: "  bob  ".into(),
        };
        assert_eq!(req.anzeigename(), "bob");

        let leer = ConnectRequest {
            peer_id: peer("p-9"),
            display_name: "   ".into(),
        };
        assert_eq!(leer.anzeigename(), "p-9");

        let lang = ConnectRequest {
            peer_id: peer("p"),
            display_name: "ä".repeat(MAX_ANZEIGENAME_ZEICHEN + 10),
        };
        assert_eq!(lang.anzeigename().chars().count(), MAX_ANZEIGENAME_ZEICHEN);
    }

    #[test]
    fn server_events_json_format() {
        let json = serde_json::to_string(&ServerEvent::SearchStarted).unwrap();
        assert_eq!(json, r#"{"type":"search_started"}"#);

        let gefunden = ServerEvent::PartnerFound(PeerInfo {
            peer_id: peer("b"),
            display_name: "bob".into(),
        });
        let json = serde_json::to_string(&gefunden).unwrap();
        assert!(json.contains(r#""type":"partner_found""#));
        assert!(json.contains(r#""peer_id":"b""#));
        assert!(json.contains(r#""display_name":"bob""#));
    }

    #[test]
    fn willkommen_enthaelt_namen() {
        let ServerEvent::Notification(n) = ServerEvent::willkommen("alice") else {
            panic!("Erwartet Notification");
        };
        assert_eq!(n.kind, "welcome");
        assert!(n.message.contains("alice"));
    }

    #[test]
    fn fehler_code_format() {
        let json = serde_json::to_string(&ServerEvent::error(ErrorCode::InvalidRequest, "x"))
            .unwrap();
        assert!(json.contains("INVALID_REQUEST"));
    }
}
