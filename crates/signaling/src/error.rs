//! Fehlertypen fuer den Signaling-Service
//!
//! Keiner dieser Fehler bricht eine Presence-Operation ab. `UnbekannterPeer`
//! und `VeralteterEintrag` fuehren zu einem stillen No-op, `SendFehler` wird
//! protokolliert und nicht wiederholt. Nur `Io` und `Protokoll` beenden die
//! betroffene Verbindung.

use gleaphe_core::types::{PeerId, TransportId};
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Protokollfehler (ungueltiges Frame)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Operation bezieht sich auf einen nicht registrierten Peer
    #[error("Unbekannter Peer: {0}")]
    UnbekannterPeer(PeerId),

    /// Warteschlangen-Eintrag ohne zugehoerigen Registry-Eintrag
    #[error("Veralteter Warteschlangen-Eintrag: {0}")]
    VeralteterEintrag(PeerId),

    /// Senden an einen Transport fehlgeschlagen (Queue voll oder geschlossen)
    #[error("Senden an {transport_id} fehlgeschlagen: {grund}")]
    SendFehler {
        transport_id: TransportId,
        grund: &'static str,
    },
}

impl SignalingError {
    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
