//! Gemeinsame Identifikationstypen fuer Gleaphe
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Peer-Kennung (vom Client gewaehlt, stabil) und Transport-Kennung
//! (pro Verbindung, vom Server vergeben) zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GleapheError;

/// Maximale Laenge einer Peer-Kennung in Bytes
pub const MAX_PEER_ID_LAENGE: usize = 128;

/// Stabile, vom Client gewaehlte Peer-Kennung
///
/// Wird beim Deserialisieren validiert: nicht leer, hoechstens
/// [`MAX_PEER_ID_LAENGE`] Bytes, keine Steuerzeichen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerId(String);

impl PeerId {
    /// Erstellt eine PeerId nach Validierung
    pub fn parse(wert: impl Into<String>) -> crate::Result<Self> {
        let wert = wert.into();
        if wert.trim().is_empty() {
            return Err(GleapheError::UngueltigeKennung(
                "Peer-ID darf nicht leer sein".into(),
            ));
        }
        if wert.len() > MAX_PEER_ID_LAENGE {
            return Err(GleapheError::UngueltigeKennung(format!(
                "Peer-ID zu lang: {} Bytes (Maximum: {MAX_PEER_ID_LAENGE})",
                wert.len()
            )));
        }
        if wert.chars().any(char::is_control) {
            return Err(GleapheError::UngueltigeKennung(
                "Peer-ID enthaelt Steuerzeichen".into(),
            ));
        }
        Ok(Self(wert))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PeerId {
    type Error = GleapheError;

    fn try_from(wert: String) -> Result<Self, Self::Error> {
        Self::parse(wert)
    }
}

impl From<PeerId> for String {
    fn from(id: PeerId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer:{}", self.0)
    }
}

/// Kennung einer einzelnen Transport-Sitzung (aendert sich bei Reconnect)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportId(pub Uuid);

impl TransportId {
    /// Erstellt eine neue zufaellige TransportId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransportId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transport:{}", self.0)
    }
}
