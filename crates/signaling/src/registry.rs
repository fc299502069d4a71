//! Connection-Registry – Wer ist gerade verbunden?
//!
//! Haelt pro Peer-ID genau einen Eintrag mit Anzeigename, gebundener
//! Transport-Kennung und Aktivitaetszeitpunkt. Die Reihenfolge der Eintraege
//! entspricht der Reihenfolge der ersten Anmeldung; ein Reconnect ersetzt
//! den Eintrag an seiner bisherigen Position.
//!
//! Die Registry ist nicht thread-safe. Sie gehoert dem `PresenceState`,
//! der hinter einem einzigen Mutex liegt.

use chrono::{DateTime, Utc};
use gleaphe_core::types::{PeerId, TransportId};
use gleaphe_protocol::status::PresenceEntry;
use std::time::{Duration, Instant};

/// Ein logisch verbundener Teilnehmer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedUser {
    /// Aktuell gebundene Transport-Sitzung
    pub transport_id: TransportId,
    pub peer_id: PeerId,
    pub display_name: String,
    /// Letzte Aktivitaet (Connect, Heartbeat)
    pub last_seen: Instant,
    /// True solange der Peer in der Warteschlange steht
    pub searching: bool,
    pub connected_at: DateTime<Utc>,
}

impl ConnectedUser {
    /// Oeffentlich sichtbarer Presence-Eintrag
    pub fn als_eintrag(&self) -> PresenceEntry {
        PresenceEntry {
            peer_id: self.peer_id.clone(),
            display_name: self.display_name.clone(),
            searching: self.searching,
        }
    }

    /// Ist der Eintrag zum Zeitpunkt `jetzt` aelter als `schwelle`?
    pub fn ist_veraltet(&self, jetzt: Instant, schwelle: Duration) -> bool {
        jetzt.saturating_duration_since(self.last_seen) >= schwelle
    }
}

/// Ergebnis von [`ConnectionRegistry::upsert`]
#[derive(Debug, Clone)]
pub struct Eintragung {
    /// Der neue Eintrag
    pub nutzer: ConnectedUser,
    /// Der ersetzte Eintrag bei einem Reconnect
    pub ersetzt: Option<ConnectedUser>,
    /// Eintrag einer anderen Peer-ID, der bisher an diesen Transport
    /// gebunden war
    pub verdraengt: Option<ConnectedUser>,
}

/// Geordnete Registry aller verbundenen Peers
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    nutzer: Vec<ConnectedUser>,
}

impl ConnectionRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Fuegt einen Peer ein oder ersetzt seinen Eintrag vollstaendig
    ///
    /// Der Transport wird neu gebunden, `last_seen` zurueckgesetzt und
    /// `searching` geloescht.
    pub fn upsert(
        &mut self,
        peer_id: PeerId,
        transport_id: TransportId,
        display_name: String,
        jetzt: Instant,
    ) -> Eintragung {
        let nutzer = ConnectedUser {
            transport_id,
            peer_id,
            display_name,
            last_seen: jetzt,
            searching: false,
            connected_at: Utc::now(),
        };

        // Ein Transport gehoert hoechstens einem Peer
        let alter_peer = self
            .nutzer
            .iter()
            .position(|n| n.transport_id == transport_id && n.peer_id != nutzer.peer_id);
        let verdraengt = alter_peer.map(|index| self.nutzer.remove(index));
        if let Some(ref alt) = verdraengt {
            tracing::debug!(
                peer_id = %alt.peer_id,
                transport_id = %transport_id,
                "Transport wechselt Peer-ID, alter Eintrag entfernt"
            );
        }

        let ersetzt = match self.nutzer.iter().position(|n| n.peer_id == nutzer.peer_id) {
            Some(index) => Some(std::mem::replace(&mut self.nutzer[index], nutzer.clone())),
            None => {
                self.nutzer.push(nutzer.clone());
                None
            }
        };

        Eintragung {
            nutzer,
            ersetzt,
            verdraengt,
        }
    }

    /// Aktualisiert `last_seen` des Besitzers von `transport_id`
    ///
    /// Unbekannte Transporte werden still ignoriert.
    pub fn touch(&mut self, transport_id: TransportId, jetzt: Instant) -> bool {
        match self.nutzer.iter_mut().find(|n| n.transport_id == transport_id) {
            Some(nutzer) => {
                nutzer.last_seen = jetzt;
                true
            }
            None => false,
        }
    }

    /// Entfernt den an `transport_id` gebundenen Eintrag
    pub fn remove_by_transport(&mut self, transport_id: TransportId) -> Option<ConnectedUser> {
        let index = self
            .nutzer
            .iter()
            .position(|n| n.transport_id == transport_id)?;
        Some(self.nutzer.remove(index))
    }

    /// Entfernt alle Eintraege die zum Zeitpunkt `jetzt` veraltet sind
    pub fn remove_stale(&mut self, jetzt: Instant, schwelle: Duration) -> Vec<ConnectedUser> {
        let (veraltet, frisch): (Vec<_>, Vec<_>) = std::mem::take(&mut self.nutzer)
            .into_iter()
            .partition(|n| n.ist_veraltet(jetzt, schwelle));
        self.nutzer = frisch;
        veraltet
    }

    /// Setzt das Such-Flag eines Peers; gibt false zurueck wenn unbekannt
    pub fn set_searching(&mut self, peer_id: &PeerId, searching: bool) -> bool {
        match self.nutzer.iter_mut().find(|n| &n.peer_id == peer_id) {
            Some(nutzer) => {
                nutzer.searching = searching;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&ConnectedUser> {
        self.nutzer.iter().find(|n| &n.peer_id == peer_id)
    }

    #[cfg(test)]
    pub fn by_transport(&self, transport_id: TransportId) -> Option<&ConnectedUser> {
        self.nutzer.iter().find(|n| n.transport_id == transport_id)
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.get(peer_id).is_some()
    }

    /// Geordnete Momentaufnahme aller Eintraege
    pub fn list(&self) -> Vec<ConnectedUser> {
        self.nutzer.clone()
    }

    pub fn len(&self) -> usize {
        self.nutzer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nutzer.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
