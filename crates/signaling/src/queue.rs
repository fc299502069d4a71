//! Matchmaking-Warteschlange (strikt FIFO)

use gleaphe_core::types::{PeerId, TransportId};
use std::collections::VecDeque;

/// Ein Peer der auf einen Gespraechspartner wartet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingEntry {
    pub peer_id: PeerId,
    pub transport_id: TransportId,
}

/// Geordnete Warteliste; der am laengsten Wartende steht vorne
#[derive(Debug, Default)]
pub struct MatchQueue {
    eintraege: VecDeque<WaitingEntry>,
}

impl MatchQueue {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Haengt einen Peer hinten an; doppelte Eintraege werden verhindert
    ///
    /// Gibt false zurueck wenn der Peer bereits wartet.
    pub fn push_back(&mut self, eintrag: WaitingEntry) -> bool {
        if self.contains(&eintrag.peer_id) {
            return false;
        }
        self.eintraege.push_back(eintrag);
        true
    }

    pub fn pop_front(&mut self) -> Option<WaitingEntry> {
        self.eintraege.pop_front()
    }

    /// Entfernt einen Peer; gibt true zurueck wenn er gewartet hat
    pub fn remove(&mut self, peer_id: &PeerId) -> bool {
        let vorher = self.eintraege.len();
        self.eintraege.retain(|e| &e.peer_id != peer_id);
        self.eintraege.len() != vorher
    }

    /// Behaelt nur Eintraege fuer die `behalten` true liefert
    pub fn retain(&mut self, behalten: impl FnMut(&WaitingEntry) -> bool) {
        self.eintraege.retain(behalten);
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.eintraege.iter().any(|e| &e.peer_id == peer_id)
    }

    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.eintraege.iter().map(|e| e.peer_id.clone()).collect()
    }
}
