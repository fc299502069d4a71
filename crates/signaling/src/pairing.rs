//! Call-Pairing-Tabelle
//!
//! Jedes Paar wird als zwei reziproke Eintraege `A -> B` und `B -> A`
//! gespeichert. Anlegen und Aufloesen erfolgen immer fuer beide Richtungen,
//! die Tabelle ist dadurch jederzeit symmetrisch.

use gleaphe_core::types::PeerId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct CallPairs {
    partner: HashMap<PeerId, PeerId>,
}

impl CallPairs {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Verbindet `a` und `b`; beide Seiten muessen ungepaart sein
    pub fn verbinden(&mut self, a: PeerId, b: PeerId) {
        debug_assert!(a != b, "Peer kann nicht mit sich selbst gepaart werden");
        debug_assert!(
            !self.ist_gepaart(&a) && !self.ist_gepaart(&b),
            "verbinden nur fuer ungepaarte Peers"
        );
        self.partner.insert(a.clone(), b.clone());
        self.partner.insert(b, a);
    }

    /// Loest das Paar von `peer_id` auf und gibt den Partner zurueck
    pub fn trennen(&mut self, peer_id: &PeerId) -> Option<PeerId> {
        let partner = self.partner.remove(peer_id)?;
        self.partner.remove(&partner);
        Some(partner)
    }

    pub fn partner(&self, peer_id: &PeerId) -> Option<&PeerId> {
        self.partner.get(peer_id)
    }

    pub fn ist_gepaart(&self, peer_id: &PeerId) -> bool {
        self.partner.contains_key(peer_id)
    }

    /// Alle gepaarten Peer-IDs (beide Seiten)
    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.partner.keys().cloned().collect()
    }

    /// Anzahl der Eintraege (zwei pro Paar)
    #[cfg(test)]
    pub fn eintraege(&self) -> usize {
        self.partner.len()
    }

    pub fn anzahl_paare(&self) -> usize {
        self.partner.len() / 2
    }

    /// Prueft die Symmetrie-Invariante
    pub fn ist_symmetrisch(&self) -> bool {
        self.partner
            .iter()
            .all(|(a, b)| a != b && self.partner.get(b) == Some(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(s: &str) -> PeerId {
        PeerId::parse(s).unwrap()
    }

    #[test]
    fn verbinden_legt_beide_richtungen_an() {
        let mut paare = CallPairs::neu();
        paare.verbinden(peer("a"), peer("b"));

        assert_eq!(paare.partner(&peer("a")), Some(&peer("b")));
        assert_eq!(paare.partner(&peer("b")), Some(&peer("a")));
        assert_eq!(paare.eintraege(), 2);
        assert_eq!(paare.anzahl_paare(), 1);
        assert!(paare.ist_symmetrisch());
    }

    #[test]
    fn trennen_entfernt_beide_richtungen() {
        let mut paare = CallPairs::neu();
        paare.verbinden(peer("a"), peer("b"));

        assert_eq!(paare.trennen(&peer("b")), Some(peer("a")));
        assert!(!paare.ist_gepaart(&peer("a")));
        assert!(!paare.ist_gepaart(&peer("b")));
        assert_eq!(paare.trennen(&peer("a")), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "ungepaarte")]
    fn verbinden_eines_gepaarten_peers_ist_ein_fehler() {
        let mut paare = CallPairs::neu();
        paare.verbinden(peer("a"), peer("b"));
        paare.verbinden(peer("a"), peer("c"));
    }
}
