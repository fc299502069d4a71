//! Presence-Zustand – Registry, Warteschlange und Pairing als eine Einheit
//!
//! Der `PresenceState` besitzt alle drei Sammlungen und ist der einzige Ort,
//! an dem sie veraendert werden. Jede Operation gibt die auszuliefernden
//! Ereignisse als `Vec<Ausgang>` zurueck, statt selbst zu senden: der Aufrufer
//! haelt den Mutex nur waehrend der Zustandsaenderung und stellt danach zu.
//!
//! ## Zustandsautomat pro Peer
//! ```text
//! Idle --start_search--> Searching --Match--> Paired
//!  ^                        |                   |
//!  +------stop_search-------+                   |
//!  +------end_call / disconnect / sweep---------+
//! ```

use chrono::Utc;
use gleaphe_core::types::{PeerId, TransportId};
use gleaphe_protocol::events::{
    GiftReceivedEvent, NewMessageEvent, PeerInfo, SendGiftRequest, SendMessageRequest,
    ServerEvent,
};
use gleaphe_protocol::status::{PresenceDetail, PresenceEntry};
use std::time::{Duration, Instant};

use crate::error::{SignalingError, SignalingResult};
use crate::pairing::CallPairs;
use crate::queue::{MatchQueue, WaitingEntry};
use crate::registry::{ConnectedUser, ConnectionRegistry};

// ---------------------------------------------------------------------------
// Ausgang
// ---------------------------------------------------------------------------

/// Ein auszulieferndes Ereignis
#[derive(Debug, Clone, PartialEq)]
pub enum Ausgang {
    /// An genau einen Transport
    Unicast {
        transport_id: TransportId,
        event: ServerEvent,
    },
    /// An alle verbundenen Transporte
    Broadcast(ServerEvent),
}

impl Ausgang {
    pub fn event(&self) -> &ServerEvent {
        match self {
            Self::Unicast { event, .. } | Self::Broadcast(event) => event,
        }
    }
}

// ---------------------------------------------------------------------------
// PresenceState
// ---------------------------------------------------------------------------

/// Besitzt Registry, Warteschlange und Pairing-Tabelle
#[derive(Debug, Default)]
pub struct PresenceState {
    registry: ConnectionRegistry,
    queue: MatchQueue,
    paare: CallPairs,
}

impl PresenceState {
    pub fn neu() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Sitzung
    // -----------------------------------------------------------------------

    /// Meldet einen Peer an (oder bindet ihn bei Reconnect neu)
    ///
    /// Sendet die Willkommens-Benachrichtigung an den Transport und die
    /// vollstaendige Presence-Liste an alle.
    pub fn connect(
        &mut self,
        transport_id: TransportId,
        peer_id: PeerId,
        display_name: String,
        jetzt: Instant,
    ) -> Vec<Ausgang> {
        let mut ausgang = Vec::new();
        let eintragung = self
            .registry
            .upsert(peer_id.clone(), transport_id, display_name, jetzt);

        if let Some(verdraengt) = eintragung.verdraengt {
            tracing::info!(
                peer_id = %verdraengt.peer_id,
                neuer_peer = %peer_id,
                "Transport meldet sich unter neuer Peer-ID an"
            );
            self.aufraeumen(&verdraengt.peer_id, ServerEvent::PartnerDisconnected, &mut ausgang);
            ausgang.push(Ausgang::Broadcast(ServerEvent::UserLeft(PeerInfo {
                peer_id: verdraengt.peer_id,
                display_name: verdraengt.display_name,
            })));
        }

        if let Some(ersetzt) = &eintragung.ersetzt {
            // Der neue Eintrag sucht nicht mehr; ein laufendes Paar bleibt bestehen
            if self.queue.remove(&peer_id) {
                tracing::debug!(peer_id = %peer_id, "Reconnect beendet laufende Suche");
            }
            tracing::info!(
                peer_id = %peer_id,
                alter_transport = %ersetzt.transport_id,
                neuer_transport = %transport_id,
                "Peer neu verbunden"
            );
        } else {
            tracing::info!(
                peer_id = %peer_id,
                display_name = %eintragung.nutzer.display_name,
                "Peer online"
            );
        }

        ausgang.push(Ausgang::Unicast {
            transport_id,
            event: ServerEvent::willkommen(&eintragung.nutzer.display_name),
        });
        self.presence_broadcast(&mut ausgang);
        ausgang
    }

    /// Heartbeat eines Transports
    ///
    /// Aktualisiert `last_seen` falls der Transport einem Peer gehoert; die
    /// Bestaetigung geht in jedem Fall zurueck.
    pub fn heartbeat(&mut self, transport_id: TransportId, jetzt: Instant) -> Vec<Ausgang> {
        if !self.registry.touch(transport_id, jetzt) {
            tracing::trace!(transport_id = %transport_id, "Heartbeat ohne Registry-Eintrag");
        }
        vec![Ausgang::Unicast {
            transport_id,
            event: ServerEvent::HeartbeatAck,
        }]
    }

    /// Transport wurde geschlossen
    ///
    /// Entfernt den gebundenen Peer, raeumt Warteschlange und Paar auf und
    /// informiert alle uebrigen Clients.
    pub fn disconnect(&mut self, transport_id: TransportId) -> Vec<Ausgang> {
        let mut ausgang = Vec::new();
        let Some(nutzer) = self.registry.remove_by_transport(transport_id) else {
            return ausgang;
        };

        tracing::info!(peer_id = %nutzer.peer_id, "Peer offline");
        self.aufraeumen(&nutzer.peer_id, ServerEvent::PartnerDisconnected, &mut ausgang);

        ausgang.push(Ausgang::Broadcast(ServerEvent::UserLeft(PeerInfo {
            peer_id: nutzer.peer_id,
            display_name: nutzer.display_name,
        })));
        self.presence_broadcast(&mut ausgang);
        ausgang
    }

    /// Presence-Liste nur fuer den anfragenden Transport
    pub fn presence_fuer(&self, transport_id: TransportId) -> Vec<Ausgang> {
        vec![Ausgang::Unicast {
            transport_id,
            event: ServerEvent::presence_list(self.presence_list()),
        }]
    }

    // -----------------------------------------------------------------------
    // Matchmaking
    // -----------------------------------------------------------------------

    /// Startet die Partnersuche
    ///
    /// Der aelteste lebende Wartende wird sofort gepaart; sonst kommt der
    /// Peer ans Ende der Warteschlange. Veraltete Eintraege am Kopf der
    /// Schlange werden dabei verworfen.
    pub fn start_search(&mut self, peer_id: &PeerId) -> Vec<Ausgang> {
        let ich = match self.nutzer(peer_id) {
            Ok(nutzer) => nutzer.clone(),
            Err(e) => {
                tracing::debug!(fehler = %e, "start_search ignoriert");
                return Vec::new();
            }
        };

        if self.paare.ist_gepaart(peer_id) {
            tracing::debug!(peer_id = %peer_id, "start_search waehrend eines Anrufs ignoriert");
            return Vec::new();
        }

        if self.queue.contains(peer_id) {
            return vec![Ausgang::Unicast {
                transport_id: ich.transport_id,
                event: ServerEvent::SearchStarted,
            }];
        }

        self.registry.set_searching(peer_id, true);

        while let Some(kandidat) = self.queue.pop_front() {
            let partner = match self.lebender_kandidat(&kandidat) {
                Ok(partner) => partner,
                Err(e) => {
                    tracing::debug!(fehler = %e, "Warteschlangen-Eintrag verworfen");
                    continue;
                }
            };

            self.paare
                .verbinden(ich.peer_id.clone(), partner.peer_id.clone());
            self.registry.set_searching(&ich.peer_id, false);
            self.registry.set_searching(&partner.peer_id, false);

            tracing::info!(
                peer_a = %ich.peer_id,
                peer_b = %partner.peer_id,
                "Partner gefunden"
            );

            return vec![
                Ausgang::Unicast {
                    transport_id: ich.transport_id,
                    event: ServerEvent::PartnerFound(PeerInfo {
                        peer_id: partner.peer_id.clone(),
                        display_name: partner.display_name.clone(),
                    }),
                },
                Ausgang::Unicast {
                    transport_id: partner.transport_id,
                    event: ServerEvent::PartnerFound(PeerInfo {
                        peer_id: ich.peer_id,
                        display_name: ich.display_name,
                    }),
                },
            ];
        }

        self.queue.push_back(WaitingEntry {
            peer_id: ich.peer_id.clone(),
            transport_id: ich.transport_id,
        });
        tracing::debug!(
            peer_id = %ich.peer_id,
            wartend = self.queue.len(),
            "Peer wartet auf Partner"
        );

        vec![Ausgang::Unicast {
            transport_id: ich.transport_id,
            event: ServerEvent::SearchStarted,
        }]
    }

    /// Bricht die Partnersuche ab (No-op wenn der Peer nicht wartet)
    pub fn stop_search(&mut self, peer_id: &PeerId) -> Vec<Ausgang> {
        if self.queue.remove(peer_id) {
            tracing::debug!(peer_id = %peer_id, "Suche abgebrochen");
        }
        self.registry.set_searching(peer_id, false);
        Vec::new()
    }

    /// Beendet den laufenden Anruf und benachrichtigt den Partner
    pub fn end_call(&mut self, peer_id: &PeerId) -> Vec<Ausgang> {
        let mut ausgang = Vec::new();
        if let Some(partner) = self.paare.trennen(peer_id) {
            tracing::info!(peer_id = %peer_id, partner = %partner, "Anruf beendet");
            self.an_peer(&partner, ServerEvent::CallEnded, &mut ausgang);
        }
        ausgang
    }

    // -----------------------------------------------------------------------
    // Direkt-Relay
    // -----------------------------------------------------------------------

    /// Stellt eine Textnachricht an den Ziel-Peer zu
    pub fn relay_message(&self, req: SendMessageRequest) -> Vec<Ausgang> {
        let mut ausgang = Vec::new();
        let from_display_name = self.absendername(&req.from, req.from_display_name);
        self.an_peer(
            &req.to,
            ServerEvent::NewMessage(NewMessageEvent {
                from: req.from,
                from_display_name,
                text: req.text,
                timestamp_ms: Utc::now().timestamp_millis(),
            }),
            &mut ausgang,
        );
        ausgang
    }

    /// Stellt ein Geschenk an den Ziel-Peer zu
    pub fn relay_gift(&self, req: SendGiftRequest) -> Vec<Ausgang> {
        let mut ausgang = Vec::new();
        let from_display_name = self.absendername(&req.from, req.from_display_name);
        self.an_peer(
            &req.to,
            ServerEvent::GiftReceived(GiftReceivedEvent {
                from: req.from,
                from_display_name,
                gift: req.gift,
            }),
            &mut ausgang,
        );
        ausgang
    }

    // -----------------------------------------------------------------------
    // Liveness
    // -----------------------------------------------------------------------

    /// Entfernt alle Peers ohne Aktivitaet seit `schwelle`
    ///
    /// Raeumt ausserdem Warteschlangen- und Pairing-Eintraege auf, deren
    /// Peer nicht mehr registriert ist. Sendet nur dann eine Presence-Liste,
    /// wenn sich die Registry geaendert hat.
    pub fn sweep(&mut self, jetzt: Instant, schwelle: Duration) -> Vec<Ausgang> {
        let mut ausgang = Vec::new();
        let veraltet = self.registry.remove_stale(jetzt, schwelle);

        for nutzer in &veraltet {
            self.aufraeumen(&nutzer.peer_id, ServerEvent::PartnerDisconnected, &mut ausgang);
        }

        let registry = &self.registry;
        self.queue.retain(|e| registry.contains(&e.peer_id));

        for peer_id in self.paare.peer_ids() {
            if !self.registry.contains(&peer_id) {
                self.aufraeumen(&peer_id, ServerEvent::PartnerDisconnected, &mut ausgang);
            }
        }

        if !veraltet.is_empty() {
            tracing::info!(
                entfernt = veraltet.len(),
                verbleibend = self.registry.len(),
                "Inaktive Peers entfernt"
            );
            self.presence_broadcast(&mut ausgang);
        }
        ausgang
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Geordnete Presence-Liste
    pub fn presence_list(&self) -> Vec<PresenceEntry> {
        self.registry
            .list()
            .iter()
            .map(ConnectedUser::als_eintrag)
            .collect()
    }

    /// Detailansicht eines Peers
    pub fn detail(&self, peer_id: &PeerId, jetzt: Instant) -> Option<PresenceDetail> {
        let nutzer = self.registry.get(peer_id)?;
        Some(PresenceDetail {
            peer_id: nutzer.peer_id.clone(),
            display_name: nutzer.display_name.clone(),
            searching: nutzer.searching,
            paired_with: self.paare.partner(peer_id).cloned(),
            connected_at: nutzer.connected_at,
            idle_seconds: jetzt.saturating_duration_since(nutzer.last_seen).as_secs(),
        })
    }

    pub fn partner(&self, peer_id: &PeerId) -> Option<&PeerId> {
        self.paare.partner(peer_id)
    }

    #[cfg(test)]
    pub fn ist_wartend(&self, peer_id: &PeerId) -> bool {
        self.queue.contains(peer_id)
    }

    pub fn online_anzahl(&self) -> usize {
        self.registry.len()
    }

    pub fn warteschlangen_laenge(&self) -> usize {
        self.queue.len()
    }

    pub fn aktive_paare(&self) -> usize {
        self.paare.anzahl_paare()
    }

    /// Prueft die Invarianten zwischen den drei Sammlungen
    ///
    /// - Pairing ist symmetrisch
    /// - Jeder Wartende ist registriert, sucht und ist nicht gepaart
    /// - Jeder suchende Peer steht in der Warteschlange
    pub fn ist_konsistent(&self) -> bool {
        let wartende = self.queue.peer_ids();
        let wartende_ok = wartende.iter().all(|p| {
            self.registry.get(p).is_some_and(|n| n.searching) && !self.paare.ist_gepaart(p)
        });
        let suchende_ok = self
            .registry
            .list()
            .iter()
            .filter(|n| n.searching)
            .all(|n| wartende.contains(&n.peer_id));
        self.paare.ist_symmetrisch() && wartende_ok && suchende_ok
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    fn nutzer(&self, peer_id: &PeerId) -> SignalingResult<&ConnectedUser> {
        self.registry
            .get(peer_id)
            .ok_or_else(|| SignalingError::UnbekannterPeer(peer_id.clone()))
    }

    /// Ein Warteschlangen-Eintrag ist nur gueltig wenn sein Peer noch
    /// registriert, am selben Transport und ungepaart ist
    fn lebender_kandidat(&self, kandidat: &WaitingEntry) -> SignalingResult<ConnectedUser> {
        match self.registry.get(&kandidat.peer_id) {
            Some(nutzer)
                if nutzer.transport_id == kandidat.transport_id
                    && !self.paare.ist_gepaart(&nutzer.peer_id) =>
            {
                Ok(nutzer.clone())
            }
            _ => Err(SignalingError::VeralteterEintrag(kandidat.peer_id.clone())),
        }
    }

    /// Gemeinsames Aufraeumen fuer Disconnect und Sweep
    fn aufraeumen(&mut self, peer_id: &PeerId, grund: ServerEvent, ausgang: &mut Vec<Ausgang>) {
        self.queue.remove(peer_id);
        if let Some(partner) = self.paare.trennen(peer_id) {
            tracing::debug!(peer_id = %peer_id, partner = %partner, "Paar aufgeloest");
            self.an_peer(&partner, grund, ausgang);
        }
    }

    fn an_peer(&self, peer_id: &PeerId, event: ServerEvent, ausgang: &mut Vec<Ausgang>) {
        match self.nutzer(peer_id) {
            Ok(nutzer) => ausgang.push(Ausgang::Unicast {
                transport_id: nutzer.transport_id,
                event,
            }),
            Err(e) => tracing::debug!(fehler = %e, event = event.art(), "Zustellung ignoriert"),
        }
    }

    fn presence_broadcast(&self, ausgang: &mut Vec<Ausgang>) {
        ausgang.push(Ausgang::Broadcast(ServerEvent::presence_list(
            self.presence_list(),
        )));
    }

    fn absendername(&self, from: &PeerId, angegeben: String) -> String {
        if !angegeben.trim().is_empty() {
            return angegeben;
        }
        self.registry
            .get(from)
            .map(|n| n.display_name.clone())
            .unwrap_or_else(|| from.as_str().to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SCHWELLE: Duration = Duration::from_secs(30);

    fn peer(s: &str) -> PeerId {
        PeerId::parse(s).unwrap()
    }

    struct Welt {
        state: PresenceState,
        start: Instant,
    }

    impl Welt {
        fn neu() -> Self {
            Self {
                state: PresenceState::neu(),
                start: Instant::now(),
            }
        }

        fn verbinden(&mut self, id: &str, name: &str) -> TransportId {
            let t = TransportId::new();
            self.state.connect(t, peer(id), name.into(), self.start);
            t
        }
    }

    fn unicasts_an(ausgang: &[Ausgang], ziel: TransportId) -> Vec<ServerEvent> {
        ausgang
            .iter()
            .filter_map(|a| match a {
                Ausgang::Unicast {
                    transport_id,
                    event,
                } if *transport_id == ziel => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    fn broadcasts(ausgang: &[Ausgang]) -> Vec<ServerEvent> {
        ausgang
            .iter()
            .filter_map(|a| match a {
                Ausgang::Broadcast(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn connect_sendet_willkommen_und_presence() {
        let mut state = PresenceState::neu();
        let t = TransportId::new();

        let ausgang = state.connect(t, peer("a"), "alice".into(), Instant::now());

        let an_a = unicasts_an(&ausgang, t);
        assert!(matches!(&an_a[0], ServerEvent::Notification(n) if n.kind == "welcome"));

        let alle = broadcasts(&ausgang);
        assert_eq!(alle.len(), 1);
        let ServerEvent::PresenceList(liste) = &alle[0] else {
            panic!("Presence-Liste erwartet");
        };
        assert_eq!(liste.users.len(), 1);
        assert_eq!(liste.users[0].display_name, "alice");
    }

    #[test]
    fn zwei_suchende_werden_gepaart() {
        let mut w = Welt::neu();
        let ta = w.verbinden("a", "alice");
        let tb = w.verbinden("b", "bob");

        let ausgang = w.state.start_search(&peer("a"));
        assert_eq!(unicasts_an(&ausgang, ta), vec![ServerEvent::SearchStarted]);
        assert!(w.state.ist_wartend(&peer("a")));

        let ausgang = w.state.start_search(&peer("b"));
        assert_eq!(
            unicasts_an(&ausgang, ta),
            vec![ServerEvent::PartnerFound(PeerInfo {
                peer_id: peer("b"),
                display_name: "bob".into()
            })]
        );
        assert_eq!(
            unicasts_an(&ausgang, tb),
            vec![ServerEvent::PartnerFound(PeerInfo {
                peer_id: peer("a"),
                display_name: "alice".into()
            })]
        );

        assert_eq!(w.state.warteschlangen_laenge(), 0);
        assert_eq!(w.state.aktive_paare(), 1);
        assert_eq!(w.state.partner(&peer("a")), Some(&peer("b")));
        assert_eq!(w.state.partner(&peer("b")), Some(&peer("a")));
        assert!(w.state.presence_list().iter().all(|e| !e.searching));
        assert!(w.state.ist_konsistent());
    }

    #[test]
    fn gestoppte_suche_wird_nicht_gepaart() {
        let mut w = Welt::neu();
        w.verbinden("a", "alice");
        w.verbinden("b", "bob");
        w.verbinden("c", "carol");

        w.state.start_search(&peer("a"));
        w.state.stop_search(&peer("a"));
        w.state.start_search(&peer("b"));
        w.state.start_search(&peer("a"));
        assert_eq!(w.state.partner(&peer("a")), Some(&peer("b")));

        w.state.start_search(&peer("c"));
        assert!(w.state.ist_wartend(&peer("c")));
        assert!(w.state.ist_konsistent());
    }

    #[test]
    fn unbekannter_peer_ist_noop() {
        let mut state = PresenceState::neu();
        assert!(state.start_search(&peer("ghost")).is_empty());
        assert!(state.stop_search(&peer("ghost")).is_empty());
        assert!(state.end_call(&peer("ghost")).is_empty());
        assert_eq!(state.warteschlangen_laenge(), 0);
    }

    #[test]
    fn doppelte_suche_behaelt_position() {
        let mut w = Welt::neu();
        let ta = w.verbinden("a", "alice");

        w.state.start_search(&peer("a"));
        let ausgang = w.state.start_search(&peer("a"));
        assert_eq!(unicasts_an(&ausgang, ta), vec![ServerEvent::SearchStarted]);
        assert_eq!(w.state.warteschlangen_laenge(), 1);
        assert_eq!(w.state.aktive_paare(), 0);
    }

    #[test]
    fn suche_waehrend_anruf_wird_ignoriert() {
        let mut w = Welt::neu();
        w.verbinden("a", "alice");
        w.verbinden("b", "bob");
        w.verbinden("c", "carol");
        w.state.start_search(&peer("a"));
        w.state.start_search(&peer("b"));
        w.state.start_search(&peer("c"));

        assert!(w.state.start_search(&peer("a")).is_empty());
        assert_eq!(w.state.partner(&peer("a")), Some(&peer("b")));
        assert!(w.state.ist_wartend(&peer("c")));
        assert!(w.state.ist_konsistent());
    }

    #[test]
    fn stop_search_entfernt_aus_warteschlange() {
        let mut w = Welt::neu();
        w.verbinden("a", "alice");
        w.state.start_search(&peer("a"));

        w.state.stop_search(&peer("a"));
        assert_eq!(w.state.warteschlangen_laenge(), 0);
        assert!(!w.state.presence_list()[0].searching);

        // Zweites Mal: No-op
        assert!(w.state.stop_search(&peer("a")).is_empty());
    }

    #[test]
    fn end_call_benachrichtigt_partner_genau_einmal() {
        let mut w = Welt::neu();
        let ta = w.verbinden("a", "alice");
        let tb = w.verbinden("b", "bob");
        w.state.start_search(&peer("a"));
        w.state.start_search(&peer("b"));

        let ausgang = w.state.end_call(&peer("a"));
        assert_eq!(unicasts_an(&ausgang, tb), vec![ServerEvent::CallEnded]);
        assert!(unicasts_an(&ausgang, ta).is_empty());
        assert_eq!(w.state.partner(&peer("a")), None);
        assert_eq!(w.state.partner(&peer("b")), None);

        assert!(w.state.end_call(&peer("a")).is_empty());
        assert_eq!(w.state.aktive_paare(), 0);
    }

    #[test]
    fn disconnect_benachrichtigt_partner() {
        let mut w = Welt::neu();
        let ta = w.verbinden("a", "alice");
        let tb = w.verbinden("b", "bob");
        w.state.start_search(&peer("a"));
        w.state.start_search(&peer("b"));

        let ausgang = w.state.disconnect(ta);
        assert_eq!(unicasts_an(&ausgang, tb), vec![ServerEvent::PartnerDisconnected]);

        let alle = broadcasts(&ausgang);
        assert!(matches!(&alle[0], ServerEvent::UserLeft(info) if info.peer_id == peer("a")));
        let ServerEvent::PresenceList(liste) = &alle[1] else {
            panic!("Presence-Liste erwartet");
        };
        assert_eq!(liste.users.len(), 1);
        assert_eq!(w.state.aktive_paare(), 0);
        assert!(w.state.ist_konsistent());
    }

    #[test]
    fn disconnect_unbekannter_transport_ist_noop() {
        let mut state = PresenceState::neu();
        assert!(state.disconnect(TransportId::new()).is_empty());
    }

    #[test]
    fn disconnect_entfernt_aus_warteschlange() {
        let mut w = Welt::neu();
        let ta = w.verbinden("a", "alice");
        w.state.start_search(&peer("a"));

        w.state.disconnect(ta);
        assert_eq!(w.state.warteschlangen_laenge(), 0);
    }

    #[test]
    fn heartbeat_bestaetigt_auch_unbekannte_transporte() {
        let mut state = PresenceState::neu();
        let t = TransportId::new();
        let ausgang = state.heartbeat(t, Instant::now());
        assert_eq!(unicasts_an(&ausgang, t), vec![ServerEvent::HeartbeatAck]);
        assert_eq!(state.online_anzahl(), 0);
    }

    #[test]
    fn reconnect_beendet_suche_aber_nicht_paar() {
        let mut w = Welt::neu();
        w.verbinden("a", "alice");
        w.verbinden("b", "bob");
        w.verbinden("c", "carol");
        w.state.start_search(&peer("a"));
        w.state.start_search(&peer("b"));
        w.state.start_search(&peer("c"));

        let tc_neu = TransportId::new();
        w.state.connect(tc_neu, peer("c"), "carol".into(), w.start);
        assert!(!w.state.ist_wartend(&peer("c")));

        let ta_neu = TransportId::new();
        w.state.connect(ta_neu, peer("a"), "alice".into(), w.start);
        assert_eq!(w.state.partner(&peer("a")), Some(&peer("b")));

        // Zustellung an den Partner geht an den neuen Transport
        let ausgang = w.state.end_call(&peer("b"));
        assert_eq!(unicasts_an(&ausgang, ta_neu), vec![ServerEvent::CallEnded]);
        assert!(w.state.ist_konsistent());
    }

    #[test]
    fn transport_wechselt_peer_raeumt_alten_peer_auf() {
        let mut w = Welt::neu();
        let ta = w.verbinden("a", "alice");
        let tb = w.verbinden("b", "bob");
        w.state.start_search(&peer("a"));
        w.state.start_search(&peer("b"));

        let ausgang = w.state.connect(ta, peer("z"), "zed".into(), w.start);
        assert_eq!(unicasts_an(&ausgang, tb), vec![ServerEvent::PartnerDisconnected]);
        assert_eq!(w.state.aktive_paare(), 0);
        assert_eq!(w.state.online_anzahl(), 2);
        assert!(w.state.ist_konsistent());

        // Der verdraengte Peer verabschiedet sich wie bei einem Disconnect
        let alle = broadcasts(&ausgang);
        assert_eq!(
            alle[0],
            ServerEvent::UserLeft(PeerInfo {
                peer_id: peer("a"),
                display_name: "alice".into(),
            })
        );
        let ServerEvent::PresenceList(liste) = &alle[1] else {
            panic!("Presence-Liste erwartet");
        };
        assert!(liste.users.iter().all(|u| u.peer_id != peer("a")));
    }

    #[test]
    fn veralteter_kopf_wird_verworfen() {
        let mut w = Welt::neu();
        w.verbinden("a", "alice");
        w.verbinden("b", "bob");
        let tc = w.verbinden("c", "carol");
        w.state.start_search(&peer("a"));

        // Inkonsistenz erzwingen: a verschwindet ohne Aufraeumen
        let ta = w.state.registry.get(&peer("a")).unwrap().transport_id;
        w.state.registry.remove_by_transport(ta);
        assert_eq!(w.state.warteschlangen_laenge(), 1);

        let ausgang = w.state.start_search(&peer("c"));
        assert_eq!(unicasts_an(&ausgang, tc), vec![ServerEvent::SearchStarted]);
        assert_eq!(w.state.queue.peer_ids(), vec![peer("c")]);

        w.state.start_search(&peer("b"));
        assert_eq!(w.state.partner(&peer("b")), Some(&peer("c")));
    }

    #[test]
    fn sweep_entfernt_inaktive_und_ist_idempotent() {
        let mut w = Welt::neu();
        let ta = w.verbinden("a", "alice");
        let tb = w.verbinden("b", "bob");
        w.state.start_search(&peer("a"));
        w.state.start_search(&peer("b"));

        // b bleibt aktiv, a nicht
        let spaeter = w.start + Duration::from_secs(25);
        w.state.heartbeat(tb, spaeter);

        let zeitpunkt = w.start + SCHWELLE + Duration::from_secs(1);
        let ausgang = w.state.sweep(zeitpunkt, SCHWELLE);

        assert_eq!(unicasts_an(&ausgang, tb), vec![ServerEvent::PartnerDisconnected]);
        assert!(unicasts_an(&ausgang, ta).is_empty());
        let alle = broadcasts(&ausgang);
        assert_eq!(alle.len(), 1);
        let ServerEvent::PresenceList(liste) = &alle[0] else {
            panic!("Presence-Liste erwartet");
        };
        assert_eq!(liste.users.len(), 1);
        assert_eq!(liste.users[0].peer_id, peer("b"));

        let zweiter = w.state.sweep(zeitpunkt, SCHWELLE);
        assert!(zweiter.is_empty());
        assert!(w.state.ist_konsistent());
    }

    #[test]
    fn sweep_ohne_veraltete_sendet_nichts() {
        let mut w = Welt::neu();
        w.verbinden("a", "alice");
        assert!(w.state.sweep(w.start, SCHWELLE).is_empty());
        assert_eq!(w.state.online_anzahl(), 1);
    }

    #[test]
    fn relay_nachricht_an_ziel() {
        let mut w = Welt::neu();
        w.verbinden("a", "alice");
        let tb = w.verbinden("b", "bob");

        let ausgang = w.state.relay_message(SendMessageRequest {
            from: peer("a"),
            from_display_name: String::new(),
            to: peer("b"),
            text: "hallo".into(),
        });
        let an_b = unicasts_an(&ausgang, tb);
        let ServerEvent::NewMessage(nachricht) = &an_b[0] else {
            panic!("Nachricht erwartet");
        };
        assert_eq!(nachricht.text, "hallo");
        assert_eq!(nachricht.from_display_name, "alice");
        assert!(nachricht.timestamp_ms > 0);
    }

    #[test]
    fn relay_an_unbekanntes_ziel_ist_noop() {
        let mut w = Welt::neu();
        w.verbinden("a", "alice");
        let ausgang = w.state.relay_gift(SendGiftRequest {
            from: peer("a"),
            from_display_name: "Alice".into(),
            to: peer("niemand"),
            gift: "heart".into(),
        });
        assert!(ausgang.is_empty());
    }

    #[test]
    fn detail_zeigt_partner_und_leerlauf() {
        let mut w = Welt::neu();
        w.verbinden("a", "alice");
        w.verbinden("b", "bob");
        w.state.start_search(&peer("a"));
        w.state.start_search(&peer("b"));

        let detail = w
            .state
            .detail(&peer("a"), w.start + Duration::from_secs(5))
            .expect("Detail erwartet");
        assert_eq!(detail.paired_with, Some(peer("b")));
        assert_eq!(detail.idle_seconds, 5);
        assert!(w.state.detail(&peer("x"), w.start).is_none());
    }

    #[test]
    fn invarianten_ueber_gemischte_sequenz() {
        let mut w = Welt::neu();
        let ids = ["a", "b", "c", "d", "e"];
        let mut transporte = Vec::new();
        for id in ids {
            transporte.push(w.verbinden(id, id));
        }

        for schritt in 0..60 {
            let index = schritt % ids.len();
            let id = ids[index];
            let p = peer(id);
            match (schritt / ids.len() + index) % 5 {
                0 | 1 => {
                    w.state.start_search(&p);
                }
                2 => {
                    w.state.end_call(&p);
                }
                3 => {
                    w.state.stop_search(&p);
                }
                _ => {
                    w.state.disconnect(transporte[index]);
                    let neu = TransportId::new();
                    w.state.connect(neu, p, id.to_string(), w.start);
                    transporte[index] = neu;
                }
            }
            assert!(w.state.ist_konsistent(), "Inkonsistent nach Schritt {schritt}");
        }
    }
}
