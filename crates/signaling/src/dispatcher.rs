//! Message-Dispatcher – Routet Client-Ereignisse an die richtigen Handler
//!
//! Der Dispatcher empfaengt dekodierte `ClientEvent`s einer Verbindung,
//! ruft den passenden Handler auf und stellt dessen Ergebnis ueber den
//! `EventBroadcaster` zu. Die Zustellung passiert immer nach Freigabe des
//! Presence-Locks.

use gleaphe_core::types::{PeerId, TransportId};
use gleaphe_observability::StatusQuelle;
use gleaphe_protocol::events::ClientEvent;
use gleaphe_protocol::status::{PresenceDetail, StatusSnapshot};
use std::sync::Arc;
use std::time::Instant;

use crate::handlers::{match_handler, relay_handler, session_handler};
use crate::presence::Ausgang;
use crate::server_state::SignalingState;

/// Zentraler Message-Dispatcher
///
/// Clone teilt den Server-Zustand.
#[derive(Clone)]
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<SignalingState> {
        &self.state
    }

    /// Verarbeitet ein eingehendes Ereignis und stellt die Antworten zu
    pub fn dispatch(&self, transport_id: TransportId, event: ClientEvent) {
        tracing::trace!(transport_id = %transport_id, event = event.art(), "Ereignis empfangen");

        let ausgang = match event {
            // -------------------------------------------------------------------
            // Sitzung
            // -------------------------------------------------------------------
            ClientEvent::Connect(req) => {
                session_handler::handle_connect(req, transport_id, &self.state)
            }
            ClientEvent::Heartbeat => session_handler::handle_heartbeat(transport_id, &self.state),
            ClientEvent::GetUsers => session_handler::handle_get_users(transport_id, &self.state),

            // -------------------------------------------------------------------
            // Matchmaking
            // -------------------------------------------------------------------
            ClientEvent::StartSearch(req) => match_handler::handle_start_search(req, &self.state),
            ClientEvent::StopSearch(req) => match_handler::handle_stop_search(req, &self.state),
            ClientEvent::EndCall(req) => match_handler::handle_end_call(req, &self.state),

            // -------------------------------------------------------------------
            // Direkt-Relay
            // -------------------------------------------------------------------
            ClientEvent::SendMessage(req) => {
                relay_handler::handle_send_message(req, transport_id, &self.state)
            }
            ClientEvent::SendGift(req) => relay_handler::handle_send_gift(req, &self.state),
        };

        self.zustellen(ausgang);
    }

    /// Transport wurde geschlossen: Peer abmelden und Queue entfernen
    pub fn transport_getrennt(&self, transport_id: TransportId) {
        let ausgang = session_handler::handle_disconnect(transport_id, &self.state);
        self.state.broadcaster.transport_entfernen(&transport_id);
        self.zustellen(ausgang);
    }

    /// Ein Sweeper-Lauf: entfernt inaktive Peers
    ///
    /// Gibt die Anzahl der entfernten Peers zurueck.
    pub fn sweep(&self, jetzt: Instant) -> usize {
        let schwelle = self.state.config.inaktivitaets_schwelle();
        let (ausgang, entfernt) = {
            let mut presence = self.state.presence.lock();
            let vorher = presence.online_anzahl();
            let ausgang = presence.sweep(jetzt, schwelle);
            let entfernt = vorher - presence.online_anzahl();
            self.state.gauges_aktualisieren(&presence);
            (ausgang, entfernt)
        };

        if entfernt > 0 {
            self.state.metriken.stale_removed_total.inc_by(entfernt as u64);
        }
        self.zustellen(ausgang);
        entfernt
    }

    /// Momentaufnahme fuer Status-Abfragen
    pub fn status(&self) -> StatusSnapshot {
        let presence = self.state.presence.lock();
        StatusSnapshot {
            online: presence.online_anzahl(),
            queue_length: presence.warteschlangen_laenge(),
            active_pairs: presence.aktive_paare(),
            users: presence.presence_list(),
            total_connections: self.state.total_connections(),
            messages_relayed: self.state.messages_relayed(),
            uptime_seconds: self.state.uptime_sek(),
        }
    }

    fn zustellen(&self, ausgang: Vec<Ausgang>) {
        if !ausgang.is_empty() {
            self.state.broadcaster.zustellen(ausgang);
        }
    }
}

impl StatusQuelle for MessageDispatcher {
    fn server_name(&self) -> &str {
        &self.state.config.server_name
    }

    fn snapshot(&self) -> StatusSnapshot {
        self.status()
    }

    fn detail(&self, peer_id: &PeerId) -> Option<PresenceDetail> {
        self.state.presence.lock().detail(peer_id, Instant::now())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
