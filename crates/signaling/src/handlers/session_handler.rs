//! Session-Handler – Anmeldung, Heartbeat, Abmeldung, Presence-Abfrage

use gleaphe_core::types::TransportId;
use gleaphe_protocol::events::ConnectRequest;
use std::time::Instant;

use crate::presence::Ausgang;
use crate::server_state::SignalingState;

/// Meldet den Peer auf diesem Transport an
pub fn handle_connect(
    request: ConnectRequest,
    transport_id: TransportId,
    state: &SignalingState,
) -> Vec<Ausgang> {
    let anzeigename = request.anzeigename();
    let mut presence = state.presence.lock();
    let ausgang = presence.connect(transport_id, request.peer_id, anzeigename, Instant::now());
    state.gauges_aktualisieren(&presence);
    ausgang
}

/// Lebenszeichen eines Transports
pub fn handle_heartbeat(transport_id: TransportId, state: &SignalingState) -> Vec<Ausgang> {
    state.presence.lock().heartbeat(transport_id, Instant::now())
}

/// Presence-Liste nur an den Anfragenden
pub fn handle_get_users(transport_id: TransportId, state: &SignalingState) -> Vec<Ausgang> {
    state.presence.lock().presence_fuer(transport_id)
}

/// Transport wurde geschlossen
pub fn handle_disconnect(transport_id: TransportId, state: &SignalingState) -> Vec<Ausgang> {
    let mut presence = state.presence.lock();
    let ausgang = presence.disconnect(transport_id);
    state.gauges_aktualisieren(&presence);
    ausgang
}
