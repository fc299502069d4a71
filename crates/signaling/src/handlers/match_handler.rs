//! Match-Handler – Partnersuche und Anrufende

use gleaphe_protocol::events::{EndCallRequest, SearchRequest, ServerEvent};

use crate::presence::Ausgang;
use crate::server_state::SignalingState;

/// Startet die Partnersuche
pub fn handle_start_search(request: SearchRequest, state: &SignalingState) -> Vec<Ausgang> {
    let ausgang = {
        let mut presence = state.presence.lock();
        let ausgang = presence.start_search(&request.peer_id);
        state.gauges_aktualisieren(&presence);
        ausgang
    };

    // Ein Match erzeugt genau zwei partner_found-Ereignisse
    let gefunden = ausgang
        .iter()
        .filter(|a| matches!(a.event(), ServerEvent::PartnerFound(_)))
        .count();
    if gefunden > 0 {
        state.metriken.matches_total.inc_by((gefunden / 2) as u64);
    }
    ausgang
}

/// Bricht die Partnersuche ab
pub fn handle_stop_search(request: SearchRequest, state: &SignalingState) -> Vec<Ausgang> {
    let mut presence = state.presence.lock();
    let ausgang = presence.stop_search(&request.peer_id);
    state.gauges_aktualisieren(&presence);
    ausgang
}

/// Beendet den laufenden Anruf
pub fn handle_end_call(request: EndCallRequest, state: &SignalingState) -> Vec<Ausgang> {
    let mut presence = state.presence.lock();
    let ausgang = presence.end_call(&request.peer_id);
    state.gauges_aktualisieren(&presence);
    ausgang
}
