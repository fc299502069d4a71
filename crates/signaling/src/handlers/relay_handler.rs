//! Relay-Handler – Direktnachrichten und Geschenke zwischen zwei Peers
//!
//! Zustellung ist best-effort: ein unbekanntes Ziel wird still verworfen.
//! Nur tatsaechlich zugestellte Ereignisse werden gezaehlt.

use gleaphe_core::types::TransportId;
use gleaphe_protocol::events::{
    ErrorCode, SendGiftRequest, SendMessageRequest, ServerEvent, MAX_NACHRICHT_ZEICHEN,
};

use crate::presence::Ausgang;
use crate::server_state::SignalingState;

/// Leitet eine Textnachricht weiter
///
/// Zu lange Nachrichten werden mit einem Error-Ereignis an den Absender
/// abgelehnt.
pub fn handle_send_message(
    request: SendMessageRequest,
    transport_id: TransportId,
    state: &SignalingState,
) -> Vec<Ausgang> {
    let zeichen = request.text.chars().count();
    if zeichen > MAX_NACHRICHT_ZEICHEN {
        tracing::debug!(
            from = %request.from,
            zeichen,
            "Nachricht zu lang – abgelehnt"
        );
        return vec![Ausgang::Unicast {
            transport_id,
            event: ServerEvent::error(
                ErrorCode::InvalidRequest,
                format!("Nachricht zu lang (Maximum: {MAX_NACHRICHT_ZEICHEN} Zeichen)"),
            ),
        }];
    }

    let ausgang = state.presence.lock().relay_message(request);
    if !ausgang.is_empty() {
        state.nachricht_gezaehlt();
    }
    ausgang
}

/// Leitet ein Geschenk weiter
pub fn handle_send_gift(request: SendGiftRequest, state: &SignalingState) -> Vec<Ausgang> {
    let ausgang = state.presence.lock().relay_gift(request);
    if !ausgang.is_empty() {
        state.nachricht_gezaehlt();
    }
    ausgang
}
