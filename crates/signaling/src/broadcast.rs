//! Event-Broadcaster – Sendet Ereignisse an einzelne oder alle Transporte
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller offenen
//! Transport-Verbindungen, auch solcher die sich noch nicht per `connect`
//! angemeldet haben. Zugestellt wird immer nicht-blockierend (`try_send`):
//! eine volle oder geschlossene Queue verwirft das Ereignis.
//!
//! ## Selektives Broadcasting
//! - An einen Transport: `an_transport_senden`
//! - An alle Transporte: `an_alle_senden`
//! - Handler-Ergebnis: `zustellen`

use dashmap::DashMap;
use gleaphe_core::types::TransportId;
use gleaphe_protocol::events::ServerEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{SignalingError, SignalingResult};
use crate::presence::Ausgang;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standardgroesse der Send-Queue pro Transport
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines Transports
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub transport_id: TransportId,
    pub tx: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    /// Reiht ein Ereignis nicht-blockierend ein
    pub fn senden(&self, event: ServerEvent) -> SignalingResult<()> {
        self.tx.try_send(event).map_err(|e| SignalingError::SendFehler {
            transport_id: self.transport_id,
            grund: match e {
                mpsc::error::TrySendError::Full(_) => "Send-Queue voll",
                mpsc::error::TrySendError::Closed(_) => "Send-Queue geschlossen",
            },
        })
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Broadcaster fuer alle offenen Transporte
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Sender, indiziert nach TransportId
    clients: DashMap<TransportId, ClientSender>,
    queue_groesse: usize,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self::mit_queue_groesse(SEND_QUEUE_GROESSE)
    }

    /// Erstellt einen EventBroadcaster mit eigener Queue-Groesse pro Transport
    pub fn mit_queue_groesse(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                clients: DashMap::new(),
                queue_groesse: queue_groesse.max(1),
            }),
        }
    }

    /// Registriert einen Transport und gibt seine Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und schreibt auf den Socket.
    pub fn transport_registrieren(&self, transport_id: TransportId) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        self.inner
            .clients
            .insert(transport_id, ClientSender { transport_id, tx });
        tracing::debug!(transport_id = %transport_id, "Transport im Broadcaster registriert");
        rx
    }

    /// Entfernt einen Transport aus dem Broadcaster
    pub fn transport_entfernen(&self, transport_id: &TransportId) {
        if self.inner.clients.remove(transport_id).is_some() {
            tracing::debug!(transport_id = %transport_id, "Transport aus Broadcaster entfernt");
        }
    }

    /// Sendet ein Ereignis an einen einzelnen Transport
    pub fn an_transport_senden(
        &self,
        transport_id: &TransportId,
        event: ServerEvent,
    ) -> SignalingResult<()> {
        // Sender klonen damit kein DashMap-Guard waehrend des Sendens gehalten wird
        let sender = self
            .inner
            .clients
            .get(transport_id)
            .map(|s| s.clone())
            .ok_or(SignalingError::SendFehler {
                transport_id: *transport_id,
                grund: "Transport nicht registriert",
            })?;
        sender.senden(event)
    }

    /// Sendet ein Ereignis an alle offenen Transporte
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_alle_senden(&self, event: ServerEvent) -> usize {
        let sender: Vec<ClientSender> = self
            .inner
            .clients
            .iter()
            .map(|e| e.value().clone())
            .collect();

        let mut gesendet = 0;
        for s in sender {
            match s.senden(event.clone()) {
                Ok(()) => gesendet += 1,
                Err(e) => tracing::debug!(fehler = %e, event = event.art(), "Broadcast verworfen"),
            }
        }
        gesendet
    }

    /// Stellt das Ergebnis eines Handlers zu
    ///
    /// Fehlgeschlagene Zustellungen werden protokolliert und nicht wiederholt.
    pub fn zustellen(&self, ausgang: Vec<Ausgang>) {
        for a in ausgang {
            match a {
                Ausgang::Unicast {
                    transport_id,
                    event,
                } => {
                    let art = event.art();
                    if let Err(e) = self.an_transport_senden(&transport_id, event) {
                        tracing::warn!(fehler = %e, event = art, "Zustellung fehlgeschlagen");
                    }
                }
                Ausgang::Broadcast(event) => {
                    let gesendet = self.an_alle_senden(event);
                    tracing::trace!(gesendet, "Broadcast zugestellt");
                }
            }
        }
    }

    /// Gibt die Anzahl der registrierten Transporte zurueck
    pub fn transport_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Prueft ob ein Transport registriert ist
    pub fn ist_registriert(&self, transport_id: &TransportId) -> bool {
        self.inner.clients.contains_key(transport_id)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
