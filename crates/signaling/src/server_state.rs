//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt den Presence-Zustand, den Broadcaster und die Metriken als
//! geteilte Referenzen, die sicher zwischen tokio-Tasks geteilt werden
//! koennen.

use gleaphe_observability::GleapheMetrics;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::broadcast::{EventBroadcaster, SEND_QUEUE_GROESSE};
use crate::presence::PresenceState;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitige Transport-Verbindungen
    pub max_clients: u32,
    /// Abstand zwischen zwei Sweeper-Laeufen in Sekunden
    pub sweep_intervall_sek: u64,
    /// Inaktivitaet in Sekunden, ab der ein Peer entfernt wird
    pub inaktivitaet_sek: u64,
    /// Groesse der ausgehenden Queue pro Transport
    pub send_queue_groesse: usize,
    /// Schliesst Transporte ohne eingehendes Frame nach dieser Zeit (0 = nie)
    pub verbindungs_timeout_sek: u64,
}

impl SignalingConfig {
    pub fn sweep_intervall(&self) -> Duration {
        Duration::from_secs(self.sweep_intervall_sek.max(1))
    }

    pub fn inaktivitaets_schwelle(&self) -> Duration {
        Duration::from_secs(self.inaktivitaet_sek)
    }

    pub fn verbindungs_timeout(&self) -> Option<Duration> {
        (self.verbindungs_timeout_sek > 0).then(|| Duration::from_secs(self.verbindungs_timeout_sek))
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Gleaphe Chat Server".to_string(),
            max_clients: 1024,
            sweep_intervall_sek: 10,
            inaktivitaet_sek: 30,
            send_queue_groesse: SEND_QUEUE_GROESSE,
            verbindungs_timeout_sek: 90,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
///
/// Der `PresenceState` liegt hinter genau einem Mutex. Der Lock wird nur
/// waehrend der Zustandsaenderung gehalten, nie ueber ein `.await` hinweg.
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Registry, Warteschlange und Pairing
    pub presence: Mutex<PresenceState>,
    /// Event-Broadcaster (Ereignisse an Transporte senden)
    pub broadcaster: EventBroadcaster,
    /// Prometheus-Metriken
    pub metriken: GleapheMetrics,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
    total_connections: AtomicU64,
    messages_relayed: AtomicU64,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, metriken: GleapheMetrics) -> Arc<Self> {
        let broadcaster = EventBroadcaster::mit_queue_groesse(config.send_queue_groesse);
        Arc::new(Self {
            config: Arc::new(config),
            presence: Mutex::new(PresenceState::neu()),
            broadcaster,
            metriken,
            start_time: Instant::now(),
            total_connections: AtomicU64::new(0),
            messages_relayed: AtomicU64::new(0),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Zaehlt eine angenommene Transport-Verbindung
    pub fn verbindung_gezaehlt(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.metriken.connections_total.inc();
    }

    /// Zaehlt eine zugestellte Nachricht oder ein Geschenk
    pub fn nachricht_gezaehlt(&self) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
        self.metriken.messages_relayed_total.inc();
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    pub fn messages_relayed(&self) -> u64 {
        self.messages_relayed.load(Ordering::Relaxed)
    }

    /// Uebertraegt die aktuellen Groessen des Presence-Zustands in die Gauges
    pub fn gauges_aktualisieren(&self, presence: &PresenceState) {
        self.metriken.presence_setzen(
            presence.online_anzahl(),
            presence.warteschlangen_laenge(),
            presence.aktive_paare(),
        );
    }
}
