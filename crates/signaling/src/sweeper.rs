//! Liveness-Sweeper – Entfernt Peers ohne Lebenszeichen
//!
//! Laeuft als eigener tokio-Task im festen Intervall
//! (`SignalingConfig::sweep_intervall_sek`). Ein Peer gilt als inaktiv, wenn
//! sein letztes Lebenszeichen mindestens `inaktivitaet_sek` zurueckliegt.

use std::time::Instant;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::dispatcher::MessageDispatcher;

/// Startet den Sweeper-Task
///
/// Der Task endet, sobald `shutdown_rx` ein `true`-Signal empfaengt.
pub fn sweeper_starten(
    dispatcher: MessageDispatcher,
    shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(sweeper_loop(dispatcher, shutdown_rx))
}

async fn sweeper_loop(dispatcher: MessageDispatcher, mut shutdown_rx: watch::Receiver<bool>) {
    let intervall = dispatcher.state().config.sweep_intervall();
    let mut ticker = tokio::time::interval(intervall);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Der erste Tick feuert sofort
    ticker.tick().await;

    tracing::info!(
        intervall_sek = intervall.as_secs(),
        schwelle_sek = dispatcher.state().config.inaktivitaet_sek,
        "Sweeper gestartet"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let entfernt = dispatcher.sweep(Instant::now());
                if entfernt > 0 {
                    tracing::info!(entfernt, "Sweeper: inaktive Peers entfernt");
                }
            }

            res = shutdown_rx.changed() => {
                if res.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("Sweeper gestoppt");
}
