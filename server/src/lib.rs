//! gleaphe-server – Bibliotheks-Root
//!
//! Verdrahtet Signaling, Sweeper und HTTP-Endpunkte und stellt den
//! oeffentlichen Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use gleaphe_observability::{http_router, http_server_starten, GleapheMetrics, HealthState};
use gleaphe_signaling::{sweeper_starten, MessageDispatcher, SignalingServer, SignalingState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

/// Gestarteter Server mit allen Hintergrund-Tasks
pub struct LaufenderServer {
    tcp_adresse: SocketAddr,
    http_adresse: SocketAddr,
    dispatcher: MessageDispatcher,
    health: HealthState,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<Result<()>>)>,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    pub async fn starten(self) -> Result<()> {
        let laufend = self.hochfahren().await?;
        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C / SIGTERM)...");
        shutdown_signal().await;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
        laufend.herunterfahren().await
    }

    /// Bindet alle Listener und startet die Hintergrund-Tasks
    ///
    /// Reihenfolge:
    /// 1. Metriken und Presence-Zustand anlegen
    /// 2. TCP-Listener binden (Presence-Protokoll)
    /// 3. HTTP-Listener binden (Status, Health, Metriken)
    /// 4. Sweeper, TCP- und HTTP-Server starten
    /// 5. Health auf bereit setzen
    pub async fn hochfahren(self) -> Result<LaufenderServer> {
        let config = self.config;
        tracing::info!(
            server_name = %config.server.name,
            tcp = %config.tcp_bind_adresse(),
            http = %config.http_bind_adresse(),
            "Server startet"
        );

        let metriken = GleapheMetrics::neu().context("Metriken konnten nicht angelegt werden")?;
        let state = SignalingState::neu(config.signaling_config(), metriken.clone());
        let dispatcher = MessageDispatcher::neu(state);
        let health = HealthState::neu();

        let tcp_listener = TcpListener::bind(config.tcp_bind_adresse())
            .await
            .with_context(|| format!("TCP-Bind auf {} fehlgeschlagen", config.tcp_bind_adresse()))?;
        let http_listener = TcpListener::bind(config.http_bind_adresse())
            .await
            .with_context(|| {
                format!("HTTP-Bind auf {} fehlgeschlagen", config.http_bind_adresse())
            })?;
        let tcp_adresse = tcp_listener.local_addr()?;
        let http_adresse = http_listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks: Vec<(&'static str, JoinHandle<Result<()>>)> = Vec::new();

        // --- Sweeper ---
        let sweeper = sweeper_starten(dispatcher.clone(), shutdown_rx.clone());
        tasks.push((
            "sweeper",
            tokio::spawn(async move {
                sweeper.await?;
                Ok(())
            }),
        ));

        // --- TCP Presence-Protokoll ---
        let signaling = SignalingServer::mit_listener(dispatcher.clone(), tcp_listener);
        let signaling_rx = shutdown_rx.clone();
        tasks.push((
            "signaling",
            tokio::spawn(async move {
                signaling.starten(signaling_rx).await?;
                Ok(())
            }),
        ));

        // --- HTTP ---
        let app = http_router(
            Arc::new(dispatcher.clone()),
            metriken,
            health.clone(),
            config.observability.metriken_aktiviert,
        );
        tasks.push((
            "http",
            tokio::spawn(http_server_starten(http_listener, app, shutdown_rx)),
        ));

        health.bereit_setzen(true);
        tracing::info!(
            tcp = %tcp_adresse,
            http = %http_adresse,
            max_clients = config.server.max_clients,
            "Server bereit"
        );

        Ok(LaufenderServer {
            tcp_adresse,
            http_adresse,
            dispatcher,
            health,
            shutdown_tx,
            tasks,
        })
    }
}

impl LaufenderServer {
    /// Tatsaechlich gebundene TCP-Adresse
    pub fn tcp_adresse(&self) -> SocketAddr {
        self.tcp_adresse
    }

    /// Tatsaechlich gebundene HTTP-Adresse
    pub fn http_adresse(&self) -> SocketAddr {
        self.http_adresse
    }

    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    /// Signalisiert allen Tasks den Shutdown und wartet auf ihr Ende
    pub async fn herunterfahren(self) -> Result<()> {
        self.health.bereit_setzen(false);
        // Fehler bedeutet: alle Empfaenger sind bereits beendet
        let _ = self.shutdown_tx.send(true);

        let mut erster_fehler = None;
        for (name, task) in self.tasks {
            let ergebnis = match task.await {
                Ok(ergebnis) => ergebnis,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = ergebnis {
                tracing::error!(task = name, fehler = %e, "Task mit Fehler beendet");
                erster_fehler.get_or_insert(e);
            }
        }

        tracing::info!("Server beendet");
        match erster_fehler {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Wartet auf Ctrl-C oder (unter Unix) SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(fehler = %e, "SIGTERM-Handler konnte nicht installiert werden");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
