//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` nimmt auf einem gebundenen Listener Verbindungen an
//! und startet fuer jede einen eigenen tokio-Task mit einer
//! `ClientConnection`. Alle Tasks laufen auf der Multi-Thread-Runtime; der
//! geteilte Zustand ist `Send + Sync`.

use futures_util::SinkExt;
use gleaphe_protocol::{
    events::{ClientEvent, ErrorCode, ServerEvent},
    wire::FrameCodec,
};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::codec::Framed;

use crate::connection::ClientConnection;
use crate::dispatcher::MessageDispatcher;
use crate::error::SignalingResult;

/// TCP-Signaling-Server
///
/// Akzeptiert Verbindungen in einer Loop bis zum Shutdown-Signal.
pub struct SignalingServer {
    dispatcher: MessageDispatcher,
    listener: TcpListener,
}

impl SignalingServer {
    /// Bindet den TCP-Socket
    pub async fn binden(dispatcher: MessageDispatcher, bind_addr: SocketAddr) -> SignalingResult<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self::mit_listener(dispatcher, listener))
    }

    /// Verwendet einen bereits gebundenen Listener
    pub fn mit_listener(dispatcher: MessageDispatcher, listener: TcpListener) -> Self {
        Self {
            dispatcher,
            listener,
        }
    }

    /// Gibt die tatsaechlich gebundene Adresse zurueck
    pub fn lokale_adresse(&self) -> SignalingResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Startet die Accept-Loop
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> SignalingResult<()> {
        let lokale_addr = self.lokale_adresse()?;
        let max_clients = self.dispatcher.state().config.max_clients as usize;

        tracing::info!(
            adresse = %lokale_addr,
            max_clients,
            "TCP Signaling-Server gestartet"
        );

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let offen = self.dispatcher.state().broadcaster.transport_anzahl();
                            if offen >= max_clients {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    max = max_clients,
                                    "Server voll – Verbindung abgelehnt"
                                );
                                tokio::spawn(ablehnen(stream));
                                continue;
                            }

                            self.dispatcher.state().verbindung_gezaehlt();

                            let verbindung = ClientConnection::neu(
                                self.dispatcher.clone(),
                                peer_addr,
                            );
                            tracing::debug!(
                                peer = %peer_addr,
                                transport_id = %verbindung.transport_id(),
                                "Verbindung akzeptiert"
                            );

                            let shutdown_rx_clone = shutdown_rx.clone();
                            tokio::spawn(async move {
                                verbindung.verarbeiten(stream, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                res = shutdown_rx.changed() => {
                    if res.is_err() || *shutdown_rx.borrow() {
                        tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TCP Signaling-Server gestoppt");
        Ok(())
    }
}

/// Sendet `SERVER_FULL` und schliesst die Verbindung
async fn ablehnen(stream: TcpStream) {
    let mut framed = Framed::new(stream, FrameCodec::<ClientEvent>::new());
    let antwort = ServerEvent::error(ErrorCode::ServerFull, "Server ist voll");
    if let Err(e) = framed.send(antwort).await {
        tracing::debug!(fehler = %e, "Ablehnung konnte nicht gesendet werden");
    }
}
