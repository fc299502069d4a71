//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Sie erhaelt beim Start eine neue `TransportId`, registriert
//! ihre Send-Queue im Broadcaster und meldet den Transport beim Ende ueber
//! den Dispatcher ab.
//!
//! ## Ablauf
//! ```text
//! Frame lesen --decode--> Dispatcher --Ausgang--> Broadcaster --mpsc--> Frame schreiben
//! ```
//!
//! ## Verbindungsende
//! - Client schliesst den Socket
//! - Frame laesst sich nicht dekodieren (Error-Ereignis, dann Trennung)
//! - Kein eingehendes Frame innerhalb von `verbindungs_timeout_sek`
//! - Shutdown-Signal

use futures_util::{SinkExt, StreamExt};
use gleaphe_core::types::TransportId;
use gleaphe_protocol::{
    events::{ClientEvent, ErrorCode, ServerEvent},
    wire::FrameCodec,
};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::codec::Framed;

use crate::dispatcher::MessageDispatcher;
use crate::error::SignalingError;

/// Verarbeitet eine einzelne Transport-Verbindung
pub struct ClientConnection {
    dispatcher: MessageDispatcher,
    peer_addr: SocketAddr,
    transport_id: TransportId,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection mit frischer TransportId
    pub fn neu(dispatcher: MessageDispatcher, peer_addr: SocketAddr) -> Self {
        Self {
            dispatcher,
            peer_addr,
            transport_id: TransportId::new(),
        }
    }

    pub fn transport_id(&self) -> TransportId {
        self.transport_id
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Diese Methode laeuft bis die Verbindung getrennt wird oder ein
    /// Shutdown-Signal eingeht.
    pub async fn verarbeiten<S>(self, stream: S, mut shutdown_rx: watch::Receiver<bool>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let peer_addr = self.peer_addr;
        let transport_id = self.transport_id;
        let state = self.dispatcher.state();
        let timeout = state.config.verbindungs_timeout();

        tracing::info!(peer = %peer_addr, transport_id = %transport_id, "Neue Verbindung");

        let mut framed = Framed::new(stream, FrameCodec::<ClientEvent>::new());
        let mut ausgehend = state.broadcaster.transport_registrieren(transport_id);
        let mut letzter_empfang = Instant::now();

        loop {
            let frist = timeout.map(|t| letzter_empfang + t);

            tokio::select! {
                // Eingehendes Ereignis vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(event)) => {
                            letzter_empfang = Instant::now();
                            self.dispatcher.dispatch(transport_id, event);
                        }
                        Some(Err(e)) => {
                            let fehler = SignalingError::protokoll(e.to_string());
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %fehler,
                                "Ungueltiges Frame – Verbindung wird getrennt"
                            );
                            let antwort = ServerEvent::error(ErrorCode::InvalidRequest, fehler.to_string());
                            let _ = framed.send(antwort).await;
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehendes Ereignis aus dem Broadcaster
                Some(event) = ausgehend.recv() => {
                    if let Err(e) = framed.send(event).await {
                        tracing::warn!(
                            peer = %peer_addr,
                            fehler = %e,
                            "Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Kein Lebenszeichen
                _ = async {
                    match frist {
                        Some(f) => tokio::time::sleep_until(f).await,
                        None => std::future::pending().await,
                    }
                } => {
                    tracing::warn!(peer = %peer_addr, "Verbindungs-Timeout");
                    break;
                }

                // Shutdown-Signal
                res = shutdown_rx.changed() => {
                    if res.is_err() || *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = ServerEvent::error(
                            ErrorCode::InternalError,
                            "Server wird heruntergefahren",
                        );
                        let _ = framed.send(abschied).await;
                        break;
                    }
                }
            }
        }

        // Peer abmelden, Partner und uebrige Clients informieren
        self.dispatcher.transport_getrennt(transport_id);

        tracing::info!(peer = %peer_addr, transport_id = %transport_id, "Verbindungs-Task beendet");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};
    use gleaphe_core::types::PeerId;
    use gleaphe_observability::GleapheMetrics;
    use tokio::io::AsyncWriteExt;

    use crate::server_state::{SignalingConfig, SignalingState};

    fn dispatcher() -> MessageDispatcher {
        MessageDispatcher::neu(SignalingState::neu(
            SignalingConfig::default(),
            GleapheMetrics::neu().unwrap(),
        ))
    }

    fn adresse() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    #[tokio::test]
    async fn connect_und_heartbeat_ueber_frames() {
        let d = dispatcher();
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(ClientConnection::neu(d.clone(), adresse()).verarbeiten(server, shutdown_rx));

        let mut client = Framed::new(client, FrameCodec::<ServerEvent>::new());
        client
            .send(ClientEvent::Connect(gleaphe_protocol::events::ConnectRequest {
                peer_id: PeerId::parse("a").unwrap(),
                display_name: "alice".into(),
            }))
            .await
            .unwrap();

        let willkommen = client.next().await.unwrap().unwrap();
        assert!(matches!(willkommen, ServerEvent::Notification(_)));
        let liste = client.next().await.unwrap().unwrap();
        assert!(matches!(liste, ServerEvent::PresenceList(l) if l.users.len() == 1));

        client.send(ClientEvent::Heartbeat).await.unwrap();
        assert_eq!(client.next().await.unwrap().unwrap(), ServerEvent::HeartbeatAck);

        // Socket schliessen: Peer wird abgemeldet
        drop(client);
        task.await.unwrap();
        assert_eq!(d.status().online, 0);
    }

    #[tokio::test]
    async fn ungueltiges_frame_liefert_error_und_trennt() {
        let d = dispatcher();
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(ClientConnection::neu(d.clone(), adresse()).verarbeiten(server, shutdown_rx));

        let payload = br#"{"type":"teleport"}"#;
        let mut roh = BytesMut::new();
        roh.put_u32(payload.len() as u32);
        roh.put_slice(payload);
        client.write_all(&roh).await.unwrap();

        let mut client = Framed::new(client, FrameCodec::<ServerEvent>::new());
        let antwort = client.next().await.unwrap().unwrap();
        assert!(matches!(antwort, ServerEvent::Error(e) if e.code == ErrorCode::InvalidRequest));

        task.await.unwrap();
        assert!(client.next().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_beendet_verbindung() {
        let d = dispatcher();
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(ClientConnection::neu(d.clone(), adresse()).verarbeiten(server, shutdown_rx));
        shutdown_tx.send(true).unwrap();

        let mut client = Framed::new(client, FrameCodec::<ServerEvent>::new());
        let abschied = client.next().await.unwrap().unwrap();
        assert!(matches!(abschied, ServerEvent::Error(e) if e.code == ErrorCode::InternalError));
        task.await.unwrap();
        assert_eq!(d.state().broadcaster.transport_anzahl(), 0);
    }
}
