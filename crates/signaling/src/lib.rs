//! gleaphe-signaling – Presence, Matchmaking und Relay
//!
//! Dieser Crate implementiert den Presence-Dienst fuer Gleaphe. Er verwaltet
//! TCP-Verbindungen, fuehrt die Liste der angemeldeten Peers, paart
//! suchende Peers fuer WebRTC-Anrufe und leitet Direktnachrichten weiter.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |
//!     v
//! MessageDispatcher ---------------------------+
//!     |                                        |
//!     +-- SessionHandler (Connect, Heartbeat, Disconnect, GetUsers)
//!     +-- MatchHandler   (StartSearch, StopSearch, EndCall)
//!     +-- RelayHandler   (SendMessage, SendGift)
//!     |                                        |
//!     v                                        v
//! PresenceState (Mutex)                 EventBroadcaster
//!     +-- ConnectionRegistry            (Send-Queue pro Transport)
//!     +-- MatchQueue
//!     +-- CallPairs
//!
//! Sweeper – entfernt inaktive Peers im festen Intervall
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod pairing;
pub mod presence;
pub mod queue;
pub mod registry;
pub mod server_state;
pub mod sweeper;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use presence::{Ausgang, PresenceState};
pub use server_state::{SignalingConfig, SignalingState};
pub use sweeper::sweeper_starten;
pub use tcp::SignalingServer;
