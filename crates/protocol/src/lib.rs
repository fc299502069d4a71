//! gleaphe-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Ereignistypen die zwischen Client und Server
//! ausgetauscht werden, die Status-Strukturen fuer Monitoring-Abfragen und
//! das Frame-Format der TCP-Verbindung.

pub mod events;
pub mod status;
pub mod wire;

pub use events::{ClientEvent, ErrorCode, ServerEvent};
pub use status::{PresenceDetail, PresenceEntry, StatusSnapshot};
pub use wire::FrameCodec;
