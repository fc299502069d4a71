//! Fehlertypen fuer Gleaphe
//!
//! Zentraler Fehler-Enum fuer Zustaende, die crate-uebergreifend auftreten.
//! Der Signaling-Crate definiert zusaetzlich einen eigenen Fehlertyp.

use thiserror::Error;

/// Globaler Result-Alias fuer Gleaphe
pub type Result<T> = std::result::Result<T, GleapheError>;

/// Alle crate-uebergreifenden Fehler im Gleaphe-System
#[derive(Debug, Error)]
pub enum GleapheError {
    // --- Protokoll ---
    #[error("Ungueltige Kennung: {0}")]
    UngueltigeKennung(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = GleapheError::UngueltigeKennung("leer".into());
        assert_eq!(e.to_string(), "Ungueltige Kennung: leer");
    }
}
