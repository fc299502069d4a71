//! Gleaphe Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use gleaphe_observability::logging_initialisieren;
use gleaphe_server::{config::ServerConfig, Server};

/// Umgebungsvariable fuer den Pfad der Konfigurationsdatei
const ENV_CONFIG: &str = "GLEAPHE_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var(ENV_CONFIG).unwrap_or_else(|_| "config.toml".into());
    let datei_vorhanden = std::path::Path::new(&config_pfad).exists();

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let mut config = ServerConfig::laden(&config_pfad)?;
    config.umgebung_anwenden();

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        datei_vorhanden,
        "Gleaphe Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
