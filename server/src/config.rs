//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist. Die Umgebungsvariable `PORT` ueberschreibt den HTTP-Port.

use anyhow::{bail, Result};
use gleaphe_observability::logging::{log_format_gueltig, log_level_gueltig};
use gleaphe_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};

/// Umgebungsvariable fuer den HTTP-Port
pub const ENV_PORT: &str = "PORT";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Presence- und Sweeper-Einstellungen
    pub presence: PresenceEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Transport-Verbindungen
    pub max_clients: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Gleaphe Chat Server".into(),
            max_clients: 1024,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer TCP und HTTP
    pub bind_adresse: String,
    /// Port fuer das Presence-Protokoll (TCP)
    pub tcp_port: u16,
    /// Port fuer Status-, Health- und Metrik-Endpunkte
    pub http_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 3001,
            http_port: 3000,
        }
    }
}

/// Presence- und Sweeper-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceEinstellungen {
    /// Abstand zwischen zwei Sweeper-Laeufen in Sekunden
    pub sweep_intervall_sek: u64,
    /// Inaktivitaet in Sekunden, ab der ein Peer entfernt wird
    pub inaktivitaet_sek: u64,
    /// Ausgehende Queue pro Transport
    pub send_queue_groesse: usize,
    /// Transport ohne eingehendes Frame wird nach dieser Zeit geschlossen (0 = nie)
    pub verbindungs_timeout_sek: u64,
}

impl Default for PresenceEinstellungen {
    fn default() -> Self {
        let standard = SignalingConfig::default();
        Self {
            sweep_intervall_sek: standard.sweep_intervall_sek,
            inaktivitaet_sek: standard.inaktivitaet_sek,
            send_queue_groesse: standard.send_queue_groesse,
            verbindungs_timeout_sek: standard.verbindungs_timeout_sek,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Stellt `/metrics` bereit
    pub metriken_aktiviert: bool,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            metriken_aktiviert: true,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Parst und validiert einen TOML-String
    pub fn aus_toml(inhalt: &str) -> Result<Self> {
        let config: Self = toml::from_str(inhalt)?;
        config.validieren()?;
        Ok(config)
    }

    /// Uebernimmt Ueberschreibungen aus der Umgebung
    pub fn umgebung_anwenden(&mut self) {
        self.port_ueberschreiben(std::env::var(ENV_PORT).ok().as_deref());
    }

    fn port_ueberschreiben(&mut self, wert: Option<&str>) {
        let Some(wert) = wert else {
            return;
        };
        match wert.trim().parse::<u16>() {
            Ok(port) => self.netzwerk.http_port = port,
            Err(_) => tracing::warn!(wert = wert, "Ungueltiger PORT-Wert wird ignoriert"),
        }
    }

    /// Prueft Werte die serde nicht abfangen kann
    pub fn validieren(&self) -> Result<()> {
        if self.server.max_clients == 0 {
            bail!("server.max_clients muss groesser als 0 sein");
        }
        if self.presence.sweep_intervall_sek == 0 {
            bail!("presence.sweep_intervall_sek muss groesser als 0 sein");
        }
        if self.presence.send_queue_groesse == 0 {
            bail!("presence.send_queue_groesse muss groesser als 0 sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            bail!("Unbekannter Log-Level: '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("Unbekanntes Log-Format: '{}'", self.logging.format);
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Gibt die vollstaendige Bind-Adresse fuer HTTP zurueck
    pub fn http_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.http_port)
    }

    /// Konfiguration fuer den Signaling-Service
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            server_name: self.server.name.clone(),
            max_clients: self.server.max_clients,
            sweep_intervall_sek: self.presence.sweep_intervall_sek,
            inaktivitaet_sek: self.presence.inaktivitaet_sek,
            send_queue_groesse: self.presence.send_queue_groesse,
            verbindungs_timeout_sek: self.presence.verbindungs_timeout_sek,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert!(cfg.validieren().is_ok());
        assert_eq!(cfg.netzwerk.http_port, 3000);
        assert_eq!(cfg.presence.sweep_intervall_sek, 10);
        assert_eq!(cfg.presence.inaktivitaet_sek, 30);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adressen() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.tcp_bind_adresse(), "0.0.0.0:3001");
        assert_eq!(cfg.http_bind_adresse(), "0.0.0.0:3000");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            name = "Mein Server"
            max_clients = 100

            [presence]
            inaktivitaet_sek = 60
        "#;
        let cfg = ServerConfig::aus_toml(toml).unwrap();
        assert_eq!(cfg.server.name, "Mein Server");
        assert_eq!(cfg.server.max_clients, 100);
        assert_eq!(cfg.presence.inaktivitaet_sek, 60);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.presence.sweep_intervall_sek, 10);
        assert_eq!(cfg.netzwerk.tcp_port, 3001);

        let signaling = cfg.signaling_config();
        assert_eq!(signaling.server_name, "Mein Server");
        assert_eq!(signaling.inaktivitaet_sek, 60);
    }

    #[test]
    fn ungueltige_werte_werden_abgelehnt() {
        assert!(ServerConfig::aus_toml("[presence]\nsweep_intervall_sek = 0").is_err());
        assert!(ServerConfig::aus_toml("[server]\nmax_clients = 0").is_err());
        assert!(ServerConfig::aus_toml("[logging]\nlevel = \"laut\"").is_err());
        assert!(ServerConfig::aus_toml("[netzwerk]\ntcp_port = \"x\"").is_err());
    }

    #[test]
    fn port_ueberschreibung() {
        let mut cfg = ServerConfig::default();
        cfg.port_ueberschreiben(Some("8080"));
        assert_eq!(cfg.netzwerk.http_port, 8080);

        cfg.port_ueberschreiben(Some("kein-port"));
        assert_eq!(cfg.netzwerk.http_port, 8080);

        cfg.port_ueberschreiben(None);
        assert_eq!(cfg.netzwerk.http_port, 8080);
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let cfg = ServerConfig::laden("/gibt/es/nicht/config.toml").unwrap();
        assert_eq!(cfg.server.name, "Gleaphe Chat Server");
    }
}
