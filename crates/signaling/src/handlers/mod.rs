//! Handler fuer alle Client-Ereignisse
//!
//! Jeder Handler sperrt den Presence-Zustand nur fuer die Dauer der
//! Aenderung und gibt die auszuliefernden Ereignisse zurueck. Zugestellt
//! wird erst im Dispatcher, nachdem der Lock wieder frei ist.

pub mod match_handler;
pub mod relay_handler;
pub mod session_handler;
