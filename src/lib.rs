//! Zone Update
//!
//! A small HTTP service that lets ACME clients answer [RFC-8555][RFC-8555] [DNS-01] challenges
//! by editing the zone file of a conventional authoritative name server.
//!
//! Clients `POST` the challenge name and value to the [HTTP API][api]. The matching record line
//! of the configured zone file is rewritten under a cross-process lock, the zone serial is
//! bumped, and the new zone replaces the old one with a single atomic rename. Reloading the
//! name server is left to whatever watches the zone file.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod error;
pub mod zone;

pub use config::{Config, SharedConfig};
pub use zone::{UpdateOutcome, UpdateRequest, Updater, ZoneFileUpdater};
