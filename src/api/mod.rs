//! HTTP API for setting and disabling zone file records.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `{url_prefix}/present` (POST)
//!
//!   Expects a JSON request body of the form:
//!
//!   ```json
//!   { "fqdn": "_acme-challenge.example.com.", "value": "LHDhK3oGRvkiefQnx7OOczTY5Tic_xZ6HcMOc_gmtoM" }
//!   ```
//!
//!  An optional `rrtype` selects the record type, defaulting to `TXT`. Every line of the zone
//!  holding a `fqdn` (or hashed `fqdn`) record of that type is set to `value` and enabled.
//!
//!  Returns HTTP 200 (OK) with the body `OK` once the zone file is up to date.
//!
//! ## `{url_prefix}/cleanup` (POST)
//!
//!  Takes the same body as `/present`, but comments the matching record(s) out. Disabling a
//!  record that is already disabled succeeds without touching the zone file.
//!
//! ## `/robots.txt` (GET)
//!
//!  Served only when [`Config::robots_txt`][`crate::config::Config::robots_txt`] is set, to keep
//!  crawlers away from the API.
//!
//! # Errors
//!
//! Failures are returned as a JSON body `{"error": "..."}` with:
//!
//! * 400 for missing fields, invalid names or record types, and records absent from the zone,
//! * 401 if [Basic Auth][auth] is configured and the request lacks valid credentials,
//! * 409 if the zone file stayed locked by another update for the whole lock timeout,
//! * 500 for anything else (e.g. the zone file can't be read or replaced).

mod api_error;
pub mod auth;
mod model;
mod routes;
pub mod server;

pub use auth::CredentialStore;
pub use server::{new, router};
