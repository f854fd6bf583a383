//! Error types.

use axum::extract::rejection::JsonRejection;
use std::num::ParseIntError;
use trust_dns_proto::error::ProtoError;

/// Error enumerates the possible zone-update error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when the zone lock file is held by another updater for every one of the
    /// configured [`Config::lock_timeout`][`crate::config::Config::lock_timeout`] attempts.
    ///
    /// Carries the error from the last failed attempt.
    #[error("failed to lock zone file after {attempts} attempts: {source}")]
    LockTimeout {
        attempts: u32,
        source: std::io::Error,
    },

    /// Returned when the caller's deadline passed while waiting for the zone lock.
    #[error("gave up waiting for the zone file lock")]
    LockCancelled,

    /// Returned when the `<zone>.lock` sidecar file can't be opened or created.
    #[error("unable to open lock file: {0}")]
    LockFile(std::io::Error),

    #[error("unable to open zone file: {0}")]
    OpenZoneFile(std::io::Error),

    #[error("unable to open temp file: {0}")]
    OpenTempFile(std::io::Error),

    /// Returned when the numeric field of the `; serial` line doesn't fit an unsigned 32 bit
    /// integer. The update is abandoned and the zone file is left untouched.
    #[error("invalid zone serial \"{serial}\": {source}")]
    InvalidSerial {
        serial: String,
        source: ParseIntError,
    },

    /// Returned when a zone scan completes without finding a line for the requested name (or
    /// its hash) and record type.
    #[error("did not find record for {fqdn} or {hash} with RRTYPE {rrtype}")]
    RecordNotFound {
        fqdn: String,
        hash: String,
        rrtype: String,
    },

    #[error("unable to build record pattern")]
    InvalidRecordPattern(#[from] regex::Error),

    /// Returned when clients `POST` an update without one of the required JSON fields.
    #[error("{0} not provided")]
    MissingField(&'static str),

    /// Returned when the `fqdn` of an update isn't a valid DNS name.
    #[error("invalid name: {0}")]
    InvalidName(#[from] ProtoError),

    #[error("unknown RRTYPE \"{0}\"")]
    UnknownRecordType(String),

    /// Returned when an update names a domain without the trailing dot.
    #[error("not a fully qualified name: \"{0}\"")]
    NotFQDN(String),

    /// Returned when an update route is called without valid Basic Auth credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Returned when clients `POST` invalid JSON.
    #[error(transparent)]
    JsonExtractorRejection(#[from] JsonRejection),

    /// Returned when processing JSON from disk (e.g. when
    /// [trying to load a `Config`][crate::config::Config::try_from_file]) fails due to invalid
    /// JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Returned when a line of the password file isn't a `user password` pair.
    #[error("entry needs two fields at line {line}: '{entry}'")]
    CredentialsFile { line: usize, entry: String },

    /// Returned when the blocking rewrite task panics or is cancelled by runtime shutdown.
    #[error("zone rewrite task failed")]
    Join(#[from] tokio::task::JoinError),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred: {0}")]
    IO(#[from] std::io::Error),
}
