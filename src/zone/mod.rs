//! Zone file record updates.
//!
//! Supports a generic interface for setting a single resource record in a zone file to a new
//! value, or disabling it by commenting it out, as needed to answer [RFC-8555][RFC-8555]
//! [DNS-01] challenges from a zone served by a conventional authoritative name server.
//!
//! The zone file is never edited in place. [`ZoneFileUpdater`] takes an advisory lock on a
//! `<zone>.lock` sidecar file, streams the zone into a `<zone>.tmp` [`AtomicFile`] while
//! rewriting the matching record line(s) and the `; serial` line, then renames the temp file
//! over the zone only if a record actually changed.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

use crate::error::Error;
use std::sync::Arc;
use tokio::time::Instant;

pub mod atomic_file;
pub mod lock;
pub mod matcher;
pub mod serial;
pub mod updater;

pub use atomic_file::AtomicFile;
pub use lock::LockGuard;
pub use matcher::RecordMatcher;
pub use serial::SerialPolicy;
#[allow(clippy::module_name_repetitions)]
pub use updater::ZoneFileUpdater;

/// Record type used when an update doesn't name one.
pub const DEFAULT_RRTYPE: &str = "TXT";

/// A request to set (or disable) one record in the zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Fully qualified owner name, including the trailing dot.
    pub fqdn: String,
    pub rrtype: String,
    pub value: String,
    /// Comment the record out with a leading `;` instead of enabling it.
    pub disable: bool,
}

impl UpdateRequest {
    #[must_use]
    pub fn new(fqdn: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            rrtype: DEFAULT_RRTYPE.to_string(),
            value: value.into(),
            disable: false,
        }
    }

    #[must_use]
    pub fn with_rrtype(mut self, rrtype: impl Into<String>) -> Self {
        self.rrtype = rrtype.into();
        self
    }

    #[must_use]
    pub const fn disabled(mut self, disable: bool) -> Self {
        self.disable = disable;
        self
    }
}

/// How an update pass left the zone file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A record changed and the rewritten zone replaced the original.
    Committed,
    /// The record was found but already had the requested content; the temp file was discarded.
    Aborted,
    /// Test mode: the rewritten zone was left in `<zone>.tmp` and the original is untouched.
    Closed,
}

/// `DynUpdater` is a type alias for an [`Updater`] shared between request handlers.
#[allow(clippy::module_name_repetitions)]
pub type DynUpdater = Arc<dyn Updater + Send + Sync>;

/// An async trait describing something that can apply an [`UpdateRequest`] to a zone.
#[async_trait::async_trait]
pub trait Updater {
    /// Apply the update, giving up on lock acquisition once `deadline` passes.
    async fn update(
        &self,
        request: UpdateRequest,
        deadline: Instant,
    ) -> Result<UpdateOutcome, Error>;
}
