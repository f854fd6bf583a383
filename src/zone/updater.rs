//! A zone file-backed implementation of the [`Updater`][super::Updater] trait.
use crate::config::Config;
use crate::error::Error;
use crate::zone::atomic_file::{with_suffix, AtomicFile};
use crate::zone::lock::{self, LockGuard, LOCK_SUFFIX};
use crate::zone::matcher::RecordMatcher;
use crate::zone::serial::{rewrite_serial_line, SerialPolicy};
use crate::zone::{UpdateOutcome, UpdateRequest, Updater};
use std::fs::File;
use std::future::Future;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use time::{Date, OffsetDateTime};
use tokio::time::Instant;

/// Applies updates to a zone file on disk.
///
/// Each update holds the `<zone>.lock` sidecar lock for its whole pass, so updaters in other
/// processes pointed at the same zone take turns.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct ZoneFileUpdater {
    zone_file: PathBuf,
    lock_file: PathBuf,
    lock_attempts: u32,
    serial_policy: SerialPolicy,
    test_mode: bool,
}

/// What a scan of the zone saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scan {
    /// At least one line matched the record.
    pub found: bool,
    /// At least one matching line was rewritten to different text.
    pub changed: bool,
}

impl ZoneFileUpdater {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_zone(&config.zone_file)
            .lock_attempts(u32::try_from(config.lock_timeout.as_secs()).unwrap_or(u32::MAX))
            .serial_policy(config.serial_policy())
            .test_mode(config.test_mode)
    }

    /// An updater for `zone_file` with a 30 attempt lock wait and date-based serials.
    #[must_use]
    pub fn with_zone(zone_file: impl AsRef<Path>) -> Self {
        let zone_file = zone_file.as_ref().to_path_buf();
        Self {
            lock_file: with_suffix(&zone_file, LOCK_SUFFIX),
            zone_file,
            lock_attempts: 30,
            serial_policy: SerialPolicy::default(),
            test_mode: false,
        }
    }

    /// Overrides how many times (one second apart) the lock is tried.
    #[must_use]
    pub const fn lock_attempts(mut self, attempts: u32) -> Self {
        self.lock_attempts = attempts;
        self
    }

    #[must_use]
    pub const fn serial_policy(mut self, policy: SerialPolicy) -> Self {
        self.serial_policy = policy;
        self
    }

    /// In test mode the rewritten zone is left in `<zone>.tmp` and never committed.
    #[must_use]
    pub const fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    #[must_use]
    pub fn zone_file(&self) -> &Path {
        &self.zone_file
    }

    #[must_use]
    pub fn lock_file(&self) -> &Path {
        &self.lock_file
    }

    /// Apply `request`, abandoning the lock wait if `cancelled` resolves first.
    ///
    /// Once the lock is held the rewrite runs to completion on the blocking pool, even if the
    /// returned future is dropped.
    ///
    /// # Errors
    ///
    /// Returns a lock error ([`Error::LockTimeout`], [`Error::LockCancelled`] or
    /// [`Error::LockFile`]) if the lock isn't obtained, [`Error::RecordNotFound`] if nothing in
    /// the zone matches, and otherwise the I/O or parse error that ended the pass. The zone file
    /// is unchanged whenever an error is returned.
    pub async fn update_until<C>(
        &self,
        request: UpdateRequest,
        cancelled: C,
    ) -> Result<UpdateOutcome, Error>
    where
        C: Future<Output = ()>,
    {
        let lock = lock::acquire(&self.lock_file, self.lock_attempts, cancelled).await?;
        let updater = self.clone();
        tokio::task::spawn_blocking(move || {
            updater.rewrite_locked(&request, lock, OffsetDateTime::now_utc().date())
        })
        .await?
    }

    /// Run one rewrite pass while holding `lock`, which is released on return.
    ///
    /// # Errors
    ///
    /// See [`update_until`](Self::update_until).
    pub fn rewrite_locked(
        &self,
        request: &UpdateRequest,
        lock: LockGuard,
        today: Date,
    ) -> Result<UpdateOutcome, Error> {
        let outcome = self.rewrite(request, today);
        drop(lock);
        outcome
    }

    fn rewrite(&self, request: &UpdateRequest, today: Date) -> Result<UpdateOutcome, Error> {
        let matcher = RecordMatcher::new(request)?;
        let path = self.zone_file.display();
        let zone = File::open(&self.zone_file).map_err(|err| {
            tracing::error!(%path, error = %err, "unable to open zone file");
            Error::OpenZoneFile(err)
        })?;
        let mut new_zone = AtomicFile::open(&self.zone_file).map_err(|err| {
            tracing::error!(%path, error = %err, "unable to open temp file");
            Error::OpenTempFile(err)
        })?;

        let scan = match copy_and_update(
            BufReader::new(zone),
            &mut new_zone,
            &matcher,
            self.serial_policy,
            today,
        ) {
            Ok(scan) => scan,
            Err(err) => {
                discard(new_zone);
                return Err(err);
            }
        };

        if !scan.found {
            discard(new_zone);
            let err = Error::RecordNotFound {
                fqdn: request.fqdn.clone(),
                hash: matcher.hash().to_string(),
                rrtype: request.rrtype.clone(),
            };
            tracing::warn!("{err}");
            return Err(err);
        }

        if self.test_mode {
            new_zone.close()?;
            tracing::info!(
                fqdn = %request.fqdn,
                path = %new_zone.temp_path().display(),
                "test mode, left rewritten zone in temp file"
            );
            Ok(UpdateOutcome::Closed)
        } else if scan.changed {
            new_zone.commit()?;
            tracing::info!(
                fqdn = %request.fqdn,
                rrtype = %request.rrtype,
                disable = request.disable,
                "updated zone file"
            );
            Ok(UpdateOutcome::Committed)
        } else {
            discard(new_zone);
            tracing::debug!(fqdn = %request.fqdn, "record already up to date");
            Ok(UpdateOutcome::Aborted)
        }
    }
}

#[async_trait::async_trait]
impl Updater for ZoneFileUpdater {
    async fn update(
        &self,
        request: UpdateRequest,
        deadline: Instant,
    ) -> Result<UpdateOutcome, Error> {
        self.update_until(request, tokio::time::sleep_until(deadline)).await
    }
}

fn discard(mut new_zone: AtomicFile) {
    if let Err(err) = new_zone.abort() {
        tracing::warn!(
            path = %new_zone.temp_path().display(),
            error = %err,
            "failed to remove temp file"
        );
    }
}

/// Copy `current` to `new` line by line, rewriting the serial line and every line matching
/// `matcher`.
///
/// Lines are handled as raw bytes, so text that isn't UTF-8 is copied through unchanged.
/// Every output line ends with a single `\n`, whatever the input used.
///
/// # Errors
///
/// Returns [`Error::IO`] on read or write failure, or [`Error::InvalidSerial`] if the serial
/// line can't be parsed.
pub fn copy_and_update<R, W>(
    mut current: R,
    new: &mut W,
    matcher: &RecordMatcher,
    policy: SerialPolicy,
    today: Date,
) -> Result<Scan, Error>
where
    R: BufRead,
    W: Write,
{
    let mut scan = Scan::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if current.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = trim_line_ending(&buf);
        if let Some(serial_line) = rewrite_serial_line(line, policy, today)? {
            new.write_all(&serial_line)?;
        } else if let Some(record_line) = matcher.rewrite(line) {
            scan.found = true;
            scan.changed |= record_line != line;
            new.write_all(&record_line)?;
        } else {
            new.write_all(line)?;
        }
        new.write_all(b"\n")?;
    }
    Ok(scan)
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const ZONE: &str = "\
$TTL 3600
@ IN SOA ns1.example.com. hostmaster.example.com. (
        2024010100 ; serial
        3600 ; refresh
)
@ IN NS ns1.example.com.
_acme-challenge.example.com.  IN TXT \"old\"
";

    fn scan(zone: &str, request: &UpdateRequest, policy: SerialPolicy) -> (String, Scan) {
        let matcher = RecordMatcher::new(request).unwrap();
        let mut out = Vec::new();
        let today = date!(2024 - 01 - 02);
        let scan = copy_and_update(zone.as_bytes(), &mut out, &matcher, policy, today).unwrap();
        (String::from_utf8(out).unwrap(), scan)
    }

    #[test]
    fn challenge_value_and_date_serial() {
        let request = UpdateRequest::new("_acme-challenge.example.com.", "NEWVAL");
        let (out, scan) = scan(ZONE, &request, SerialPolicy::DateBased);

        assert_eq!(scan, Scan { found: true, changed: true });
        assert!(out.contains("        2024010201 ; serial\n"));
        assert!(out.contains("_acme-challenge.example.com.  IN TXT NEWVAL\n"));
        assert!(out.contains("@ IN NS ns1.example.com.\n"));
        assert_eq!(out.lines().count(), ZONE.lines().count());
    }

    #[test]
    fn unchanged_record_is_found_but_not_changed() {
        let zone = ZONE.replace("\"old\"", "same");
        let request = UpdateRequest::new("_acme-challenge.example.com.", "same");
        let (out, scan) = scan(&zone, &request, SerialPolicy::Sequential);

        assert_eq!(scan, Scan { found: true, changed: false });
        // The serial line is rewritten in the copy regardless.
        assert!(out.contains("2024010101 ; serial"));
    }

    #[test]
    fn missing_record_is_not_found() {
        let request = UpdateRequest::new("_acme-challenge.other.example.", "v");
        let (_, scan) = scan(ZONE, &request, SerialPolicy::Sequential);
        assert_eq!(scan, Scan::default());
    }

    #[test]
    fn rewrites_every_matching_line() {
        let zone = "a.example. IN TXT one\n;a.example. IN TXT two\n";
        let request = UpdateRequest::new("a.example.", "v").disabled(true);
        let (out, scan) = scan(zone, &request, SerialPolicy::Sequential);

        assert_eq!(out, ";a.example. IN TXT v\n;a.example. IN TXT v\n");
        assert!(scan.changed);
    }

    #[test]
    fn normalises_line_endings() {
        let zone = "a.example. IN TXT one\r\nb.example. IN A 192.0.2.1";
        let request = UpdateRequest::new("a.example.", "two");
        let (out, _) = scan(zone, &request, SerialPolicy::Sequential);

        assert_eq!(out, "a.example. IN TXT two\nb.example. IN A 192.0.2.1\n");
    }

    #[test]
    fn copies_non_utf8_lines_verbatim() {
        let zone = b"; caf\xe9 comment\r\na.example. IN TXT \"\xff\"\nb.example. IN TXT keep\n";
        let matcher = RecordMatcher::new(&UpdateRequest::new("a.example.", "new")).unwrap();
        let mut out = Vec::new();
        let scan = copy_and_update(
            &zone[..],
            &mut out,
            &matcher,
            SerialPolicy::Sequential,
            date!(2024 - 01 - 02),
        )
        .unwrap();

        assert_eq!(scan, Scan { found: true, changed: true });
        assert_eq!(
            out,
            b"; caf\xe9 comment\na.example. IN TXT new\nb.example. IN TXT keep\n".to_vec()
        );
    }

    #[test]
    fn bad_serial_stops_the_scan() {
        let matcher = RecordMatcher::new(&UpdateRequest::new("a.example.", "v")).unwrap();
        let mut out = Vec::new();
        let result = copy_and_update(
            "4294967296 ; serial\na.example. IN TXT old\n".as_bytes(),
            &mut out,
            &matcher,
            SerialPolicy::Sequential,
            date!(2024 - 01 - 02),
        );

        assert!(matches!(result, Err(Error::InvalidSerial { .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn derives_lock_file_from_zone() {
        let updater = ZoneFileUpdater::with_zone("/var/named/db.example");
        assert_eq!(updater.lock_file(), Path::new("/var/named/db.example.lock"));
        assert_eq!(updater.zone_file(), Path::new("/var/named/db.example"));
    }
}
