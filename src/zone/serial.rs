//! Zone serial maintenance.
use crate::error::Error;
use lazy_static::lazy_static;
use regex::bytes::Regex;
use time::Date;

lazy_static! {
    // A bare number followed by a `; serial` comment, the usual layout of a multi-line SOA.
    static ref SERIAL_LINE: Regex = Regex::new(r"(?i)^(\s*)(\d+)(\s*;\s*serial\s*)$").unwrap();
}

/// How the zone serial advances on each rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SerialPolicy {
    /// `YYYYMMDDnn`: jump to today's date with a two digit revision, or increment if the stored
    /// serial is already at or past today.
    #[default]
    DateBased,
    /// Plain increment.
    Sequential,
}

impl SerialPolicy {
    /// The serial to write in place of `current` on the given day.
    ///
    /// Wraps at `u32::MAX` like the SOA serial it models.
    #[must_use]
    pub fn next_on(self, current: u32, today: Date) -> u32 {
        match self {
            Self::Sequential => current.wrapping_add(1),
            Self::DateBased => {
                let date_serial = date_serial(today);
                if date_serial > current {
                    date_serial.wrapping_add(1)
                } else {
                    current.wrapping_add(1)
                }
            }
        }
    }
}

/// The serial line rewritten with the next serial under `policy`, or `None` if `line` isn't the
/// serial line.
///
/// # Errors
///
/// Returns [`Error::InvalidSerial`] if the number doesn't fit an unsigned 32 bit integer.
pub fn rewrite_serial_line(
    line: &[u8],
    policy: SerialPolicy,
    today: Date,
) -> Result<Option<Vec<u8>>, Error> {
    let Some(groups) = SERIAL_LINE.captures(line) else {
        return Ok(None);
    };
    // `\d` matches non-ASCII digits too, so the field isn't guaranteed to parse.
    let serial = String::from_utf8_lossy(&groups[2]);
    let current: u32 = serial.parse().map_err(|source| Error::InvalidSerial {
        serial: serial.to_string(),
        source,
    })?;
    let next = policy.next_on(current, today).to_string();

    let mut rewritten = groups[1].to_vec();
    rewritten.extend_from_slice(next.as_bytes());
    rewritten.extend_from_slice(&groups[3]);
    Ok(Some(rewritten))
}

/// `YYYYMMDD00` for the given date.
fn date_serial(date: Date) -> u32 {
    // Dates from the year 4295 on don't fit the field and pin it at the maximum.
    let year = u64::try_from(date.year()).unwrap_or(0);
    let stamp = year * 10_000 + u64::from(u8::from(date.month())) * 100 + u64::from(date.day());
    u32::try_from(stamp * 100).unwrap_or(u32::MAX)
}
