//! Recognising the zone line(s) that hold a given record.
//!
//! A record line is matched when it starts with, in order: an optional `;` (the record is
//! disabled), the owner name, an optional TTL, an optional `IN` class and the record type. The
//! owner may be the literal FQDN or the [`name_hash`] of it, which some zone layouts use as the
//! target label of delegated `_acme-challenge` CNAMEs.
use crate::error::Error;
use crate::zone::UpdateRequest;
use data_encoding::BASE32;
use regex::bytes::{Captures, Regex};
use ring::digest::{digest, SHA1_FOR_LEGACY_USE_ONLY};
use std::borrow::Cow;

/// Matches and rewrites the lines for one [`UpdateRequest`].
#[derive(Debug, Clone)]
pub struct RecordMatcher {
    pattern: Regex,
    hash: String,
    value: String,
    disable: bool,
}

impl RecordMatcher {
    /// Compile the matcher for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecordPattern`] if the pattern can't be compiled, which can only
    /// happen for pathologically long names.
    pub fn new(request: &UpdateRequest) -> Result<Self, Error> {
        let hash = name_hash(&request.fqdn);
        let pattern = Regex::new(&format!(
            r"(?i)^(\s*;)?(\s*)({}|{})(\s*\d+)?(\s*IN)?(\s*{})\b(\s*)",
            regex::escape(&request.fqdn),
            hash,
            regex::escape(&request.rrtype),
        ))?;
        Ok(Self {
            pattern,
            hash,
            value: quote_value(&request.value).into_owned(),
            disable: request.disable,
        })
    }

    /// The hashed owner name also accepted in place of the FQDN.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The record line rewritten with the new value, or `None` if `line` isn't this record.
    ///
    /// Everything after the record type (the old value and any trailing comment) is replaced.
    /// Lines are raw bytes so zones with non UTF-8 comments pass through intact.
    #[must_use]
    pub fn rewrite(&self, line: &[u8]) -> Option<Vec<u8>> {
        let groups = self.pattern.captures(line)?;
        let mut rewritten = Vec::with_capacity(line.len() + self.value.len());
        if self.disable {
            rewritten.push(b';');
        }
        for i in 2..=7 {
            rewritten.extend_from_slice(group(&groups, i));
        }
        rewritten.extend_from_slice(self.value.as_bytes());
        Some(rewritten)
    }
}

fn group<'h>(groups: &Captures<'h>, i: usize) -> &'h [u8] {
    groups.get(i).map_or(&[][..], |m| m.as_bytes())
}

/// `BASE32(SHA1(fqdn))` in the RFC 4648 upper-case alphabet.
///
/// A SHA-1 digest is 20 bytes, so the result is always 32 characters without padding.
#[must_use]
pub fn name_hash(fqdn: &str) -> String {
    BASE32.encode(digest(&SHA1_FOR_LEGACY_USE_ONLY, fqdn.as_bytes()).as_ref())
}

/// Render `value` as zone file record data.
///
/// A single token without quotes is written bare. Anything else (empty, containing whitespace
/// or a `"`) is wrapped in double quotes with inner quotes backslash-escaped.
#[must_use]
pub fn quote_value(value: &str) -> Cow<'_, str> {
    if value.is_empty() || value.contains(char::is_whitespace) || value.contains('"') {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\\\"")))
    } else {
        Cow::Borrowed(value)
    }
}
