use crate::error::Error;
use crate::zone::SerialPolicy;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub type SharedConfig = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub zone_file: PathBuf,
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_api_timeout")]
    pub api_timeout: Duration,
    /// How long to wait for the zone lock. Tried once per second.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout: Duration,
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    #[serde(default = "default_auth_realm")]
    pub auth_realm: String,
    #[serde(default)]
    pub http_user: Option<String>,
    #[serde(default)]
    pub http_password: Option<String>,
    /// Whitespace delimited `user password` lines, reloaded on `SIGHUP`.
    #[serde(default)]
    pub http_auth_file: Option<PathBuf>,
    #[serde(default)]
    pub robots_txt: bool,
    #[serde(default)]
    pub sequential_serial: bool,
    /// Only write `<zone>.tmp`, never replace the zone file.
    #[serde(default)]
    pub test_mode: bool,
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_lock_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_url_prefix() -> String {
    "/zone-update".to_string()
}

fn default_auth_realm() -> String {
    "zone-update".to_string()
}

impl Config {
    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read, [`Error::InvalidJSON`] if it doesn't
    /// parse, or any error from [`validated`](Self::validated).
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.validated()
    }

    /// Check option combinations and normalise the URL prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if only one of user and password is set, or if both a
    /// user and an auth file are set.
    pub fn validated(mut self) -> Result<Self, Error> {
        if self.http_user.is_some() != self.http_password.is_some() {
            return Err(Error::InvalidConfig(
                "must supply both user and password or neither".to_string(),
            ));
        }
        if self.http_auth_file.is_some() && self.http_user.is_some() {
            return Err(Error::InvalidConfig(
                "cannot specify both an auth file and a user".to_string(),
            ));
        }
        if !self.url_prefix.starts_with('/') {
            self.url_prefix.insert(0, '/');
        }
        let trimmed_len = self.url_prefix.trim_end_matches('/').len();
        self.url_prefix.truncate(trimmed_len);
        Ok(self)
    }

    #[must_use]
    pub const fn serial_policy(&self) -> SerialPolicy {
        if self.sequential_serial {
            SerialPolicy::Sequential
        } else {
            SerialPolicy::DateBased
        }
    }
}
