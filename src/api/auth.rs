//! HTTP Basic Auth for the update routes.
//!
//! Credentials come from the single `http_user`/`http_password` pair in the config, or from a
//! password file of whitespace delimited `user password` lines. The password file can be
//! reloaded at runtime; each load replaces the whole credential set at once, and a failed load
//! leaves the previous set in effect.
use crate::api::api_error::APIError;
use crate::api::server::AppState;
use crate::config::Config;
use crate::error::Error;
use arc_swap::ArcSwap;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type Credentials = HashMap<String, String>;

#[derive(Debug)]
pub struct CredentialStore {
    enabled: bool,
    source: Option<PathBuf>,
    credentials: ArcSwap<Credentials>,
}

impl CredentialStore {
    /// A store that lets every request through.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            source: None,
            credentials: ArcSwap::from_pointee(Credentials::default()),
        }
    }

    #[must_use]
    pub fn single(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            enabled: true,
            source: None,
            credentials: ArcSwap::from_pointee(HashMap::from([(user.into(), password.into())])),
        }
    }

    /// Load a store from a password file. Auth is enforced even if the file has no entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read, or [`Error::CredentialsFile`] if a line
    /// isn't a `user password` pair.
    pub async fn try_from_file(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let credentials = load_credentials(&path).await?;
        Ok(Self {
            enabled: true,
            source: Some(path),
            credentials: ArcSwap::from_pointee(credentials),
        })
    }

    /// Build the store the config asks for.
    ///
    /// # Errors
    ///
    /// See [`try_from_file`](Self::try_from_file).
    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        if let Some(path) = &config.http_auth_file {
            return Self::try_from_file(path).await;
        }
        match (&config.http_user, &config.http_password) {
            (Some(user), Some(password)) => Ok(Self::single(user, password)),
            _ => Ok(Self::disabled()),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Re-read the password file, if the store has one. Returns whether anything was loaded.
    ///
    /// # Errors
    ///
    /// See [`try_from_file`](Self::try_from_file). The current credentials are kept on error.
    pub async fn reload(&self) -> Result<bool, Error> {
        let Some(path) = &self.source else {
            return Ok(false);
        };
        let credentials = load_credentials(path).await?;
        self.credentials.store(Arc::new(credentials));
        Ok(true)
    }

    #[must_use]
    pub fn check(&self, user: &str, password: &str) -> bool {
        self.credentials
            .load()
            .get(user)
            .is_some_and(|expected| expected == password)
    }
}

async fn load_credentials(path: &Path) -> Result<Credentials, Error> {
    let contents = tokio::fs::read_to_string(path).await?;
    parse_credentials(&contents)
}

/// Parse password file contents. Blank lines are skipped.
///
/// # Errors
///
/// Returns [`Error::CredentialsFile`] with the 1-based line number of the first line that
/// doesn't have exactly two fields.
pub fn parse_credentials(contents: &str) -> Result<Credentials, Error> {
    let mut credentials = Credentials::new();
    for (i, line) in contents.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [user, password] => {
                credentials.insert((*user).to_string(), (*password).to_string());
            }
            _ => {
                return Err(Error::CredentialsFile {
                    line: i + 1,
                    entry: line.to_string(),
                })
            }
        }
    }
    Ok(credentials)
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

pub(super) async fn require_basic_auth<B>(
    State(state): State<AppState>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    if !state.credentials.is_enabled() {
        return next.run(request).await;
    }
    if let Some((user, password)) = basic_credentials(request.headers()) {
        if state.credentials.check(&user, &password) {
            return next.run(request).await;
        }
        tracing::debug!("rejected credentials for user \"{user}\"");
    }

    let mut response = APIError::from(Error::Unauthorized).into_response();
    let challenge = format!("Basic realm=\"{}\"", state.config.auth_realm);
    if let Ok(challenge) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert(WWW_AUTHENTICATE, challenge);
    }
    response
}
