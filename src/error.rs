use std::io;

use thiserror::Error;

/// Login failures. A challenge is never retried automatically.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials for {username}")]
    InvalidCredentials { username: String },
    #[error("verification challenge for {username}; solve the captcha manually and try again")]
    Challenge { username: String },
    #[error("invalid login url {0}")]
    InvalidUrl(String),
    #[error("login request failed for {username}: {source}")]
    Transport {
        username: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failures of a single signed API request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("session rejected by server (HTTP {0})")]
    SessionRejected(u16),
    #[error("undecodable response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    /// Whether the session behind the request can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::SessionRejected(_))
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no company found matching '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("company choice failed: {0}")]
    Chooser(#[from] io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("no first name found")]
    MissingFirstName,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("input is in an unknown format")]
    UnknownFormat,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("csv writer flush failed: {0}")]
    Flush(String),
}
