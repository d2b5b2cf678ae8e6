//! Error taxonomy for askcmd.
//!
//! Transport failures abort the current invocation and are reported to the
//! user. Storage and probe failures are recovered where they happen and only
//! ever show up in the logs.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced anywhere along the request pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport rejected the credential.
    #[error("Authentication failed: the API key was rejected ({0})")]
    AuthFailure(String),

    /// Nothing usable came back, including text that normalized to nothing.
    #[error("The model returned an empty response")]
    EmptyContent,

    /// The transport gave up waiting.
    #[error("The request timed out: {0}")]
    Timeout(String),

    /// Any other transport failure.
    #[error("Request failed: {0}")]
    Unclassified(String),

    /// No credential in config or environment.
    #[error(
        "No API key found. Run `askcmd --set-key <KEY>` or set the ASKCMD_API_KEY or OPENAI_API_KEY environment variable."
    )]
    MissingCredential,

    #[error("Config file {} is corrupt: {source}", .path.display())]
    ConfigCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("History file {} is corrupt: {source}", .path.display())]
    HistoryCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Environment probe '{probe}' failed: {reason}")]
    ProbeFailure { probe: &'static str, reason: String },
}

/// Discriminant of [`Error`], as produced by a [`Classifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthFailure,
    EmptyContent,
    Timeout,
    Unclassified,
    MissingCredential,
    ConfigCorrupt,
    HistoryCorrupt,
    ProbeFailure,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AuthFailure(_) => ErrorKind::AuthFailure,
            Error::EmptyContent => ErrorKind::EmptyContent,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Unclassified(_) => ErrorKind::Unclassified,
            Error::MissingCredential => ErrorKind::MissingCredential,
            Error::ConfigCorrupt { .. } => ErrorKind::ConfigCorrupt,
            Error::HistoryCorrupt { .. } => ErrorKind::HistoryCorrupt,
            Error::ProbeFailure { .. } => ErrorKind::ProbeFailure,
        }
    }

    /// Build a transport error of the given kind around the original message.
    ///
    /// Only the four transport kinds are meaningful here; anything else a
    /// custom classifier returns is reported as `Unclassified`.
    pub fn from_transport(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::AuthFailure => Error::AuthFailure(message),
            ErrorKind::EmptyContent => Error::EmptyContent,
            ErrorKind::Timeout => Error::Timeout(message),
            _ => Error::Unclassified(message),
        }
    }
}

/// Maps a transport error message to an [`ErrorKind`].
pub type Classifier = fn(&str) -> ErrorKind;

/// Default heuristic classifier based on substrings of the error message.
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();

    if lower.trim().is_empty() {
        return ErrorKind::EmptyContent;
    }

    const AUTH_MARKERS: [&str; 5] = [
        "api key",
        "api_key",
        "authentication",
        "unauthorized",
        "401",
    ];
    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        return ErrorKind::AuthFailure;
    }

    if lower.contains("timeout") || lower.contains("timed out") {
        return ErrorKind::Timeout;
    }

    if lower.contains("empty response") {
        return ErrorKind::EmptyContent;
    }

    ErrorKind::Unclassified
}
