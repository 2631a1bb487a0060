use std::{io, path::PathBuf};

use thiserror::Error;

/// Main error type for the tether client.
///
/// Covers I/O against the host file service, HTTP transport failures,
/// serialization, configuration, and protocol-level surprises. Server and
/// transport failures surfaced to the UI are materialized as typed results
/// at the call sites; this enum is what flows through the library seams.
#[derive(Debug, Error)]
pub enum Error {
   /// I/O error occurred during file or stream operations.
   #[error("io error: {0}")]
   Io(#[from] io::Error),

   /// HTTP request or response error occurred.
   #[error("http error: {0}")]
   Http(#[from] HttpError),

   /// JSON serialization or deserialization error occurred.
   #[error("json error: {0}")]
   Json(#[from] serde_json::Error),

   /// Configuration-related error occurred.
   #[error("config error: {0}")]
   Config(#[from] ConfigError),

   /// Server error occurred during a specific operation.
   #[error("server error during {op}: {reason}")]
   Server { op: &'static str, reason: String },

   /// Response was missing a field or shape the protocol requires.
   #[error("unexpected response from server during {0}")]
   UnexpectedResponse(&'static str),

   /// Path is not valid UTF-8 or cannot be keyed relative to the root.
   #[error("invalid path: {path}", path = _0.display())]
   InvalidPath(PathBuf),
}

/// Errors that can occur at the HTTP transport boundary.
#[derive(Debug, Error)]
pub enum HttpError {
   /// Request failed before a usable response arrived (network, timeout).
   #[error("request failed: {0}")]
   Request(#[from] reqwest::Error),

   /// Non-success status code; the body text is retained for diagnostics.
   #[error("status {status}: {body}")]
   Status { status: u16, body: String },
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
   /// Failed to retrieve user directories (e.g., home directory).
   #[error("failed to get user directories")]
   GetUserDirectories,

   /// Extraction from file/env providers failed.
   #[error("failed to load config: {0}")]
   Load(#[from] figment::Error),

   /// A value is outside the supported range.
   #[error("invalid config: {0}")]
   Invalid(String),
}

impl From<reqwest::Error> for Error {
   fn from(e: reqwest::Error) -> Self {
      Self::Http(HttpError::Request(e))
   }
}

/// Standard result type using [`enum@Error`] as the default error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
