//! Error taxonomy shared by every SICAE crate.
//!
//! Remote failures are split by the operation that produced them: plain API
//! calls yield [`ApiError`], authentication yields [`AuthError`], and a
//! combined refresh of the domain collections yields [`SyncError`].

use std::fmt;

use thiserror::Error;

/// An error returned by a remote API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// Missing, expired or insufficient token (HTTP 401/403).
  #[error("unauthorized")]
  Unauthorized,

  /// The server rejected the request body; carries the server's message.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("server error: {0}")]
  ServerError(String),

  /// A successful response whose body could not be read.
  #[error("unexpected response: {0}")]
  UnexpectedResponse(String),

  /// The request never produced an HTTP response.
  #[error("network failure: {0}")]
  NetworkFailure(String),
}

impl ApiError {
  pub fn is_network(&self) -> bool { matches!(self, Self::NetworkFailure(_)) }
}

/// An error returned by `login` / `register`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
  #[error("invalid credentials: {0}")]
  InvalidCredentials(String),

  /// The server failed or answered with something unreadable. Not a
  /// statement about the credentials.
  #[error("server error: {0}")]
  ServerError(String),

  #[error("network failure: {0}")]
  NetworkFailure(String),
}

// ─── Sync ────────────────────────────────────────────────────────────────────

/// The domain collections fetched during a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
  People,
  Credentials,
  Events,
  AccessPoints,
  Users,
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::People => "people",
      Self::Credentials => "credentials",
      Self::Events => "events",
      Self::AccessPoints => "access points",
      Self::Users => "users",
    })
  }
}

/// A refresh failed as a whole; no part of it was published.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
  /// At least one collection could not be fetched.
  #[error("failed to fetch {collection}: {source}")]
  PartialFetchFailure {
    collection: Collection,
    #[source]
    source:     ApiError,
  },

  /// Every fetch failed before reaching the server.
  #[error("network failure: {0}")]
  NetworkFailure(String),
}
