//! Error types for `sicae-client`.

use sicae_core::{ApiError, AuthError, SyncError};
use thiserror::Error;

/// Failure to persist or remove the session blob.
#[derive(Debug, Error)]
pub enum SessionError {
  #[error("session storage error: {0}")]
  Io(#[from] std::io::Error),

  #[error("session encoding error: {0}")]
  Json(#[from] serde_json::Error),
}

/// Any error surfaced by [`crate::AccessConsole`].
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Auth(#[from] AuthError),

  #[error(transparent)]
  Api(#[from] ApiError),

  #[error(transparent)]
  Sync(#[from] SyncError),

  #[error(transparent)]
  Session(#[from] SessionError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
