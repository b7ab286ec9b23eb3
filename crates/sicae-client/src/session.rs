//! [`SessionStore`]: the single source of truth for "logged in as whom".
//!
//! The session is persisted as one JSON blob under a fixed key
//! (`<state_dir>/sicae_session.json`). A missing or unreadable blob means
//! "no session"; it is never an error at startup.

use std::{
  fs,
  io::ErrorKind,
  path::{Path, PathBuf},
  sync::{PoisonError, RwLock},
};

use sicae_core::{Session, Token};
use tracing::{debug, warn};

use crate::error::SessionError;

/// Storage key of the persisted session record.
pub const SESSION_KEY: &str = "sicae_session";

pub struct SessionStore {
  /// `None` keeps the session in memory only.
  path:    Option<PathBuf>,
  current: RwLock<Option<Session>>,
}

impl SessionStore {
  /// A store persisting under `state_dir`. Nothing is read until
  /// [`restore`](Self::restore).
  pub fn open(state_dir: impl AsRef<Path>) -> Self {
    Self {
      path:    Some(state_dir.as_ref().join(format!("{SESSION_KEY}.json"))),
      current: RwLock::new(None),
    }
  }

  /// A store that forgets everything when dropped.
  pub fn in_memory() -> Self { Self { path: None, current: RwLock::new(None) } }

  /// Load the persisted session, if any. Malformed data is discarded and
  /// treated as absent.
  pub fn restore(&self) -> Option<Session> {
    let Some(path) = &self.path else {
      return self.current();
    };

    let restored = match fs::read(path) {
      Ok(bytes) => match serde_json::from_slice::<Session>(&bytes) {
        Ok(session) if !session.token.is_empty() => Some(session),
        Ok(_) => {
          warn!(path = %path.display(), "discarding persisted session without token");
          remove_if_exists(path);
          None
        }
        Err(e) => {
          warn!(path = %path.display(), "discarding malformed persisted session: {e}");
          remove_if_exists(path);
          None
        }
      },
      Err(e) if e.kind() == ErrorKind::NotFound => None,
      Err(e) => {
        warn!(path = %path.display(), "cannot read persisted session: {e}");
        None
      }
    };

    *self.write() = restored.clone();
    restored
  }

  /// Replace the current session. The persisted blob is swapped by rename,
  /// so a reader never observes a half-written record; memory is updated only
  /// once the blob is in place.
  pub fn save(&self, session: Session) -> Result<(), SessionError> {
    if let Some(path) = &self.path {
      if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
      }
      let tmp = path.with_extension("json.tmp");
      fs::write(&tmp, serde_json::to_vec(&session)?)?;
      fs::rename(&tmp, path)?;
      debug!(path = %path.display(), "session saved");
    }
    *self.write() = Some(session);
    Ok(())
  }

  /// Forget the session in memory and on disk.
  pub fn clear(&self) -> Result<(), SessionError> {
    *self.write() = None;
    if let Some(path) = &self.path {
      match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "session cleared"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
      }
    }
    Ok(())
  }

  pub fn current(&self) -> Option<Session> {
    self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn token(&self) -> Option<Token> { self.current().map(|s| s.token) }

  pub fn is_authenticated(&self) -> bool { self.current().is_some() }

  fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
    self.current.write().unwrap_or_else(PoisonError::into_inner)
  }
}

fn remove_if_exists(path: &Path) {
  if let Err(e) = fs::remove_file(path)
    && e.kind() != ErrorKind::NotFound
  {
    warn!(path = %path.display(), "cannot remove session blob: {e}");
  }
}
