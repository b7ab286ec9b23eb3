//! Error type for camera acquisition.

use std::{fmt, io};

use thiserror::Error;

/// Why the camera could not be used. Both variants move the scanner into its
/// `Unsupported` state; the message is kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
  /// No capture device exists, or the environment has no capture capability.
  #[error("camera unavailable: {0}")]
  Unavailable(String),

  /// The user or the platform refused camera permission.
  #[error("camera permission denied: {0}")]
  Denied(String),
}

impl CameraError {
  /// Classify an I/O failure on a device or frame directory. Refused access
  /// is a denial; anything else (missing node, busy device) means no camera.
  pub fn from_io(what: impl fmt::Display, e: &io::Error) -> Self {
    match e.kind() {
      io::ErrorKind::PermissionDenied => Self::Denied(format!("{what}: {e}")),
      _ => Self::Unavailable(format!("{what}: {e}")),
    }
  }
}
