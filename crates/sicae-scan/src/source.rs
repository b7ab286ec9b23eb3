//! Camera device lifecycle.
//!
//! [`CaptureBackend`] is the platform seam: it knows how to open a device,
//! pull frames from it and stop it. [`FrameSource`] wraps a backend and
//! enforces the lifecycle contract on top of it:
//!
//! - `acquire` prefers the rear camera and falls back to any camera;
//! - `acquire` while already holding a device returns the same handle;
//! - every opened track is stopped exactly once, by `release` or on drop.

use std::future::Future;

use tracing::{debug, info};

use crate::{error::CameraError, frame::PixelBuffer};

/// Which camera to ask the platform for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
  /// The camera facing away from the operator (`environment`).
  Rear,
  Any,
}

/// An open device track. Deliberately not `Clone`: stopping it consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceTrack {
  pub id:     u64,
  pub label:  String,
  pub facing: Facing,
}

impl DeviceTrack {
  pub fn handle(&self) -> VideoHandle {
    VideoHandle { track_id: self.id, label: self.label.clone(), facing: self.facing }
  }
}

/// A caller-visible reference to the live video surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoHandle {
  pub track_id: u64,
  pub label:    String,
  pub facing:   Facing,
}

/// Platform capture backend.
pub trait CaptureBackend: Send {
  /// Whether the environment has any capture capability at all.
  fn is_supported(&self) -> bool { true }

  /// Open a device. Returns [`CameraError::Unavailable`] when no device of
  /// the requested facing exists.
  fn open(&mut self, facing: Facing) -> impl Future<Output = Result<DeviceTrack, CameraError>> + Send + '_;

  /// Wait for the surface to present its next frame.
  ///
  /// `Ok(None)` means the feed ended.
  fn read<'a>(
    &'a mut self,
    track: &'a DeviceTrack,
  ) -> impl Future<Output = Result<Option<PixelBuffer>, CameraError>> + Send + 'a;

  /// Stop the device track.
  fn stop(&mut self, track: DeviceTrack);
}

// ─── FrameSource ─────────────────────────────────────────────────────────────

/// Owns one capture backend and at most one open track.
pub struct FrameSource<B: CaptureBackend> {
  backend: B,
  track:   Option<DeviceTrack>,
}

impl<B: CaptureBackend> FrameSource<B> {
  pub fn new(backend: B) -> Self { Self { backend, track: None } }

  pub fn is_supported(&self) -> bool { self.backend.is_supported() }

  /// Whether a device track is currently held.
  pub fn is_busy(&self) -> bool { self.track.is_some() }

  pub fn backend(&self) -> &B { &self.backend }

  /// Open the camera, or return the handle of the one already open.
  pub async fn acquire(&mut self) -> Result<VideoHandle, CameraError> {
    if let Some(track) = &self.track {
      return Ok(track.handle());
    }

    let track = match self.backend.open(Facing::Rear).await {
      Ok(track) => track,
      Err(CameraError::Unavailable(reason)) => {
        debug!("no rear camera ({reason}), falling back to any camera");
        self.backend.open(Facing::Any).await?
      }
      Err(e) => return Err(e),
    };

    info!(track = track.id, label = %track.label, "camera acquired");
    let handle = track.handle();
    self.track = Some(track);
    Ok(handle)
  }

  /// Next frame from the open track. Without a track the feed is over.
  pub async fn next_frame(&mut self) -> Result<Option<PixelBuffer>, CameraError> {
    match &self.track {
      Some(track) => self.backend.read(track).await,
      None => Ok(None),
    }
  }

  /// Stop the open track, if any. Safe to call repeatedly.
  pub fn release(&mut self) {
    if let Some(track) = self.track.take() {
      info!(track = track.id, "camera released");
      self.backend.stop(track);
    }
  }
}

impl<B: CaptureBackend> Drop for FrameSource<B> {
  fn drop(&mut self) { self.release(); }
}
