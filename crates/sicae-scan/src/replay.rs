//! Capture backend that replays greyscale PGM (`P5`) frames from a directory.
//!
//! Used at access points without a live camera and for field diagnostics: a
//! directory of stills captured elsewhere is presented at a fixed frame rate,
//! in file-name order, as if it were a video surface.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
  error::CameraError,
  frame::PixelBuffer,
  source::{CaptureBackend, DeviceTrack, Facing},
};

/// Replays every `*.pgm` file in `dir`.
pub struct ReplayCapture {
  dir:        PathBuf,
  interval:   Duration,
  looped:     bool,
  frames:     Vec<PathBuf>,
  cursor:     usize,
  next_due:   Option<Instant>,
  next_track: u64,
}

impl ReplayCapture {
  pub fn new(dir: impl Into<PathBuf>, fps: u32) -> Self {
    Self {
      dir:        dir.into(),
      interval:   Duration::from_secs(1) / fps.max(1),
      looped:     false,
      frames:     Vec::new(),
      cursor:     0,
      next_due:   None,
      next_track: 1,
    }
  }

  /// Start over from the first frame when the directory is exhausted.
  pub fn looped(mut self, looped: bool) -> Self {
    self.looped = looped;
    self
  }

  async fn list_frames(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut frames = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pgm")) {
        frames.push(path);
      }
    }
    frames.sort();
    Ok(frames)
  }
}

impl CaptureBackend for ReplayCapture {
  fn is_supported(&self) -> bool { self.dir.is_dir() }

  async fn open(&mut self, facing: Facing) -> Result<DeviceTrack, CameraError> {
    let frames = Self::list_frames(&self.dir)
      .await
      .map_err(|e| CameraError::from_io(self.dir.display(), &e))?;
    if frames.is_empty() {
      return Err(CameraError::Unavailable(format!("no .pgm frames in {}", self.dir.display())));
    }

    debug!(count = frames.len(), dir = %self.dir.display(), "replaying frames");
    self.frames = frames;
    self.cursor = 0;
    self.next_due = None;
    let id = self.next_track;
    self.next_track += 1;
    Ok(DeviceTrack { id, label: format!("replay:{}", self.dir.display()), facing })
  }

  async fn read(&mut self, _track: &DeviceTrack) -> Result<Option<PixelBuffer>, CameraError> {
    loop {
      if self.cursor >= self.frames.len() {
        if !self.looped || self.frames.is_empty() {
          return Ok(None);
        }
        self.cursor = 0;
      }

      if let Some(due) = self.next_due {
        tokio::time::sleep_until(due).await;
      }
      self.next_due = Some(Instant::now() + self.interval);

      let path = &self.frames[self.cursor];
      self.cursor += 1;
      match tokio::fs::read(path).await {
        Ok(bytes) => match parse_pgm(&bytes) {
          Some(frame) => return Ok(Some(frame)),
          None => warn!(path = %path.display(), "skipping malformed PGM frame"),
        },
        Err(e) => warn!(path = %path.display(), "skipping unreadable frame: {e}"),
      }
    }
  }

  fn stop(&mut self, track: DeviceTrack) {
    debug!(track = track.id, "replay stopped");
    self.frames.clear();
    self.cursor = 0;
    self.next_due = None;
  }
}

// ─── PGM ─────────────────────────────────────────────────────────────────────

/// Parse a binary greyscale PGM with an 8-bit sample depth.
pub fn parse_pgm(bytes: &[u8]) -> Option<PixelBuffer> {
  let mut pos = 0;
  if bytes.get(..2)? != b"P5" {
    return None;
  }
  pos += 2;

  let width = header_number(bytes, &mut pos)?;
  let height = header_number(bytes, &mut pos)?;
  let max = header_number(bytes, &mut pos)?;
  if max == 0 || max > 255 {
    return None;
  }
  // Exactly one whitespace byte separates the header from the raster.
  if !bytes.get(pos)?.is_ascii_whitespace() {
    return None;
  }
  pos += 1;

  let len = width.checked_mul(height)?;
  let raster = bytes.get(pos..pos.checked_add(len)?)?;
  let data = if max == 255 {
    raster.to_vec()
  } else {
    // Samples above the declared depth are clamped to it.
    raster.iter().map(|&v| ((v.min(max as u8) as usize * 255) / max) as u8).collect()
  };
  Some(PixelBuffer::luma(width, height, data))
}

/// Skip whitespace and `#` comments, then read one decimal number.
fn header_number(bytes: &[u8], pos: &mut usize) -> Option<usize> {
  loop {
    match bytes.get(*pos)? {
      b'#' => {
        while *bytes.get(*pos)? != b'\n' {
          *pos += 1;
        }
      }
      b if b.is_ascii_whitespace() => *pos += 1,
      _ => break,
    }
  }
  let start = *pos;
  while bytes.get(*pos).is_some_and(u8::is_ascii_digit) {
    *pos += 1;
  }
  std::str::from_utf8(&bytes[start..*pos]).ok()?.parse().ok()
}
