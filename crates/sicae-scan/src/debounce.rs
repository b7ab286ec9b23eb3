//! Duplicate-payload suppression.

use std::time::Duration;

use tokio::time::Instant;

/// Minimum time between two emissions of the same payload.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(3000);

/// Tracks the last emitted payload and when it was emitted.
///
/// A payload is admitted iff it differs from the last admitted payload, or
/// at least `window` has elapsed since that payload was admitted. Suppressed
/// payloads leave the tracking state untouched, so a code held in front of
/// the camera is re-admitted once per window rather than never.
#[derive(Debug, Clone)]
pub struct Debounce {
  window:          Duration,
  last_payload:    Option<String>,
  last_emitted_at: Option<Instant>,
}

impl Default for Debounce {
  fn default() -> Self { Self::new(DEBOUNCE_WINDOW) }
}

impl Debounce {
  pub fn new(window: Duration) -> Self {
    Self { window, last_payload: None, last_emitted_at: None }
  }

  /// Decide whether `payload` observed at `now` should be emitted, recording
  /// it as the last emission if so.
  pub fn admit(&mut self, payload: &str, now: Instant) -> bool {
    let suppressed = match (self.last_payload.as_deref(), self.last_emitted_at) {
      (Some(last), Some(at)) => last == payload && now.saturating_duration_since(at) < self.window,
      _ => false,
    };
    if suppressed {
      return false;
    }
    self.last_payload = Some(payload.to_owned());
    self.last_emitted_at = Some(now);
    true
  }

  /// Forget everything; the next payload is always admitted.
  pub fn reset(&mut self) {
    self.last_payload = None;
    self.last_emitted_at = None;
  }

  pub fn last_payload(&self) -> Option<&str> { self.last_payload.as_deref() }
}
