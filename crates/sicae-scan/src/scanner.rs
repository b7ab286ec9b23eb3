//! The scan loop state machine and its handle.
//!
//! ```text
//!            activate                first frame
//!   Idle ─────────────▶ Acquiring ─────────────────▶ Active
//!    ▲  │                  │                           │
//!    │  │ no capability    │ Unavailable / Denied      │ feed ended
//!    │  ▼                  ▼                           │
//!    │ Unsupported ◀───────┘◀──────────────────────────┤ (camera errors)
//!    │                                                 │
//!    └──────────────── deactivate / teardown ◀─────────┘
//! ```
//!
//! One tokio task per [`Scanner`] owns the frame source, the decoder, the
//! debounce state and the subscriber. The handle talks to it through a
//! command channel and a [`CancelToken`] that is tripped synchronously on
//! `deactivate`, so a frame already in flight is dropped instead of being
//! delivered after the stop. Decoding runs on the blocking pool.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{
  sync::{mpsc, watch},
  task::JoinHandle,
  time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
  cancel::CancelToken,
  debounce::Debounce,
  decode::Decoder,
  error::CameraError,
  frame::PixelBuffer,
  source::{CaptureBackend, FrameSource},
};

// ─── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
  Idle,
  Acquiring,
  Active,
  /// The camera cannot be used; manual entry still works.
  Unsupported { reason: String },
}

impl ScanState {
  fn is_streaming(&self) -> bool { matches!(self, Self::Acquiring | Self::Active) }
}

/// Where a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrigin {
  Camera,
  Manual,
}

/// A payload that survived the debounce window. Delivered once, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
  pub payload:     String,
  pub observed_at: DateTime<Utc>,
  pub origin:      ScanOrigin,
}

// ─── Handle ──────────────────────────────────────────────────────────────────

enum Command {
  Activate(CancelToken),
  Deactivate,
  Manual(String),
  Shutdown,
}

/// Handle to a running scan loop.
///
/// Dropping the handle tears the loop down and releases the camera.
pub struct Scanner {
  commands: mpsc::UnboundedSender<Command>,
  state:    watch::Receiver<ScanState>,
  cancel:   Option<CancelToken>,
  task:     Option<JoinHandle<()>>,
}

impl Scanner {
  /// Spawn a scan loop on the current tokio runtime. Every event is passed to
  /// `subscriber`, the loop's only consumer.
  pub fn spawn<B, D, F>(source: FrameSource<B>, decoder: D, subscriber: F) -> Self
  where
    B: CaptureBackend + 'static,
    D: Decoder + 'static,
    F: FnMut(ScanEvent) + Send + 'static,
  {
    let (commands, rx) = mpsc::unbounded_channel();
    let (state_tx, state) = watch::channel(ScanState::Idle);
    let scan_loop = ScanLoop {
      source,
      decoder: Arc::new(decoder),
      subscriber,
      state: state_tx,
      debounce: Debounce::default(),
      cancel: CancelToken::new(),
    };
    let task = tokio::spawn(scan_loop.run(rx));
    Self { commands, state, cancel: None, task: Some(task) }
  }

  /// Start the camera. No-op while acquiring or active.
  pub fn activate(&mut self) {
    let token = self.cancel.get_or_insert_with(CancelToken::new).clone();
    self.send(Command::Activate(token));
  }

  /// Stop the camera and forget the debounce history. Takes effect
  /// immediately: no frame is delivered after this returns.
  pub fn deactivate(&mut self) {
    if let Some(token) = self.cancel.take() {
      token.cancel();
    }
    self.send(Command::Deactivate);
  }

  /// Submit a code typed or pasted by the operator. Bypasses the camera but
  /// not the debounce window. Blank text is ignored.
  pub fn submit_manual(&self, text: impl Into<String>) { self.send(Command::Manual(text.into())); }

  pub fn state(&self) -> ScanState { self.state.borrow().clone() }

  /// Wait until the loop reaches a state matching `pred`.
  pub async fn wait_for(&self, mut pred: impl FnMut(&ScanState) -> bool) -> ScanState {
    let mut rx = self.state.clone();
    if let Ok(state) = rx.wait_for(|s| pred(s)).await {
      return state.clone();
    }
    // The loop is gone; report the last state it published.
    rx.borrow().clone()
  }

  /// Subscribe to state transitions, e.g. to render a status line.
  pub fn watch_state(&self) -> watch::Receiver<ScanState> { self.state.clone() }

  /// Stop the loop, release the camera and wait for the task to finish.
  pub async fn shutdown(mut self) {
    if let Some(token) = self.cancel.take() {
      token.cancel();
    }
    self.send(Command::Shutdown);
    if let Some(task) = self.task.take()
      && let Err(e) = task.await
    {
      warn!("scan loop task failed: {e}");
    }
  }

  fn send(&self, command: Command) {
    if self.commands.send(command).is_err() {
      debug!("scan loop already stopped, dropping command");
    }
  }
}

impl Drop for Scanner {
  fn drop(&mut self) {
    if let Some(token) = self.cancel.take() {
      token.cancel();
    }
    // The loop observes the closed channel and releases the camera.
  }
}

// ─── Loop ────────────────────────────────────────────────────────────────────

struct ScanLoop<B: CaptureBackend, D, F> {
  source:     FrameSource<B>,
  decoder:    Arc<D>,
  subscriber: F,
  state:      watch::Sender<ScanState>,
  debounce:   Debounce,
  /// Token of the current activation.
  cancel:     CancelToken,
}

impl<B, D, F> ScanLoop<B, D, F>
where
  B: CaptureBackend,
  D: Decoder + 'static,
  F: FnMut(ScanEvent) + Send,
{
  async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
    loop {
      if !self.current().is_streaming() {
        match commands.recv().await {
          Some(Command::Shutdown) | None => break,
          Some(command) => self.handle(command).await,
        }
        continue;
      }

      let cancel = self.cancel.clone();
      tokio::select! {
        biased;
        command = commands.recv() => match command {
          Some(Command::Shutdown) | None => break,
          Some(command) => self.handle(command).await,
        },
        // The matching `Deactivate` is already queued; stop reading frames.
        _ = cancel.cancelled() => self.stop(),
        frame = self.source.next_frame() => self.tick(frame).await,
      }
    }

    self.stop();
    debug!("scan loop finished");
  }

  async fn handle(&mut self, command: Command) {
    match command {
      Command::Activate(token) => self.activate(token).await,
      Command::Deactivate => self.stop(),
      Command::Manual(text) => {
        let text = text.trim();
        if !text.is_empty() {
          self.offer(text.to_owned(), ScanOrigin::Manual);
        }
      }
      Command::Shutdown => {}
    }
  }

  async fn activate(&mut self, token: CancelToken) {
    if self.current().is_streaming() || token.is_cancelled() {
      return;
    }
    if !self.source.is_supported() {
      self.set_state(ScanState::Unsupported {
        reason: "this environment has no camera capture capability".into(),
      });
      return;
    }

    self.cancel = token.clone();
    self.set_state(ScanState::Acquiring);

    let acquired = tokio::select! {
      biased;
      _ = token.cancelled() => None,
      result = self.source.acquire() => Some(result),
    };

    match acquired {
      None => self.stop(),
      Some(Ok(_)) if token.is_cancelled() => self.stop(),
      Some(Ok(handle)) => debug!(label = %handle.label, "waiting for first frame"),
      Some(Err(e)) => self.unsupported(e.to_string()),
    }
  }

  /// One capture/decode step.
  async fn tick(&mut self, frame: Result<Option<PixelBuffer>, CameraError>) {
    let frame = match frame {
      Ok(Some(frame)) => frame,
      Ok(None) => {
        warn!("capture feed ended");
        self.stop();
        return;
      }
      Err(e) => {
        self.unsupported(e.to_string());
        return;
      }
    };
    if self.cancel.is_cancelled() {
      return;
    }

    if *self.state.borrow() == ScanState::Acquiring {
      if frame.is_empty() {
        return;
      }
      self.set_state(ScanState::Active);
    }

    let decoder = Arc::clone(&self.decoder);
    let decoded = match tokio::task::spawn_blocking(move || decoder.decode(&frame)).await {
      Ok(decoded) => decoded,
      Err(e) => {
        warn!("decoder task failed: {e}");
        None
      }
    };
    if let Some(payload) = decoded
      && !self.cancel.is_cancelled()
    {
      self.offer(payload, ScanOrigin::Camera);
    }

    // Let the command channel and other tasks run between frames.
    tokio::task::yield_now().await;
  }

  fn offer(&mut self, payload: String, origin: ScanOrigin) {
    if !self.debounce.admit(&payload, Instant::now()) {
      debug!(%payload, "suppressed repeated scan");
      return;
    }
    info!(%payload, ?origin, "scan accepted");
    (self.subscriber)(ScanEvent { payload, observed_at: Utc::now(), origin });
  }

  /// Any state → Idle: release the camera, forget the debounce history.
  fn stop(&mut self) {
    self.source.release();
    self.debounce.reset();
    self.set_state(ScanState::Idle);
  }

  fn unsupported(&mut self, reason: String) {
    warn!(%reason, "camera unsupported, manual entry only");
    self.source.release();
    self.set_state(ScanState::Unsupported { reason });
  }

  fn current(&self) -> ScanState { self.state.borrow().clone() }

  fn set_state(&self, next: ScanState) {
    self.state.send_if_modified(|state| {
      if *state == next {
        return false;
      }
      debug!(from = ?state, to = ?next, "scan state");
      *state = next;
      true
    });
  }
}
