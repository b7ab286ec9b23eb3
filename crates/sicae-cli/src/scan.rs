//! `sicae scan`: run an access reader in the foreground.
//!
//! Frames come from a replay directory when one is configured, otherwise from
//! the V4L2 camera when the binary is built with the `v4l2` feature. Without
//! either the reader has no camera and runs on typed codes alone. Every line
//! read from stdin is submitted as a manual entry.

use std::path::PathBuf;

use anyhow::Result;
use sicae_client::{AccessConsole, AccessReader, ReaderContext, ReaderOutcome};
use sicae_core::api::AccessApi;
#[cfg(not(feature = "v4l2"))]
use sicae_scan::{CameraError, DeviceTrack, Facing, PixelBuffer};
use sicae_scan::{CaptureBackend, FrameSource, QrDecoder, ScanState, replay::ReplayCapture};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

pub struct ScanOptions {
  pub ctx:    ReaderContext,
  pub frames: Option<PathBuf>,
  pub device: PathBuf,
  pub fps:    u32,
  pub looped: bool,
}

/// Stand-in for a build without any capture device support.
#[cfg(not(feature = "v4l2"))]
struct NoCamera;

#[cfg(not(feature = "v4l2"))]
impl CaptureBackend for NoCamera {
  fn is_supported(&self) -> bool { false }

  async fn open(&mut self, _facing: Facing) -> Result<DeviceTrack, CameraError> {
    Err(CameraError::Unavailable("no capture device configured".into()))
  }

  async fn read(&mut self, _track: &DeviceTrack) -> Result<Option<PixelBuffer>, CameraError> {
    Ok(None)
  }

  fn stop(&mut self, _track: DeviceTrack) {}
}

pub async fn run<A: AccessApi + 'static>(
  console: &AccessConsole<A>,
  options: ScanOptions,
) -> Result<()> {
  // Only to name people in the output; validation itself needs no session.
  let _ = console.start().await;

  match &options.frames {
    Some(dir) => {
      info!(dir = %dir.display(), fps = options.fps, "replaying frames");
      let capture = ReplayCapture::new(dir, options.fps).looped(options.looped);
      drive(console, capture, options.ctx).await
    }
    #[cfg(feature = "v4l2")]
    None => {
      info!(device = %options.device.display(), "using camera");
      drive(console, sicae_scan::V4l2Capture::new(&options.device), options.ctx).await
    }
    #[cfg(not(feature = "v4l2"))]
    None => {
      info!(device = %options.device.display(), "built without camera support");
      drive(console, NoCamera, options.ctx).await
    }
  }
}

async fn drive<A, B>(console: &AccessConsole<A>, backend: B, ctx: ReaderContext) -> Result<()>
where
  A: AccessApi + 'static,
  B: CaptureBackend + 'static,
{
  let mut reader = AccessReader::spawn(console.gateway(), FrameSource::new(backend), QrDecoder, ctx);
  let mut states = reader.scanner().watch_state();
  reader.activate();

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut stdin_open = true;

  loop {
    tokio::select! {
      changed = states.changed() => {
        if changed.is_err() {
          break;
        }
        let state = states.borrow_and_update().clone();
        match state {
          ScanState::Unsupported { reason } => {
            eprintln!("Camera unavailable ({reason}); type codes and press enter.");
          }
          ScanState::Idle if !stdin_open => break,
          other => info!(state = ?other, "reader state"),
        }
      }
      line = lines.next_line(), if stdin_open => match line? {
        Some(line) => reader.submit_manual(line),
        None => {
          stdin_open = false;
          if !matches!(reader.state(), ScanState::Acquiring | ScanState::Active) {
            break;
          }
        }
      },
      outcome = reader.next_outcome() => match outcome {
        Some(outcome) => print_outcome(console, &outcome),
        None => break,
      },
      _ = tokio::signal::ctrl_c() => break,
    }
  }

  for outcome in reader.shutdown().await {
    print_outcome(console, &outcome);
  }
  Ok(())
}

fn print_outcome<A: AccessApi>(console: &AccessConsole<A>, outcome: &ReaderOutcome) {
  match &outcome.result {
    Ok(event) => {
      let snapshot = console.snapshot();
      let name = snapshot
        .people
        .iter()
        .find(|p| p.id == event.person_id)
        .map(|p| p.full_name.as_str())
        .unwrap_or("unknown person");
      println!(
        "{}  {:<8} {name}  ({})",
        outcome.scan.observed_at.format("%H:%M:%S"),
        event.result.to_string(),
        event.reason
      );
    }
    Err(e) => println!("{}  ERROR    {e}", outcome.scan.observed_at.format("%H:%M:%S")),
  }
}
