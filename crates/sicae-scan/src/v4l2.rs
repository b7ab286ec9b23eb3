//! Live capture from a Video4Linux2 device (`/dev/videoN`).
//!
//! The device is streamed through memory-mapped buffers on a dedicated
//! thread, since dequeuing a buffer blocks until the sensor delivers a frame.
//! Frames cross to the scan loop over a small bounded channel; when the loop
//! falls behind the thread waits rather than queueing stale frames.

use std::{
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
};

use tokio::sync::mpsc;
use tracing::{debug, info};
use v4l::{
  Device, FourCC, buffer::Type, io::traits::CaptureStream, prelude::MmapStream, video::Capture,
};

use crate::{
  error::CameraError,
  frame::{PixelBuffer, PixelFormat},
  source::{CaptureBackend, DeviceTrack, Facing},
};

const BUFFERS: u32 = 4;

type FrameResult = Result<PixelBuffer, CameraError>;

/// A V4L2 camera. The configured node serves every [`Facing`]: the kernel
/// does not report which way a device points.
pub struct V4l2Capture {
  path:       PathBuf,
  width:      u32,
  height:     u32,
  frames:     Option<mpsc::Receiver<FrameResult>>,
  running:    Option<Arc<AtomicBool>>,
  next_track: u64,
}

impl V4l2Capture {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path:       path.into(),
      width:      640,
      height:     480,
      frames:     None,
      running:    None,
      next_track: 1,
    }
  }

  /// Resolution to request. The driver may pick the closest it supports.
  pub fn resolution(mut self, width: u32, height: u32) -> Self {
    self.width = width;
    self.height = height;
    self
  }
}

/// A configured device and the frame layout the driver agreed to.
struct Opened {
  device: Device,
  format: PixelFormat,
  width:  usize,
  height: usize,
}

fn open_device(path: &Path, width: u32, height: u32) -> Result<Opened, CameraError> {
  let io = |e: std::io::Error| CameraError::from_io(path.display(), &e);

  let device = Device::with_path(path).map_err(io)?;
  let mut fmt = device.format().map_err(io)?;
  fmt.width = width;
  fmt.height = height;
  fmt.fourcc = FourCC::new(b"YUYV");
  let fmt = device.set_format(&fmt).map_err(io)?;

  let format = match &fmt.fourcc.repr {
    b"YUYV" => PixelFormat::Yuyv422,
    b"GREY" => PixelFormat::Luma8,
    _ => {
      return Err(CameraError::Unavailable(format!(
        "{}: unsupported pixel format {}",
        path.display(),
        fmt.fourcc
      )));
    }
  };
  Ok(Opened { device, format, width: fmt.width as usize, height: fmt.height as usize })
}

/// Capture thread body. Ends when `running` is cleared, the receiver is
/// dropped or the device fails.
fn capture(opened: Opened, label: String, running: Arc<AtomicBool>, tx: mpsc::Sender<FrameResult>) {
  let mut stream = match MmapStream::with_buffers(&opened.device, Type::VideoCapture, BUFFERS) {
    Ok(stream) => stream,
    Err(e) => {
      let _ = tx.blocking_send(Err(CameraError::from_io(&label, &e)));
      return;
    }
  };

  while running.load(Ordering::Acquire) {
    let frame = match stream.next() {
      Ok((buf, meta)) => {
        let used = (meta.bytesused as usize).min(buf.len());
        Ok(PixelBuffer {
          width:  opened.width,
          height: opened.height,
          format: opened.format,
          data:   buf[..used].to_vec(),
        })
      }
      Err(e) => Err(CameraError::from_io(&label, &e)),
    };
    let failed = frame.is_err();
    if tx.blocking_send(frame).is_err() || failed {
      break;
    }
  }
  debug!(%label, "capture thread finished");
}

impl CaptureBackend for V4l2Capture {
  async fn open(&mut self, facing: Facing) -> Result<DeviceTrack, CameraError> {
    let (path, width, height) = (self.path.clone(), self.width, self.height);
    let opened = tokio::task::spawn_blocking(move || open_device(&path, width, height))
      .await
      .map_err(|e| CameraError::Unavailable(format!("opening {}: {e}", self.path.display())))??;

    let label = format!("v4l2:{}", self.path.display());
    info!(
      %label,
      width = opened.width,
      height = opened.height,
      format = ?opened.format,
      "camera opened"
    );

    let (tx, rx) = mpsc::channel(2);
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let thread_label = label.clone();
    thread::Builder::new()
      .name("sicae-v4l2".into())
      .spawn(move || capture(opened, thread_label, flag, tx))
      .map_err(|e| CameraError::Unavailable(format!("{label}: {e}")))?;

    self.frames = Some(rx);
    self.running = Some(running);
    let id = self.next_track;
    self.next_track += 1;
    Ok(DeviceTrack { id, label, facing })
  }

  async fn read(&mut self, _track: &DeviceTrack) -> Result<Option<PixelBuffer>, CameraError> {
    let Some(frames) = self.frames.as_mut() else {
      return Ok(None);
    };
    match frames.recv().await {
      Some(frame) => frame.map(Some),
      None => Ok(None),
    }
  }

  fn stop(&mut self, track: DeviceTrack) {
    if let Some(running) = self.running.take() {
      running.store(false, Ordering::Release);
    }
    // Dropping the receiver also unblocks a thread waiting to hand over a frame.
    self.frames = None;
    debug!(track = track.id, "camera stopped");
  }
}
