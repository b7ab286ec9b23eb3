//! Camera capture → QR decode → debounce pipeline.
//!
//! A [`Scanner`] owns one background task that drives a [`FrameSource`] and a
//! [`Decoder`], filters repeated payloads through a [`Debounce`] window and
//! hands each surviving payload to a single subscriber as a [`ScanEvent`].

mod cancel;

pub mod debounce;
pub mod decode;
pub mod error;
pub mod frame;
pub mod replay;
pub mod scanner;
pub mod source;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use cancel::CancelToken;
pub use debounce::{DEBOUNCE_WINDOW, Debounce};
pub use decode::{Decoder, QrDecoder};
pub use error::CameraError;
pub use frame::{PixelBuffer, PixelFormat};
pub use scanner::{ScanEvent, ScanOrigin, ScanState, Scanner};
pub use source::{CaptureBackend, DeviceTrack, Facing, FrameSource, VideoHandle};
#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Capture;
