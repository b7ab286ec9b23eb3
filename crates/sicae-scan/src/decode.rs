//! Frame → payload decoding.
//!
//! Decoding never fails loudly: under continuous scanning most frames hold no
//! symbol, or a blurred one, and that is the normal case. Every failure is
//! folded into `None`.

use tracing::trace;

use crate::frame::PixelBuffer;

/// Extracts a textual payload from a frame. Called off the async runtime,
/// so implementations may take as long as a full-resolution frame needs.
pub trait Decoder: Send + Sync {
  /// Return the payload of the first readable symbol in `frame`, if any.
  fn decode(&self, frame: &PixelBuffer) -> Option<String>;
}

/// QR decoder backed by `rqrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl Decoder for QrDecoder {
  fn decode(&self, frame: &PixelBuffer) -> Option<String> {
    if !frame.is_well_formed() {
      return None;
    }

    let luma = frame.to_luma();
    let width = frame.width;
    let mut prepared =
      rqrr::PreparedImage::prepare_from_greyscale(width, frame.height, |x, y| luma[y * width + x]);

    prepared.detect_grids().into_iter().find_map(|grid| match grid.decode() {
      Ok((_, content)) => Some(content),
      Err(e) => {
        trace!("discarding unreadable grid: {e:?}");
        None
      }
    })
  }
}

impl<F> Decoder for F
where
  F: Fn(&PixelBuffer) -> Option<String> + Send + Sync,
{
  fn decode(&self, frame: &PixelBuffer) -> Option<String> { self(frame) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tests::render_qr;

  #[test]
  fn decodes_rendered_symbol() {
    let frame = render_qr("QR-001");
    assert_eq!(QrDecoder.decode(&frame).as_deref(), Some("QR-001"));
  }

  #[test]
  fn decodes_rgba_frames() {
    let luma = render_qr("ABC123");
    let data = luma.data.iter().flat_map(|&v| [v, v, v, 255]).collect();
    let frame = PixelBuffer::rgba(luma.width, luma.height, data);
    assert_eq!(QrDecoder.decode(&frame).as_deref(), Some("ABC123"));
  }

  #[test]
  fn blank_frame_yields_nothing() {
    let frame = PixelBuffer::luma(64, 64, vec![255; 64 * 64]);
    assert_eq!(QrDecoder.decode(&frame), None);
  }

  #[test]
  fn malformed_frames_yield_nothing() {
    assert_eq!(QrDecoder.decode(&PixelBuffer::empty()), None);
    assert_eq!(QrDecoder.decode(&PixelBuffer::luma(32, 32, vec![0; 10])), None);
  }
}
