//! Raw frames captured from the video surface.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
  /// One byte of luminance per pixel.
  Luma8,
  /// Four bytes per pixel, red first.
  Rgba8,
  /// Packed 4:2:2 `Y0 U Y1 V`, as most USB cameras deliver it.
  Yuyv422,
}

impl PixelFormat {
  pub fn bytes_per_pixel(self) -> usize {
    match self {
      Self::Luma8 => 1,
      Self::Rgba8 => 4,
      Self::Yuyv422 => 2,
    }
  }
}

/// One captured frame. Dimensions are not validated on construction: a
/// surface that is not rendering yet reports `0 × 0`, and a torn buffer may
/// not match its dimensions. Consumers check [`PixelBuffer::is_well_formed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
  pub width:  usize,
  pub height: usize,
  pub format: PixelFormat,
  pub data:   Vec<u8>,
}

impl PixelBuffer {
  pub fn luma(width: usize, height: usize, data: Vec<u8>) -> Self {
    Self { width, height, format: PixelFormat::Luma8, data }
  }

  pub fn rgba(width: usize, height: usize, data: Vec<u8>) -> Self {
    Self { width, height, format: PixelFormat::Rgba8, data }
  }

  /// A frame with no pixels, as produced before the surface has a size.
  pub fn empty() -> Self { Self::luma(0, 0, Vec::new()) }

  pub fn is_empty(&self) -> bool { self.width == 0 || self.height == 0 }

  /// Non-empty, and the buffer holds exactly `width × height` pixels.
  pub fn is_well_formed(&self) -> bool {
    !self.is_empty()
      && self
        .width
        .checked_mul(self.height)
        .and_then(|px| px.checked_mul(self.format.bytes_per_pixel()))
        == Some(self.data.len())
  }

  /// Luminance plane of the frame. Callers must check
  /// [`is_well_formed`](Self::is_well_formed) first.
  pub fn to_luma(&self) -> Vec<u8> {
    match self.format {
      PixelFormat::Luma8 => self.data.clone(),
      PixelFormat::Rgba8 => self
        .data
        .chunks_exact(4)
        .map(|px| {
          let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
          ((77 * r + 150 * g + 29 * b) >> 8) as u8
        })
        .collect(),
      PixelFormat::Yuyv422 => self.data.iter().step_by(2).copied().collect(),
    }
  }
}
