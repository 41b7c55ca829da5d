use bytes::Bytes;

use crate::error::{RelayError, Result};

/// A raw pixel frame as produced by a [`crate::FrameSource`].
///
/// Pixels are stored row-major, `channels` bytes per pixel. The fields are
/// private so `data` always matches the geometry checked by [`Frame::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    channels: u8,
    data: Bytes,
}

impl Frame {
    /// Create a frame, checking that `data` matches the geometry.
    pub fn new(width: u32, height: u32, channels: u8, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let expected = frame_len(width, height, channels)?;
        if data.len() != expected {
            return Err(RelayError::InvalidConfig(format!(
                "frame data is {} bytes, expected {expected} for {width}x{height}x{channels}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 1 (grayscale) or 3 (RGB).
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Pixel bytes, row-major.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * usize::from(self.channels)
    }

    /// Return a copy of this frame with `orientation` applied.
    pub fn oriented(&self, orientation: Orientation) -> Frame {
        let data = match orientation {
            Orientation::Identity => return self.clone(),
            Orientation::Rotate180 => self.remap(|row, col, w, h| (h - 1 - row, w - 1 - col)),
            Orientation::FlipHorizontal => self.remap(|row, col, w, _| (row, w - 1 - col)),
            Orientation::FlipVertical => self.remap(|row, col, _, h| (h - 1 - row, col)),
        };
        Frame {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data,
        }
    }

    // `source` maps a destination (row, col) to the pixel it is copied from.
    fn remap(&self, source: impl Fn(usize, usize, usize, usize) -> (usize, usize)) -> Bytes {
        let (w, h) = (self.width as usize, self.height as usize);
        let px = usize::from(self.channels);
        let stride = self.stride();
        let mut out = Vec::with_capacity(self.data.len());

        for row in 0..h {
            for col in 0..w {
                let (src_row, src_col) = source(row, col, w, h);
                let start = src_row * stride + src_col * px;
                out.extend_from_slice(&self.data[start..start + px]);
            }
        }
        Bytes::from(out)
    }
}

/// Geometric correction applied to every frame before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Identity,
    /// Upside-down capture: reverse rows and columns.
    Rotate180,
    /// Mirror left to right.
    FlipHorizontal,
    /// Mirror top to bottom.
    FlipVertical,
}

/// Number of bytes of a `width`x`height` frame with `channels` bytes per pixel.
pub fn frame_len(width: u32, height: u32, channels: u8) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(RelayError::InvalidConfig(format!(
            "frame geometry must be non-empty, got {width}x{height}"
        )));
    }
    if channels != 1 && channels != 3 {
        return Err(RelayError::InvalidConfig(format!(
            "unsupported channel count {channels} (expected 1 or 3)"
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(usize::from(channels)))
        .ok_or_else(|| RelayError::InvalidConfig("frame size overflows".to_string()))
}
