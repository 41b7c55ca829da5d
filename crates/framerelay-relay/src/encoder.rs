use bytes::{BufMut, Bytes, BytesMut};
use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::ExtendedColorType;

use crate::error::{RelayError, Result};
use crate::frame::Frame;

/// Turns a raw frame into the bytes published to the core.
///
/// Runs on the producer thread outside the slot lock.
pub trait FrameEncoder: Send {
    fn encode(&mut self, frame: &Frame) -> Result<Bytes>;
}

impl<F> FrameEncoder for F
where
    F: FnMut(&Frame) -> Result<Bytes> + Send,
{
    fn encode(&mut self, frame: &Frame) -> Result<Bytes> {
        self(frame)
    }
}

/// Binary netpbm encoder: `P6` for RGB frames, `P5` for grayscale.
#[derive(Debug, Clone, Copy, Default)]
pub struct PnmEncoder;

impl FrameEncoder for PnmEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<Bytes> {
        let magic = match frame.channels() {
            1 => "P5",
            3 => "P6",
            other => {
                return Err(RelayError::Encode(format!(
                    "netpbm supports 1 or 3 channels, got {other}"
                )))
            }
        };

        let header = format!("{magic}\n{} {}\n255\n", frame.width(), frame.height());
        let mut out = BytesMut::with_capacity(header.len() + frame.data().len());
        out.put_slice(header.as_bytes());
        out.put_slice(frame.data());
        Ok(out.freeze())
    }
}

/// Publishes the pixel bytes unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawEncoder;

impl FrameEncoder for RawEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<Bytes> {
        Ok(frame.data().clone())
    }
}

/// Default JPEG quality, matching OpenCV's `imencode`.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Baseline JPEG encoder for RGB and grayscale frames.
#[derive(Debug, Clone, Copy)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    /// Create an encoder with `quality` in `1..=100`.
    pub fn new(quality: u8) -> Result<Self> {
        if !(1..=100).contains(&quality) {
            return Err(RelayError::InvalidConfig(format!(
                "jpeg quality must be between 1 and 100, got {quality}"
            )));
        }
        Ok(Self { quality })
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl FrameEncoder for JpegEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<Bytes> {
        let color = match frame.channels() {
            1 => ExtendedColorType::L8,
            3 => ExtendedColorType::Rgb8,
            other => {
                return Err(RelayError::Encode(format!(
                    "jpeg supports 1 or 3 channels, got {other}"
                )))
            }
        };

        let mut out = Vec::with_capacity(frame.data().len() / 8);
        ImageJpegEncoder::new_with_quality(&mut out, self.quality)
            .encode(frame.data(), frame.width(), frame.height(), color)
            .map_err(|err| RelayError::Encode(format!("jpeg: {err}")))?;
        Ok(Bytes::from(out))
    }
}

/// Built-in encoder selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Jpeg,
    Pnm,
    Raw,
}

impl Encoding {
    /// Instantiate the encoder with default settings.
    pub fn encoder(self) -> Box<dyn FrameEncoder> {
        match self {
            Encoding::Jpeg => Box::new(JpegEncoder::default()),
            Encoding::Pnm => Box::new(PnmEncoder),
            Encoding::Raw => Box::new(RawEncoder),
        }
    }

    /// File extension for frames in this encoding.
    pub fn extension(self) -> &'static str {
        match self {
            Encoding::Jpeg => "jpg",
            Encoding::Pnm => "pnm",
            Encoding::Raw => "raw",
        }
    }
}
