use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::error::{RelayError, Result};
use crate::frame::{frame_len, Frame};

/// What a [`FrameSource`] yields on each read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFrame {
    Frame(Frame),
    /// The media is exhausted; call [`FrameSource::restart`] to loop.
    EndOfStream,
}

/// A finite stream of raw frames that can be replayed from the start.
///
/// Opening is the constructor's job so that an unusable source is reported
/// before the producer thread starts.
pub trait FrameSource: Send {
    /// Read the next frame (blocking).
    fn read_frame(&mut self) -> Result<SourceFrame>;

    /// Rewind to the first frame.
    fn restart(&mut self) -> Result<()>;

    /// Short description for logs.
    fn describe(&self) -> String {
        "frame source".to_string()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_frame(&mut self) -> Result<SourceFrame> {
        (**self).read_frame()
    }

    fn restart(&mut self) -> Result<()> {
        (**self).restart()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Reads fixed-size raw frames back to back from a file.
///
/// A trailing partial frame is treated as end of stream.
pub struct RawFileSource {
    path: PathBuf,
    reader: BufReader<File>,
    width: u32,
    height: u32,
    channels: u8,
    frame_len: usize,
}

impl RawFileSource {
    /// Open `path` as a sequence of `width`x`height`x`channels` frames.
    ///
    /// Fails if the file cannot be opened or holds less than one frame.
    pub fn open(path: impl AsRef<Path>, width: u32, height: u32, channels: u8) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_err = |reason: String| RelayError::SourceOpen {
            name: path.display().to_string(),
            reason,
        };

        let frame_len = frame_len(width, height, channels)?;
        let file = File::open(&path).map_err(|e| open_err(e.to_string()))?;
        let file_len = file.metadata().map_err(|e| open_err(e.to_string()))?.len();
        if file_len < frame_len as u64 {
            return Err(open_err(format!(
                "file is {file_len} bytes, smaller than one {frame_len} byte frame"
            )));
        }

        debug!(
            path = %path.display(),
            frames = file_len / frame_len as u64,
            "opened raw frame file"
        );

        Ok(Self {
            path,
            reader: BufReader::new(file),
            width,
            height,
            channels,
            frame_len,
        })
    }
}

impl FrameSource for RawFileSource {
    fn read_frame(&mut self) -> Result<SourceFrame> {
        let mut data = vec![0u8; self.frame_len];
        let mut filled = 0usize;
        while filled < data.len() {
            match self.reader.read(&mut data[filled..]) {
                Ok(0) => return Ok(SourceFrame::EndOfStream),
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(RelayError::Source(format!(
                        "read {} failed: {err}",
                        self.path.display()
                    )))
                }
            }
        }

        Frame::new(self.width, self.height, self.channels, data).map(SourceFrame::Frame)
    }

    fn restart(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0)).map_err(|err| {
            RelayError::Source(format!("rewind {} failed: {err}", self.path.display()))
        })?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("raw file {}", self.path.display())
    }
}

/// Synthetic moving gradient, useful without a capture device.
pub struct PatternSource {
    width: u32,
    height: u32,
    channels: u8,
    frames_per_loop: u32,
    next: u32,
}

impl PatternSource {
    /// Create a pattern of `frames_per_loop` frames followed by end of stream.
    pub fn new(width: u32, height: u32, channels: u8, frames_per_loop: u32) -> Result<Self> {
        frame_len(width, height, channels)?;
        if frames_per_loop == 0 {
            return Err(RelayError::InvalidConfig(
                "pattern needs at least one frame per loop".to_string(),
            ));
        }
        Ok(Self {
            width,
            height,
            channels,
            frames_per_loop,
            next: 0,
        })
    }

    fn render(&self, index: u32) -> Bytes {
        let (w, h) = (self.width as usize, self.height as usize);
        let channels = usize::from(self.channels);
        let shift = (index as usize * 256) / self.frames_per_loop as usize;
        let mut data = Vec::with_capacity(w * h * channels);

        for row in 0..h {
            for col in 0..w {
                let base = (col * 256 / w + shift) % 256;
                for channel in 0..channels {
                    let value = (base + channel * 85 + row * 256 / h / 4) % 256;
                    data.push(value as u8);
                }
            }
        }
        Bytes::from(data)
    }
}

impl FrameSource for PatternSource {
    fn read_frame(&mut self) -> Result<SourceFrame> {
        if self.next >= self.frames_per_loop {
            return Ok(SourceFrame::EndOfStream);
        }
        let data = self.render(self.next);
        self.next += 1;
        Frame::new(self.width, self.height, self.channels, data).map(SourceFrame::Frame)
    }

    fn restart(&mut self) -> Result<()> {
        self.next = 0;
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "pattern {}x{}x{} ({} frames)",
            self.width, self.height, self.channels, self.frames_per_loop
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(tag: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "framerelay-source-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frames.raw");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn expect_frame(source: &mut dyn FrameSource) -> Frame {
        match source.read_frame().unwrap() {
            SourceFrame::Frame(frame) => frame,
            SourceFrame::EndOfStream => panic!("expected a frame"),
        }
    }

    #[test]
    fn raw_file_reads_frames_then_end_of_stream() {
        // Two 2x1 grayscale frames and a trailing partial byte.
        let path = temp_file("read", &[1, 2, 3, 4, 5]);
        let mut source = RawFileSource::open(&path, 2, 1, 1).unwrap();

        assert_eq!(expect_frame(&mut source).data().as_ref(), &[1, 2]);
        assert_eq!(expect_frame(&mut source).data().as_ref(), &[3, 4]);
        assert_eq!(source.read_frame().unwrap(), SourceFrame::EndOfStream);

        source.restart().unwrap();
        assert_eq!(expect_frame(&mut source).data().as_ref(), &[1, 2]);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn raw_file_missing_is_open_error() {
        let result = RawFileSource::open("/nonexistent/framerelay/frames.raw", 2, 2, 3);
        assert!(matches!(result, Err(RelayError::SourceOpen { .. })));
    }

    #[test]
    fn raw_file_shorter_than_one_frame_is_open_error() {
        let path = temp_file("short", &[0u8; 5]);
        let result = RawFileSource::open(&path, 2, 2, 3);
        assert!(matches!(result, Err(RelayError::SourceOpen { .. })));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn pattern_loops() {
        let mut source = PatternSource::new(4, 2, 3, 2).unwrap();
        let first = expect_frame(&mut source);
        let second = expect_frame(&mut source);
        assert_ne!(first, second, "pattern should move between frames");
        assert_eq!(first.data().len(), 4 * 2 * 3);
        assert_eq!(source.read_frame().unwrap(), SourceFrame::EndOfStream);

        source.restart().unwrap();
        assert_eq!(expect_frame(&mut source), first);
    }

    #[test]
    fn pattern_rejects_empty_loop() {
        assert!(matches!(
            PatternSource::new(4, 2, 3, 0),
            Err(RelayError::InvalidConfig(_))
        ));
    }
}
