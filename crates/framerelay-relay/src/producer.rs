use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use framerelay_wire::{DEFAULT_MAX_IMAGE_SIZE, MAX_WIRE_LEN};
use tracing::{debug, info};

use crate::encoder::FrameEncoder;
use crate::error::{RelayError, Result};
use crate::frame::Orientation;
use crate::slot::FrameSlot;
use crate::source::{FrameSource, SourceFrame};

/// Default publish rate.
pub const DEFAULT_FPS: f64 = 30.0;

/// Producer behavior config.
#[derive(Debug, Clone, Copy)]
pub struct ProducerConfig {
    /// Target frames per second. The producer sleeps `1 / fps` after each publish.
    pub fps: f64,
    /// Correction applied before encoding.
    pub orientation: Orientation,
    /// Largest encoded frame that may be published. Default: 64 MiB.
    pub max_frame_size: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            orientation: Orientation::Identity,
            max_frame_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }
}

impl ProducerConfig {
    /// Fixed sleep between publishes.
    pub fn interval(&self) -> Result<Duration> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(RelayError::InvalidConfig(format!(
                "fps must be a positive number, got {}",
                self.fps
            )));
        }
        Duration::try_from_secs_f64(1.0 / self.fps)
            .map_err(|err| RelayError::InvalidConfig(format!("fps {}: {err}", self.fps)))
    }

    fn validated_max_frame_size(&self) -> Result<usize> {
        if self.max_frame_size == 0 || self.max_frame_size > MAX_WIRE_LEN {
            return Err(RelayError::InvalidConfig(format!(
                "max frame size must be between 1 and {MAX_WIRE_LEN} bytes, got {}",
                self.max_frame_size
            )));
        }
        Ok(self.max_frame_size)
    }
}

/// Reads, corrects, encodes and publishes frames at a fixed interval.
///
/// Runs on its own thread and touches the shared [`FrameSlot`] only to
/// publish. End of stream rewinds the source so finite media loops forever.
pub struct Producer<S> {
    source: S,
    encoder: Box<dyn FrameEncoder>,
    slot: Arc<FrameSlot>,
    orientation: Orientation,
    interval: Duration,
    max_frame_size: usize,
    running: Arc<AtomicBool>,
}

impl<S: FrameSource> Producer<S> {
    /// Create a producer publishing into `slot`.
    pub fn new(
        source: S,
        encoder: Box<dyn FrameEncoder>,
        slot: Arc<FrameSlot>,
        config: ProducerConfig,
    ) -> Result<Self> {
        Ok(Self {
            source,
            encoder,
            slot,
            orientation: config.orientation,
            interval: config.interval()?,
            max_frame_size: config.validated_max_frame_size()?,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Share a stop flag. Clearing it ends [`Producer::run`] at the next iteration.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// Handle to the stop flag.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Publish one frame, restarting the source at end of stream.
    ///
    /// Returns an error if the source yields no frame across a restart, or if
    /// the encoded frame is over `max_frame_size`. Nothing is published then.
    pub fn step(&mut self) -> Result<()> {
        let frame = match self.source.read_frame()? {
            SourceFrame::Frame(frame) => frame,
            SourceFrame::EndOfStream => {
                debug!(source = %self.source.describe(), "end of stream, restarting source");
                self.source.restart()?;
                match self.source.read_frame()? {
                    SourceFrame::Frame(frame) => frame,
                    SourceFrame::EndOfStream => return Err(RelayError::SourceEmpty),
                }
            }
        };

        let frame = frame.oriented(self.orientation);
        // Encode before touching the slot so a slow encoder never blocks a consume.
        let encoded = self.encoder.encode(&frame)?;
        let len = encoded.len();
        if len > self.max_frame_size {
            return Err(RelayError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }
        self.slot.publish(encoded);
        debug!(size = len, "published frame");
        Ok(())
    }

    /// Run until the stop flag is cleared or a step fails.
    pub fn run(&mut self) -> Result<()> {
        info!(
            source = %self.source.describe(),
            interval_ms = self.interval.as_millis() as u64,
            "producer started"
        );

        while self.running.load(Ordering::SeqCst) {
            self.step()?;
            std::thread::sleep(self.interval);
        }

        let snapshot = self.slot.snapshot();
        info!(
            published = snapshot.published,
            delivered = snapshot.delivered,
            dropped = snapshot.dropped(),
            "producer stopped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use bytes::Bytes;

    use super::*;
    use crate::encoder::RawEncoder;
    use crate::frame::Frame;
    use crate::slot::Outcome;

    /// Replays a fixed list of frames, recording restarts.
    struct ScriptedSource {
        frames: Vec<Frame>,
        queue: VecDeque<Frame>,
        restarts: usize,
    }

    impl ScriptedSource {
        fn new(values: &[u8]) -> Self {
            let frames: Vec<Frame> = values
                .iter()
                .map(|v| Frame::new(1, 1, 1, vec![*v]).unwrap())
                .collect();
            Self {
                queue: frames.iter().cloned().collect(),
                frames,
                restarts: 0,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn read_frame(&mut self) -> Result<SourceFrame> {
            Ok(self
                .queue
                .pop_front()
                .map_or(SourceFrame::EndOfStream, SourceFrame::Frame))
        }

        fn restart(&mut self) -> Result<()> {
            self.restarts += 1;
            self.queue = self.frames.iter().cloned().collect();
            Ok(())
        }
    }

    fn producer(values: &[u8], slot: Arc<FrameSlot>) -> Producer<ScriptedSource> {
        Producer::new(
            ScriptedSource::new(values),
            Box::new(RawEncoder),
            slot,
            ProducerConfig {
                fps: 1000.0,
                ..ProducerConfig::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn step_publishes_each_frame() {
        let slot = Arc::new(FrameSlot::new());
        let mut producer = producer(&[1, 2], Arc::clone(&slot));

        producer.step().unwrap();
        assert_eq!(slot.try_consume(), Outcome::Fresh(Bytes::from_static(&[1])));
        producer.step().unwrap();
        assert_eq!(slot.try_consume(), Outcome::Fresh(Bytes::from_static(&[2])));
    }

    #[test]
    fn end_of_stream_restarts_source() {
        let slot = Arc::new(FrameSlot::new());
        let mut producer = producer(&[7, 8], Arc::clone(&slot));

        for _ in 0..5 {
            producer.step().unwrap();
        }
        // 7 8 | 7 8 | 7
        assert_eq!(producer.source.restarts, 2);
        assert_eq!(slot.peek(), Some(Bytes::from_static(&[7])));
        assert_eq!(slot.snapshot().published, 5);
    }

    #[test]
    fn empty_source_is_fatal() {
        let slot = Arc::new(FrameSlot::new());
        let mut producer = producer(&[], Arc::clone(&slot));

        let err = producer.step().unwrap_err();
        assert!(matches!(err, RelayError::SourceEmpty));
        assert_eq!(slot.try_consume(), Outcome::NoData);
    }

    #[test]
    fn orientation_applied_before_encoding() {
        let slot = Arc::new(FrameSlot::new());
        let frame = Frame::new(3, 1, 1, vec![1u8, 2, 3]).unwrap();
        let source = ScriptedSource {
            queue: VecDeque::from(vec![frame.clone()]),
            frames: vec![frame],
            restarts: 0,
        };
        let mut producer = Producer::new(
            source,
            Box::new(RawEncoder),
            Arc::clone(&slot),
            ProducerConfig {
                fps: 1000.0,
                orientation: Orientation::Rotate180,
                ..ProducerConfig::default()
            },
        )
        .unwrap();

        producer.step().unwrap();
        assert_eq!(slot.peek(), Some(Bytes::from_static(&[3, 2, 1])));
    }

    #[test]
    fn encoder_error_propagates() {
        let slot = Arc::new(FrameSlot::new());
        let failing = |_: &Frame| -> Result<Bytes> { Err(RelayError::Encode("boom".to_string())) };
        let mut producer = Producer::new(
            ScriptedSource::new(&[1]),
            Box::new(failing),
            Arc::clone(&slot),
            ProducerConfig::default(),
        )
        .unwrap();

        assert!(matches!(producer.step(), Err(RelayError::Encode(_))));
        assert_eq!(slot.snapshot().published, 0);
    }

    #[test]
    fn oversized_frame_is_never_published() {
        let slot = Arc::new(FrameSlot::new());
        let mut producer = Producer::new(
            ScriptedSource::new(&[1]),
            Box::new(|_: &Frame| -> Result<Bytes> { Ok(Bytes::from(vec![0u8; 16])) }),
            Arc::clone(&slot),
            ProducerConfig {
                fps: 1000.0,
                max_frame_size: 8,
                ..ProducerConfig::default()
            },
        )
        .unwrap();

        let err = producer.step().unwrap_err();
        assert!(matches!(err, RelayError::FrameTooLarge { size: 16, max: 8 }));
        assert_eq!(slot.snapshot().published, 0);
        assert_eq!(slot.try_consume(), Outcome::NoData);
    }

    #[test]
    fn frame_at_limit_is_published() {
        let slot = Arc::new(FrameSlot::new());
        let mut producer = Producer::new(
            ScriptedSource::new(&[1]),
            Box::new(|_: &Frame| -> Result<Bytes> { Ok(Bytes::from(vec![0u8; 8])) }),
            Arc::clone(&slot),
            ProducerConfig {
                fps: 1000.0,
                max_frame_size: 8,
                ..ProducerConfig::default()
            },
        )
        .unwrap();

        producer.step().unwrap();
        assert!(slot.snapshot().fresh);
    }

    #[test]
    fn invalid_max_frame_size_rejected() {
        for max_frame_size in [0, MAX_WIRE_LEN + 1] {
            let result = Producer::new(
                ScriptedSource::new(&[1]),
                Box::new(RawEncoder),
                Arc::new(FrameSlot::new()),
                ProducerConfig {
                    max_frame_size,
                    ..ProducerConfig::default()
                },
            );
            assert!(matches!(result, Err(RelayError::InvalidConfig(_))));
        }
    }

    #[test]
    fn invalid_fps_rejected() {
        for fps in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let config = ProducerConfig {
                fps,
                ..ProducerConfig::default()
            };
            assert!(matches!(
                config.interval(),
                Err(RelayError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn interval_is_inverse_of_fps() {
        let config = ProducerConfig {
            fps: 4.0,
            ..ProducerConfig::default()
        };
        assert_eq!(config.interval().unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn run_stops_when_flag_cleared() {
        let slot = Arc::new(FrameSlot::new());
        let mut producer = producer(&[1, 2, 3], Arc::clone(&slot));
        let running = producer.running_flag();

        let handle = std::thread::spawn(move || producer.run());
        while slot.snapshot().published < 3 {
            std::thread::yield_now();
        }
        running.store(false, Ordering::SeqCst);

        handle.join().unwrap().unwrap();
        assert!(slot.snapshot().published >= 3);
    }

    #[test]
    fn run_surfaces_fatal_error() {
        let slot = Arc::new(FrameSlot::new());
        let mut producer = producer(&[], slot);
        assert!(matches!(producer.run(), Err(RelayError::SourceEmpty)));
    }
}
