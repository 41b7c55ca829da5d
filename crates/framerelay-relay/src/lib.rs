//! Latest-frame hand-off between a frame producer and a polling core.
//!
//! A [`Producer`] publishes encoded frames into a shared [`FrameSlot`] at a
//! fixed rate. A [`Responder`] answers the core's image requests from that
//! slot and forwards settings messages to a [`SettingsHook`]. The two run on
//! separate threads and only ever meet inside the slot.

pub mod connector;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod hook;
pub mod poller;
pub mod producer;
pub mod responder;
pub mod slot;
pub mod source;

pub use connector::{connect, connect_with_config};
pub use encoder::{Encoding, FrameEncoder, JpegEncoder, PnmEncoder, RawEncoder, DEFAULT_JPEG_QUALITY};
pub use error::{RelayError, Result};
pub use frame::{Frame, Orientation};
pub use hook::{LogSettingsHook, SettingsHook};
pub use poller::{CoreListener, CorePoller};
pub use producer::{Producer, ProducerConfig};
pub use responder::{Responder, ResponderStats};
pub use slot::{FrameSlot, Outcome, SlotSnapshot};
pub use source::{FrameSource, PatternSource, RawFileSource, SourceFrame};
