//! Wire codec for the plugin/core polling protocol.
//!
//! Every request starts with a single opcode byte:
//! - `'s'` settings: three i32 LE (`key_len`, `value_len`, `value_type`)
//!   followed by `key_len + value_len` bytes
//! - `'i'` image request: no body
//!
//! The only reply is the answer to `'i'`: an i32 LE status, and for
//! status 1 an i32 LE length plus that many payload bytes.

pub mod codec;
pub mod error;
pub mod opcode;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_image_reply, decode_request, decode_settings, encode_image_reply, encode_request,
    encode_settings, ImageReply, Request, SettingsHeader, SettingsMessage, WireConfig,
    DEFAULT_MAX_IMAGE_SIZE, DEFAULT_MAX_SETTINGS_SIZE, MAX_WIRE_LEN, SETTINGS_HEADER_SIZE,
};
pub use error::{Result, Violation, WireError};
pub use opcode::{status_name, Opcode, STATUS_FRESH, STATUS_NO_DATA, STATUS_UNCHANGED};
pub use reader::WireReader;
pub use writer::WireWriter;
