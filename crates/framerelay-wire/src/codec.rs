use std::borrow::Cow;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, Violation, WireError};
use crate::opcode::{Opcode, STATUS_FRESH, STATUS_NO_DATA, STATUS_UNCHANGED};

/// Settings header: key length (4) + value length (4) + value type (4) = 12 bytes.
pub const SETTINGS_HEADER_SIZE: usize = 12;

/// Status (4) + length (4) preceding a fresh image payload.
const IMAGE_HEADER_SIZE: usize = 8;

const STATUS_SIZE: usize = 4;

/// Default cap on `key_len + value_len` of a settings message: 1 MiB.
pub const DEFAULT_MAX_SETTINGS_SIZE: usize = 1024 * 1024;

/// Default cap on an image payload: 64 MiB.
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 64 * 1024 * 1024;

/// Largest length representable in an i32 length field.
pub const MAX_WIRE_LEN: usize = i32::MAX as usize;

/// An out-of-band settings message pushed by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsMessage {
    pub key: Bytes,
    pub value: Bytes,
    /// Opaque type tag interpreted by the settings consumer.
    pub value_type: i32,
}

impl SettingsMessage {
    /// Create a new settings message.
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>, value_type: i32) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            value_type,
        }
    }

    /// Key decoded as UTF-8, with invalid sequences replaced.
    pub fn key_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    /// Value decoded as UTF-8, with invalid sequences replaced.
    pub fn value_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    /// The wire size of this message including its opcode byte.
    pub fn wire_size(&self) -> usize {
        1 + SETTINGS_HEADER_SIZE + self.key.len() + self.value.len()
    }
}

/// The fixed-size part of a settings message, as read off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsHeader {
    pub key_len: i32,
    pub value_len: i32,
    pub value_type: i32,
}

impl SettingsHeader {
    /// Parse the 12 header bytes.
    pub fn parse(bytes: &[u8; SETTINGS_HEADER_SIZE]) -> Self {
        let field = |i: usize| i32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            key_len: field(0),
            value_len: field(4),
            value_type: field(8),
        }
    }

    /// Validate the declared lengths and return the body size in bytes.
    pub fn body_len(&self, max_settings_size: usize) -> Result<usize> {
        let key_len = non_negative("settings key length", self.key_len)?;
        let value_len = non_negative("settings value length", self.value_len)?;
        let body = key_len + value_len;
        if body > max_settings_size {
            return Err(Violation::LengthExceedsLimit {
                field: "settings body",
                size: body,
                max: max_settings_size,
            }
            .into());
        }
        Ok(body)
    }
}

/// A decoded request from the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `'s'`: forward to the settings hook, no reply.
    Settings(SettingsMessage),
    /// `'i'`: reply with the current slot state.
    Image,
}

impl Request {
    /// The opcode this request is sent with.
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::Settings(_) => Opcode::Settings,
            Request::Image => Opcode::ImageRequest,
        }
    }
}

/// The plugin's answer to an image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReply {
    /// Status 0: no frame was ever published.
    NoData,
    /// Status 1: a frame not yet delivered.
    Fresh(Bytes),
    /// Status 2: the last frame was already delivered.
    Unchanged,
}

impl ImageReply {
    /// The status code sent on the wire.
    pub fn status(&self) -> i32 {
        match self {
            ImageReply::NoData => STATUS_NO_DATA,
            ImageReply::Fresh(_) => STATUS_FRESH,
            ImageReply::Unchanged => STATUS_UNCHANGED,
        }
    }

    /// The payload, if this reply carries one.
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            ImageReply::Fresh(payload) => Some(payload),
            _ => None,
        }
    }

    /// The total wire size of this reply.
    pub fn wire_size(&self) -> usize {
        match self {
            ImageReply::Fresh(payload) => IMAGE_HEADER_SIZE + payload.len(),
            _ => STATUS_SIZE,
        }
    }
}

/// Encode a settings message body (without the opcode byte).
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────┬────────────┬───────────┬─────────────┐
/// │ key_len    │ value_len  │ value_type │ key       │ value       │
/// │ (4B LE)    │ (4B LE)    │ (4B LE)    │ (key_len) │ (value_len) │
/// └────────────┴────────────┴────────────┴───────────┴─────────────┘
/// ```
pub fn encode_settings(message: &SettingsMessage, dst: &mut BytesMut) -> Result<()> {
    let key_len = wire_len(message.key.len())?;
    let value_len = wire_len(message.value.len())?;
    wire_len(message.key.len() + message.value.len())?;

    dst.reserve(SETTINGS_HEADER_SIZE + message.key.len() + message.value.len());
    dst.put_i32_le(key_len);
    dst.put_i32_le(value_len);
    dst.put_i32_le(message.value_type);
    dst.put_slice(&message.key);
    dst.put_slice(&message.value);
    Ok(())
}

/// Decode a settings message body (the opcode byte already consumed).
///
/// Returns `Ok(None)` if the buffer doesn't contain the complete message yet.
/// Length fields are validated as soon as the header is available.
pub fn decode_settings(src: &mut BytesMut, max_settings_size: usize) -> Result<Option<SettingsMessage>> {
    let Some(header) = peek_settings_header(src, 0) else {
        return Ok(None);
    };
    let body = header.body_len(max_settings_size)?;
    if src.len() < SETTINGS_HEADER_SIZE + body {
        return Ok(None);
    }

    src.advance(SETTINGS_HEADER_SIZE);
    Ok(Some(split_settings(src, header)))
}

/// Encode a request including its opcode byte.
pub fn encode_request(request: &Request, dst: &mut BytesMut) -> Result<()> {
    match request {
        Request::Image => {
            dst.put_u8(Opcode::ImageRequest.as_byte());
            Ok(())
        }
        Request::Settings(message) => {
            let mark = dst.len();
            dst.put_u8(Opcode::Settings.as_byte());
            if let Err(err) = encode_settings(message, dst) {
                dst.truncate(mark);
                return Err(err);
            }
            Ok(())
        }
    }
}

/// Decode one request from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete request yet.
/// On success, consumes the request bytes from the buffer.
pub fn decode_request(src: &mut BytesMut, max_settings_size: usize) -> Result<Option<Request>> {
    let Some(&byte) = src.first() else {
        return Ok(None);
    };

    match Opcode::try_from(byte)? {
        Opcode::ImageRequest => {
            src.advance(1);
            Ok(Some(Request::Image))
        }
        Opcode::Settings => {
            let Some(header) = peek_settings_header(src, 1) else {
                return Ok(None);
            };
            let body = header.body_len(max_settings_size)?;
            if src.len() < 1 + SETTINGS_HEADER_SIZE + body {
                return Ok(None);
            }

            src.advance(1 + SETTINGS_HEADER_SIZE);
            Ok(Some(Request::Settings(split_settings(src, header))))
        }
    }
}

/// Encode an image reply.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────────────────────────────┐
/// │ status     │ only when status == 1:             │
/// │ (4B LE)    │ length (4B LE) + payload (length)  │
/// └────────────┴────────────────────────────────────┘
/// ```
pub fn encode_image_reply(reply: &ImageReply, dst: &mut BytesMut) -> Result<()> {
    match reply {
        ImageReply::Fresh(payload) => {
            let len = wire_len(payload.len())?;
            dst.reserve(IMAGE_HEADER_SIZE + payload.len());
            dst.put_i32_le(STATUS_FRESH);
            dst.put_i32_le(len);
            dst.put_slice(payload);
        }
        other => dst.put_i32_le(other.status()),
    }
    Ok(())
}

/// Decode an image reply from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete reply yet.
pub fn decode_image_reply(src: &mut BytesMut, max_image_size: usize) -> Result<Option<ImageReply>> {
    if src.len() < STATUS_SIZE {
        return Ok(None);
    }

    let status = read_i32(src, 0);
    match status {
        STATUS_NO_DATA => {
            src.advance(STATUS_SIZE);
            Ok(Some(ImageReply::NoData))
        }
        STATUS_UNCHANGED => {
            src.advance(STATUS_SIZE);
            Ok(Some(ImageReply::Unchanged))
        }
        STATUS_FRESH => {
            if src.len() < IMAGE_HEADER_SIZE {
                return Ok(None);
            }
            let len = non_negative("image length", read_i32(src, STATUS_SIZE))?;
            if len > max_image_size {
                return Err(Violation::LengthExceedsLimit {
                    field: "image payload",
                    size: len,
                    max: max_image_size,
                }
                .into());
            }
            if src.len() < IMAGE_HEADER_SIZE + len {
                return Ok(None);
            }

            src.advance(IMAGE_HEADER_SIZE);
            Ok(Some(ImageReply::Fresh(src.split_to(len).freeze())))
        }
        other => Err(Violation::InvalidStatus(other).into()),
    }
}

/// Limits and timeouts applied by [`crate::WireReader`] and [`crate::WireWriter`].
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Maximum `key_len + value_len` of an inbound settings message. Default: 1 MiB.
    pub max_settings_size: usize,
    /// Maximum image payload accepted when decoding a reply. Default: 64 MiB.
    pub max_image_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_settings_size: DEFAULT_MAX_SETTINGS_SIZE,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

fn peek_settings_header(src: &BytesMut, offset: usize) -> Option<SettingsHeader> {
    let raw = src.get(offset..offset + SETTINGS_HEADER_SIZE)?;
    let raw: &[u8; SETTINGS_HEADER_SIZE] = raw.try_into().ok()?;
    Some(SettingsHeader::parse(raw))
}

// Caller has validated the header and that the whole body is buffered.
fn split_settings(src: &mut BytesMut, header: SettingsHeader) -> SettingsMessage {
    let key = src.split_to(header.key_len as usize).freeze();
    let value = src.split_to(header.value_len as usize).freeze();
    SettingsMessage {
        key,
        value,
        value_type: header.value_type,
    }
}

fn read_i32(src: &BytesMut, offset: usize) -> i32 {
    i32::from_le_bytes([src[offset], src[offset + 1], src[offset + 2], src[offset + 3]])
}

fn non_negative(field: &'static str, value: i32) -> Result<usize> {
    usize::try_from(value).map_err(|_| Violation::NegativeLength { field, value }.into())
}

fn wire_len(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| WireError::PayloadTooLarge {
        size: len,
        max: MAX_WIRE_LEN,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_roundtrip() {
        let message = SettingsMessage::new(&b"mode"[..], &b"auto"[..], 3);
        let mut buf = BytesMut::new();

        encode_settings(&message, &mut buf).unwrap();
        assert_eq!(buf.len(), SETTINGS_HEADER_SIZE + 8);

        let decoded = decode_settings(&mut buf, DEFAULT_MAX_SETTINGS_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.key.as_ref(), b"mode");
        assert_eq!(decoded.value.as_ref(), b"auto");
        assert_eq!(decoded.value_type, 3);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_settings_layout_is_little_endian() {
        let message = SettingsMessage::new(&b"fps"[..], &b"30"[..], 0);
        let mut buf = BytesMut::new();
        encode_request(&Request::Settings(message.clone()), &mut buf).unwrap();

        let mut expected = vec![b's'];
        expected.extend_from_slice(&3i32.to_le_bytes());
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(&0i32.to_le_bytes());
        expected.extend_from_slice(b"fps30");
        assert_eq!(buf.as_ref(), expected.as_slice());
        assert_eq!(message.wire_size(), expected.len());
    }

    #[test]
    fn test_decode_request_image() {
        let mut buf = BytesMut::from(&b"i"[..]);
        let request = decode_request(&mut buf, DEFAULT_MAX_SETTINGS_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(request, Request::Image);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_request_incomplete_header() {
        let mut buf = BytesMut::from(&[b's', 0x03, 0x00][..]);
        let result = decode_request(&mut buf, DEFAULT_MAX_SETTINGS_SIZE).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 3, "nothing consumed until complete");
    }

    #[test]
    fn test_decode_request_incomplete_body() {
        let mut buf = BytesMut::new();
        encode_request(
            &Request::Settings(SettingsMessage::new(&b"key"[..], &b"value"[..], 1)),
            &mut buf,
        )
        .unwrap();
        buf.truncate(1 + SETTINGS_HEADER_SIZE + 4);

        let result = decode_request(&mut buf, DEFAULT_MAX_SETTINGS_SIZE).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_request_unknown_opcode() {
        let mut buf = BytesMut::from(&b"x"[..]);
        let result = decode_request(&mut buf, DEFAULT_MAX_SETTINGS_SIZE);
        assert!(matches!(
            result,
            Err(WireError::ProtocolViolation(Violation::UnknownOpcode(b'x')))
        ));
    }

    #[test]
    fn test_decode_settings_negative_length() {
        let mut buf = BytesMut::new();
        buf.put_u8(b's');
        buf.put_i32_le(-1);
        buf.put_i32_le(0);
        buf.put_i32_le(0);

        let result = decode_request(&mut buf, DEFAULT_MAX_SETTINGS_SIZE);
        assert!(matches!(
            result,
            Err(WireError::ProtocolViolation(Violation::NegativeLength { value: -1, .. }))
        ));
    }

    #[test]
    fn test_decode_settings_exceeds_limit_before_body_arrives() {
        let mut buf = BytesMut::new();
        buf.put_u8(b's');
        buf.put_i32_le(1024);
        buf.put_i32_le(1024);
        buf.put_i32_le(0);

        let result = decode_request(&mut buf, 1024);
        assert!(matches!(
            result,
            Err(WireError::ProtocolViolation(Violation::LengthExceedsLimit { size: 2048, .. }))
        ));
    }

    #[test]
    fn test_image_reply_fresh_layout() {
        let mut buf = BytesMut::new();
        let reply = ImageReply::Fresh(Bytes::from_static(&[1, 2, 3, 4, 5]));
        encode_image_reply(&reply, &mut buf).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.extend_from_slice(&5i32.to_le_bytes());
        expected.extend_from_slice(&[1, 2, 3, 4, 5]);
        assert_eq!(buf.as_ref(), expected.as_slice());
        assert_eq!(buf.len(), 12);
        assert_eq!(reply.wire_size(), 12);
    }

    #[test]
    fn test_image_reply_status_only() {
        let mut buf = BytesMut::new();
        encode_image_reply(&ImageReply::NoData, &mut buf).unwrap();
        encode_image_reply(&ImageReply::Unchanged, &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0, 0, 0, 0, 2, 0, 0, 0]);

        let first = decode_image_reply(&mut buf, DEFAULT_MAX_IMAGE_SIZE)
            .unwrap()
            .unwrap();
        let second = decode_image_reply(&mut buf, DEFAULT_MAX_IMAGE_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(first, ImageReply::NoData);
        assert_eq!(second, ImageReply::Unchanged);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_image_reply_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_image_reply(&ImageReply::Fresh(Bytes::from_static(b"frame")), &mut buf).unwrap();
        buf.truncate(IMAGE_HEADER_SIZE + 2);

        let result = decode_image_reply(&mut buf, DEFAULT_MAX_IMAGE_SIZE).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_image_reply_invalid_status() {
        let mut buf = BytesMut::new();
        buf.put_i32_le(9);
        let result = decode_image_reply(&mut buf, DEFAULT_MAX_IMAGE_SIZE);
        assert!(matches!(
            result,
            Err(WireError::ProtocolViolation(Violation::InvalidStatus(9)))
        ));
    }

    #[test]
    fn test_decode_image_reply_too_large() {
        let mut buf = BytesMut::new();
        buf.put_i32_le(STATUS_FRESH);
        buf.put_i32_le(4096);

        let result = decode_image_reply(&mut buf, 1024);
        assert!(matches!(
            result,
            Err(WireError::ProtocolViolation(Violation::LengthExceedsLimit { .. }))
        ));
    }

    #[test]
    fn test_empty_key_and_value() {
        let mut buf = BytesMut::new();
        encode_request(
            &Request::Settings(SettingsMessage::new(Bytes::new(), Bytes::new(), 7)),
            &mut buf,
        )
        .unwrap();

        let request = decode_request(&mut buf, DEFAULT_MAX_SETTINGS_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(
            request,
            Request::Settings(SettingsMessage::new(Bytes::new(), Bytes::new(), 7))
        );
    }

    #[test]
    fn test_pipelined_requests() {
        let mut buf = BytesMut::new();
        encode_request(&Request::Image, &mut buf).unwrap();
        encode_request(
            &Request::Settings(SettingsMessage::new(&b"k"[..], &b"v"[..], 2)),
            &mut buf,
        )
        .unwrap();
        encode_request(&Request::Image, &mut buf).unwrap();

        let max = DEFAULT_MAX_SETTINGS_SIZE;
        assert_eq!(decode_request(&mut buf, max).unwrap(), Some(Request::Image));
        assert!(matches!(
            decode_request(&mut buf, max).unwrap(),
            Some(Request::Settings(_))
        ));
        assert_eq!(decode_request(&mut buf, max).unwrap(), Some(Request::Image));
        assert_eq!(decode_request(&mut buf, max).unwrap(), None);
    }

    #[test]
    fn test_lossy_accessors() {
        let message = SettingsMessage::new(&b"fps"[..], vec![0xFF, b'3'], 0);
        assert_eq!(message.key_lossy(), "fps");
        assert_eq!(message.value_lossy(), "\u{FFFD}3");
    }
}
