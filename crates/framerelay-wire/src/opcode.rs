//! Opcodes and image reply status codes.

use crate::error::Violation;

/// Status: no frame has ever been published. Poll again later.
pub const STATUS_NO_DATA: i32 = 0;

/// Status: a new frame follows.
pub const STATUS_FRESH: i32 = 1;

/// Status: nothing new since the last delivered frame.
pub const STATUS_UNCHANGED: i32 = 2;

/// Single-byte request discriminator sent by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `'s'`: a settings message follows.
    Settings,
    /// `'i'`: the core asks for the current image.
    ImageRequest,
}

impl Opcode {
    /// The byte on the wire.
    pub const fn as_byte(self) -> u8 {
        match self {
            Opcode::Settings => b's',
            Opcode::ImageRequest => b'i',
        }
    }

    /// Human-readable name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::Settings => "settings",
            Opcode::ImageRequest => "image",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = Violation;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b's' => Ok(Opcode::Settings),
            b'i' => Ok(Opcode::ImageRequest),
            other => Err(Violation::UnknownOpcode(other)),
        }
    }
}

/// Returns a human-readable name for an image reply status.
pub fn status_name(status: i32) -> &'static str {
    match status {
        STATUS_NO_DATA => "NO_DATA",
        STATUS_FRESH => "FRESH",
        STATUS_UNCHANGED => "UNCHANGED",
        _ => "INVALID",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_bytes_match_ascii() {
        assert_eq!(Opcode::Settings.as_byte(), b's');
        assert_eq!(Opcode::ImageRequest.as_byte(), b'i');
        assert_eq!(Opcode::try_from(b's'), Ok(Opcode::Settings));
        assert_eq!(Opcode::try_from(b'i'), Ok(Opcode::ImageRequest));
    }

    #[test]
    fn unknown_opcode_is_violation() {
        assert_eq!(Opcode::try_from(b'x'), Err(Violation::UnknownOpcode(b'x')));
        assert_eq!(Opcode::try_from(b'S'), Err(Violation::UnknownOpcode(b'S')));
        assert_eq!(Opcode::try_from(0), Err(Violation::UnknownOpcode(0)));
    }

    #[test]
    fn status_names() {
        assert_eq!(status_name(STATUS_NO_DATA), "NO_DATA");
        assert_eq!(status_name(STATUS_FRESH), "FRESH");
        assert_eq!(status_name(STATUS_UNCHANGED), "UNCHANGED");
        assert_eq!(status_name(7), "INVALID");
    }
}
