/// Ways a peer can break the protocol.
///
/// None of these are recoverable: the connection is closed once one is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// The opcode byte is neither `'s'` nor `'i'`.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// A length field was negative.
    #[error("negative {field} ({value})")]
    NegativeLength { field: &'static str, value: i32 },

    /// A length field exceeds the configured limit.
    #[error("{field} of {size} bytes exceeds limit of {max}")]
    LengthExceedsLimit {
        field: &'static str,
        size: usize,
        max: usize,
    },

    /// The peer closed the connection in the middle of a message.
    #[error("connection closed mid-message ({buffered} bytes buffered)")]
    Truncated { buffered: usize },

    /// The image reply status is not 0, 1 or 2.
    #[error("invalid image reply status {0}")]
    InvalidStatus(i32),
}

/// Errors that can occur during wire encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The peer sent bytes that do not follow the protocol.
    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] Violation),

    /// A payload is too large to be encoded.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed cleanly between messages.
    #[error("connection closed")]
    ConnectionClosed,
}

impl WireError {
    /// Whether this error was caused by malformed peer input.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, WireError::ProtocolViolation(_))
    }
}

impl From<framerelay_transport::TransportError> for WireError {
    fn from(err: framerelay_transport::TransportError) -> Self {
        use framerelay_transport::TransportError;
        match err {
            TransportError::Io(io) | TransportError::Accept(io) => WireError::Io(io),
            TransportError::Bind { source, .. }
            | TransportError::Connect { source, .. }
            | TransportError::Resolve { source, .. } => WireError::Io(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
