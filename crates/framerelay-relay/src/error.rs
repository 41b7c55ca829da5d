/// Errors that can occur in relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] framerelay_transport::TransportError),

    /// Wire-level error.
    #[error("wire error: {0}")]
    Wire(#[from] framerelay_wire::WireError),

    /// The frame source could not be opened.
    #[error("failed to open frame source {name}: {reason}")]
    SourceOpen { name: String, reason: String },

    /// The frame source failed while reading or restarting.
    #[error("frame source error: {0}")]
    Source(String),

    /// The frame source produced no frame between two end-of-stream marks.
    #[error("frame source is empty")]
    SourceEmpty,

    /// A frame could not be encoded.
    #[error("encode failed: {0}")]
    Encode(String),

    /// An encoded frame is larger than the configured limit.
    #[error("encoded frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RelayError {
    /// Whether the core broke the wire protocol.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, RelayError::Wire(err) if err.is_protocol_violation())
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
