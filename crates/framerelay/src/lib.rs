//! Serve a continuously refreshed video frame to a polling core.
//!
//! A producer thread keeps the latest encoded frame in a single-slot buffer;
//! a responder answers the core's image requests from that slot over one TCP
//! connection and forwards the settings the core pushes.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP endpoint and stream
//! - [`wire`]: opcode/settings/image-reply codec
//! - [`relay`]: frame slot, sources, encoders, producer, responder, core-side poller

/// Re-export transport types.
pub mod transport {
    pub use framerelay_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use framerelay_wire::*;
}

/// Re-export relay types.
pub mod relay {
    pub use framerelay_relay::*;
}
