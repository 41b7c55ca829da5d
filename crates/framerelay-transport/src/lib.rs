//! TCP transport for the plugin/core connection.
//!
//! The core listens on a fixed host/port and the plugin connects once at
//! startup. This is the lowest layer of framerelay. Everything else builds on
//! top of the [`RelayStream`] type provided here.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::RelayStream;
pub use tcp::TcpEndpoint;
