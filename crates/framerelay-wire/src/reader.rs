use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use framerelay_transport::RelayStream;

use crate::codec::{decode_image_reply, decode_request, ImageReply, Request, WireConfig};
use crate::error::{Result, Violation, WireError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Reads complete protocol messages from any `Read` stream.
///
/// Handles partial reads internally. The plugin side calls
/// [`WireReader::read_request`]; the core side calls
/// [`WireReader::read_image_reply`].
pub struct WireReader<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Read> WireReader<T> {
    /// Create a new reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new reader with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete request from the core (blocking).
    ///
    /// Returns `Err(WireError::ConnectionClosed)` when EOF is reached between
    /// requests and a `Truncated` protocol violation when EOF cuts one short.
    pub fn read_request(&mut self) -> Result<Request> {
        let max = self.config.max_settings_size;
        self.read_with(|buf| decode_request(buf, max))
    }

    /// Read the next complete image reply from the plugin (blocking).
    pub fn read_image_reply(&mut self) -> Result<ImageReply> {
        let max = self.config.max_image_size;
        self.read_with(|buf| decode_image_reply(buf, max))
    }

    fn read_with<M>(
        &mut self,
        mut decode: impl FnMut(&mut BytesMut) -> Result<Option<M>>,
    ) -> Result<M> {
        loop {
            if let Some(message) = decode(&mut self.buf)? {
                return Ok(message);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Err(WireError::ConnectionClosed);
                }
                return Err(Violation::Truncated {
                    buffered: self.buf.len(),
                }
                .into());
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Number of bytes received but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

impl WireReader<RelayStream> {
    /// Create a reader for `RelayStream` and apply read timeout from config.
    pub fn with_config_relay(inner: RelayStream, config: WireConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
