use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::RelayStream;

/// TCP endpoint for the plugin/core connection.
///
/// The core side binds and accepts; the plugin side uses [`TcpEndpoint::connect`]
/// once at startup. There is no reconnect logic at this layer.
pub struct TcpEndpoint {
    listener: TcpListener,
    addr: SocketAddr,
}

impl TcpEndpoint {
    /// Bind and listen on `addr` (e.g. `"127.0.0.1:7000"`, port `0` picks a free port).
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
        let local = listener.local_addr().map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;

        info!(addr = %local, "listening for plugin connection");

        Ok(Self {
            listener,
            addr: local,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<RelayStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        RelayStream::from_tcp(stream)
    }

    /// Connect to a listening core at `host:port` (blocking).
    pub fn connect(host: &str, port: u16) -> Result<RelayStream> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect((host, port)).map_err(|e| TransportError::Connect {
            addr: addr.clone(),
            source: e,
        })?;
        debug!(%addr, "connected to core");
        RelayStream::from_tcp(stream)
    }

    /// Connect with a bound on how long each resolved address may take.
    pub fn connect_timeout(host: &str, port: u16, timeout: Duration) -> Result<RelayStream> {
        let addr = format!("{host}:{port}");
        let candidates: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| TransportError::Resolve {
                addr: addr.clone(),
                source: e,
            })?
            .collect();

        let mut last_err = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, timeout) {
                Ok(stream) => {
                    debug!(%addr, resolved = %candidate, "connected to core");
                    return RelayStream::from_tcp(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(TransportError::Connect {
            addr,
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    "address resolved to no candidates",
                )
            }),
        })
    }

    /// The address this endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}
