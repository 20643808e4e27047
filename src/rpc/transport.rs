//! Transport abstraction over any byte-oriented channel.
//!
//! The server is generic over `Transport`, so a new channel (serial line,
//! Unix socket) needs no change to the RPC logic.  [`TcpTransport`] is the
//! one the service ships with.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// Byte-oriented transport channel.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug + core::fmt::Display;

    /// Read up to `buf.len()` bytes into `buf`, blocking until at least one
    /// byte arrives.  Returns 0 once the peer has closed the channel.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Human-readable peer identity for logs.
    fn peer(&self) -> String;
}

/// TCP socket transport.
pub struct TcpTransport {
    stream: TcpStream,
    peer: String,
}

impl TcpTransport {
    /// Wrap an accepted stream.  `idle` bounds how long a silent client
    /// may hold its thread.
    pub fn new(stream: TcpStream, idle: Option<Duration>) -> std::io::Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(idle)?;
        let peer = stream
            .peer_addr()
            .map_or_else(|_| "unknown".to_owned(), |a| a.to_string());
        Ok(Self { stream, peer })
    }
}

impl Transport for TcpTransport {
    type Error = std::io::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.stream.read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        Write::write_all(&mut self.stream, data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Write::flush(&mut self.stream)
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
