//! # Distributed cache client
//!
//! Purpose: issue fire-and-forget SET and best-effort GET requests to a
//! single distributed cache server over the binary wire protocol, with no
//! connection pooling — a fresh TCP connection is opened per operation, as
//! the original `sendcachetoserver` / `getcachefromserver` do.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `DistributedClient` hides connect/encode/send/recv.
//! 2. **Fail As Miss**: any timeout, connect failure, or short response is
//!    indistinguishable from a cache miss — by design (see the failure
//!    taxonomy: cache miss and transient network failure are not
//!    distinguished to callers).
//! 3. **Fire And Forget On SET**: no acknowledgement is read back; SET
//!    never blocks waiting on the server.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use cache_common::limits::{CLIENT_CONNECT_TIMEOUT_MS, CLIENT_RESPONSE_TIMEOUT_MS};
use cache_wire::{decode_get_response, encode_get, encode_set, MAX_SOCKET_BUFFER};

/// Stateless facade over one distributed cache server's address.
#[derive(Debug, Clone)]
pub struct DistributedClient {
    addr: SocketAddr,
}

impl DistributedClient {
    pub fn new(ip: &str, port: u16) -> Option<Self> {
        let addr: SocketAddr = format!("{ip}:{port}").parse().ok()?;
        Some(DistributedClient { addr })
    }

    /// Sends a SET request and returns without waiting for any response.
    /// Silent no-op on connect failure or partial write, matching the
    /// original's unacknowledged SET.
    pub fn set(&self, key: &[u8], data: &[u8], ttl: u32) {
        let Some(mut stream) = self.connect() else {
            tracing::warn!(addr = %self.addr, "distributed set: connect failed, dropping");
            return;
        };

        let mut request = Vec::with_capacity(13 + key.len() + data.len());
        encode_set(key, data, ttl, &mut request);

        if stream.write_all(&request).is_err() {
            tracing::warn!(addr = %self.addr, "distributed set: write failed, dropping");
        }
    }

    /// Sends a GET request and waits up to the response timeout for a
    /// reply. Returns `None` on any timeout, connect failure, or
    /// malformed/short response.
    pub fn get(&self, key: &[u8]) -> Option<(Vec<u8>, u32)> {
        let mut stream = self.connect().or_else(|| {
            tracing::trace!(addr = %self.addr, "distributed get: connect failed, treating as miss");
            None
        })?;

        let mut request = Vec::with_capacity(5 + key.len());
        encode_get(key, &mut request);
        stream.write_all(&request).ok()?;

        stream
            .set_read_timeout(Some(Duration::from_millis(CLIENT_RESPONSE_TIMEOUT_MS)))
            .ok()?;

        let mut buf = [0u8; MAX_SOCKET_BUFFER];
        let read = stream.read(&mut buf).ok().or_else(|| {
            tracing::trace!(addr = %self.addr, "distributed get: response timeout, treating as miss");
            None
        })?;
        if read == 0 {
            return None;
        }

        decode_get_response(&buf[..read]).ok().flatten()
    }

    fn connect(&self) -> Option<TcpStream> {
        let stream = TcpStream::connect_timeout(
            &self.addr,
            Duration::from_millis(CLIENT_CONNECT_TIMEOUT_MS),
        )
        .ok()?;
        stream.set_nodelay(true).ok()?;
        Some(stream)
    }
}
