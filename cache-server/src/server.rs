//! # Distributed cache server event loop
//!
//! Grounded in the original `cacheserver.c`: one listening socket, an
//! event loop with a 200 ms tick so shutdown stays responsive, one
//! read/dispatch/write cycle per accepted connection, then close. The
//! original uses `epoll_wait` with a 200 ms timeout on a single OS
//! thread; this translates that readiness-based loop onto Tokio's
//! reactor running on a single-threaded runtime, with `tokio::select!`
//! standing in for the
//! `epoll_wait` dispatch between "new connection ready" and "tick
//! elapsed, check for shutdown".
//!
//! ## Design Principles
//!
//! 1. **One Cycle Per Connection**: every accepted connection is read
//!    once, dispatched once, written once, and closed — no keep-alive,
//!    matching `handlerequest`/`sendresponse`/`close(fd)` in the source.
//! 2. **Bounded Shutdown Latency**: the accept loop polls the shared
//!    run flag at least every `SERVER_TICK_MS`, mirroring the epoll
//!    timeout.
//! 3. **Non-Fatal Accept Errors**: an `accept` failure is logged and the
//!    loop continues; only *bind/listen* failures are startup-fatal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::interval;

use cache_common::limits::SERVER_TICK_MS;
use cache_wire::{decode_request, encode_get_response, Request, WireError, MAX_SOCKET_BUFFER};

use crate::bucket_cache::BucketCache;

/// Runs the accept loop against `listener` until `keep_running` is
/// cleared. Each connection is handled to completion on its own spawned
/// task so one slow client cannot stall new accepts, while the table
/// itself stays behind a single mutex — the server is conceptually
/// single-threaded (one logical cache, one request in flight against it
/// at a time) even though Tokio may schedule the connection tasks across
/// its worker thread(s).
pub async fn run_event_loop(listener: TcpListener, keep_running: Arc<AtomicBool>) {
    let cache = Arc::new(Mutex::new(BucketCache::new()));
    let mut tick = interval(Duration::from_millis(SERVER_TICK_MS));

    tracing::info!(addr = ?listener.local_addr().ok(), "cache server listening");

    while keep_running.load(Ordering::Relaxed) {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tracing::trace!(%peer, "accepted connection");
                        let cache = Arc::clone(&cache);
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, cache).await {
                                tracing::trace!(%peer, %err, "connection closed with error");
                            }
                        });
                    }
                    Err(err) => {
                        tracing::warn!(%err, "accept failed, continuing");
                    }
                }
            }
            _ = tick.tick() => {
                // Wakes the select every SERVER_TICK_MS purely so the
                // keep_running check above re-runs promptly after a
                // shutdown signal, mirroring epoll_wait's 200ms timeout.
            }
        }
    }

    tracing::info!("cache server shutting down");
}

/// Handles one connection: a single read, a single dispatch, a single
/// write, then the caller closes the socket. Matches
/// `handlerequest`/`sendresponse` in the original event loop exactly —
/// no partial-frame reassembly across multiple reads.
async fn handle_connection(mut stream: TcpStream, cache: Arc<Mutex<BucketCache>>) -> std::io::Result<()> {
    let mut buf = vec![0u8; MAX_SOCKET_BUFFER];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        return Ok(());
    }

    let Some(response) = dispatch(&buf[..n], &cache).await else {
        // Malformed frame or unknown opcode: drop silently, no response.
        return Ok(());
    };

    stream.write_all(&response).await?;
    Ok(())
}

async fn dispatch(buf: &[u8], cache: &Mutex<BucketCache>) -> Option<Vec<u8>> {
    match decode_request(buf) {
        Ok(Request::Get { key }) => {
            let mut table = cache.lock().await;
            let hit = table.get(&key);
            let mut out = Vec::new();
            encode_get_response(hit.as_ref().map(|(data, ttl)| (data.as_slice(), *ttl)), &mut out);
            Some(out)
        }
        Ok(Request::Set { key, data, ttl }) => {
            let mut table = cache.lock().await;
            table.set(&key, &data, ttl);
            // SET is fire-and-forget on the wire; no response frame.
            None
        }
        Err(WireError::Truncated | WireError::TooLarge | WireError::UnknownOpcode(_)) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_client::DistributedClient;

    async fn spawn_test_server() -> (String, u16, Arc<AtomicBool>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let keep_running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&keep_running);
        tokio::spawn(async move {
            run_event_loop(listener, flag).await;
        });
        (addr.ip().to_string(), addr.port(), keep_running)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn set_then_get_round_trips_over_the_wire() {
        let (ip, port, keep_running) = spawn_test_server().await;
        let client = DistributedClient::new(&ip, port).unwrap();

        client.set(b"www.google.com", b"172.217.3.164", 86400);
        // Give the fire-and-forget SET a moment to land before the GET.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (data, ttl) = client.get(b"www.google.com").expect("hit");
        assert_eq!(data, b"172.217.3.164");
        assert!(ttl <= 86400 && ttl >= 86399);

        keep_running.store(false, Ordering::Relaxed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn get_on_empty_cache_is_miss() {
        let (ip, port, keep_running) = spawn_test_server().await;
        let client = DistributedClient::new(&ip, port).unwrap();
        assert_eq!(client.get(b"nope"), None);
        keep_running.store(false, Ordering::Relaxed);
    }
}
