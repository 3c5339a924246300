//! Distributed cache client: stateless, connection-per-operation binary
//! wire protocol facade (no pooling, no RESP — see `client.rs`).

mod client;

pub use client::DistributedClient;
