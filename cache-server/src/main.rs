//! `cacheserver` — the distributed cache server binary.
//!
//! CLI surface per the wire protocol: `cacheserver <listen-ipv4> <port>`,
//! parsed with a `clap` derive API (the same daemon-CLI crate
//! `other_examples/manifests/ferrous-networking-Ferrous-DNS` uses for an
//! adjacent DNS daemon). This binary only ever serves the chained cache
//! table; it has no ring or allowlist of its own to configure — those
//! are consumed by the resolver-facing `cache-core` dispatcher, not by a
//! standalone cache server process. Exit code 111 on any startup error,
//! mirroring the original's `strerr_die2sys(111, ...)` convention.

use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

const STARTUP_FAILURE_EXIT_CODE: u8 = 111;

/// Standalone distributed cache server process.
#[derive(Parser, Debug)]
#[command(name = "cacheserver")]
struct Args {
    /// IPv4 address to listen on.
    listen_ip: IpAddr,

    /// TCP port to listen on (1024-65535).
    port: u16,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if args.port < 1024 {
        eprintln!("cacheserver: fatal: invalid port number {}", args.port);
        return ExitCode::from(STARTUP_FAILURE_EXIT_CODE);
    }

    tracing::info!(listen_ip = %args.listen_ip, port = args.port, "cacheserver starting");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("cacheserver: fatal: unable to start runtime: {err}");
            return ExitCode::from(STARTUP_FAILURE_EXIT_CODE);
        }
    };

    runtime.block_on(async move {
        let addr = SocketAddr::new(args.listen_ip, args.port);
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(err) => {
                eprintln!("cacheserver: fatal: unable to bind/listen on {addr}: {err}");
                return ExitCode::from(STARTUP_FAILURE_EXIT_CODE);
            }
        };

        let keep_running = Arc::new(AtomicBool::new(true));
        let shutdown_flag = Arc::clone(&keep_running);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("SIGINT received, shutting down");
                shutdown_flag.store(false, Ordering::Relaxed);
            }
        });

        cache_server::run_event_loop(listener, keep_running).await;
        ExitCode::SUCCESS
    })
}
