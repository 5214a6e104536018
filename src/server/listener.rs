use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::limiter::RateLimiter;
use crate::protocol::connection::Connection;
use crate::protocol::dispatch::Dispatcher;
use crate::sandbox::Sandbox;

/// Binds the configured address and serves until a fatal error.
///
/// Bind failure propagates so the process exits nonzero and an external
/// supervisor can restart it.
pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;

    serve(listener, cfg).await
}

/// Serves connections on an already-bound listener.
///
/// Split from [`run`] so tests can bind an ephemeral port themselves.
pub async fn serve(listener: TcpListener, cfg: &Config) -> anyhow::Result<()> {
    let serve_root = Sandbox::new(&cfg.serve_root)
        .with_context(|| format!("invalid serve root {}", cfg.serve_root.display()))?;
    let storage_root = Sandbox::new(&cfg.storage_root)
        .with_context(|| format!("invalid storage root {}", cfg.storage_root.display()))?;

    let limiter = Arc::new(RateLimiter::new(cfg.limits.clone(), Arc::new(SystemClock)));
    spawn_idle_sweeper(limiter.clone());

    let dispatcher = Arc::new(Dispatcher::new(limiter, serve_root, storage_root));

    info!("Listening on {}", listener.local_addr()?);

    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let dispatcher = dispatcher.clone();
        let idle_timeout = cfg.timeout();
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, peer, dispatcher, idle_timeout);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}

/// Periodically drops rate-limit entries for IPs idle longer than the
/// configured TTL, bounding the map for abandoned clients.
fn spawn_idle_sweeper(limiter: Arc<RateLimiter>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(limiter.idle_ttl());
        tick.tick().await; // first tick fires immediately
        loop {
            tick.tick().await;
            let removed = limiter.sweep_idle().await;
            if removed > 0 {
                tracing::debug!(removed, "swept idle rate-limit entries");
            }
        }
    });
}
