//! Multi-client socket transport (§4.9). Each accepted connection runs an
//! independent task; message handling within a connection is sequential,
//! but connections run concurrently. A periodic heartbeat evicts
//! connections that have gone quiet past the timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, RwLock};
use uuid::Uuid;

use crate::app::SharedApp;
use crate::rpc::RpcEngine;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(10);

/// Registry of live connections, keyed by a per-connection id. Mutated
/// only by the accept loop (on connect) and each connection's own task
/// (on disconnect) — entries never contend with each other.
struct ConnectionRegistry {
    last_seen: DashMap<Uuid, Instant>,
}

impl ConnectionRegistry {
    fn new() -> Self {
        Self { last_seen: DashMap::new() }
    }

    fn register(&self, id: Uuid) {
        self.last_seen.insert(id, Instant::now());
    }

    fn touch(&self, id: Uuid) {
        self.last_seen.insert(id, Instant::now());
    }

    fn forget(&self, id: Uuid) {
        self.last_seen.remove(&id);
    }

    fn is_stale(&self, id: Uuid) -> bool {
        self.last_seen
            .get(&id)
            .map(|last| last.elapsed() > HEARTBEAT_INTERVAL + HEARTBEAT_TIMEOUT)
            .unwrap_or(true)
    }
}

/// Bind `host:port` and accept connections until `shutdown` is notified.
/// New connections stop being accepted at that point; already-running
/// handlers are allowed to drain via `in_flight`.
pub async fn serve_socket(
    app: SharedApp,
    engine: Arc<RpcEngine>,
    host: &str,
    port: u16,
    shutdown: Arc<Notify>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    tracing::info!(host, port, "socket transport listening");

    let registry = Arc::new(ConnectionRegistry::new());
    // Each connection handler holds a read guard for its whole lifetime, so
    // many can run concurrently; shutdown takes the write lock, which only
    // succeeds once every outstanding read guard (i.e. every handler) has
    // dropped, giving a drain barrier without serialising connections.
    let in_flight = Arc::new(RwLock::new(()));

    loop {
        tokio::select! {
            () = shutdown.notified() => {
                tracing::info!("socket transport shutting down, draining handlers");
                let _guard = in_flight.write().await;
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                let conn_id = Uuid::new_v4();
                registry.register(conn_id);
                tracing::debug!(%conn_id, %peer, "connection accepted");

                let app = app.clone();
                let engine = Arc::clone(&engine);
                let registry = Arc::clone(&registry);
                let in_flight = Arc::clone(&in_flight);

                tokio::spawn(async move {
                    let _permit = in_flight.read().await;
                    handle_connection(app, &engine, stream, conn_id, &registry).await;
                    registry.forget(conn_id);
                    tracing::debug!(%conn_id, "connection closed");
                });
            }
        }
    }

    Ok(())
}

async fn handle_connection(
    app: SharedApp,
    engine: &RpcEngine,
    stream: TcpStream,
    conn_id: Uuid,
    registry: &ConnectionRegistry,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if registry.is_stale(conn_id) {
                    tracing::warn!(%conn_id, "connection heartbeat timed out");
                    break;
                }
            }
            next_line = lines.next_line() => {
                let line = match next_line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "read failed");
                        break;
                    }
                };
                registry.touch(conn_id);

                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                if let Some(response) = engine.handle_raw(&app, trimmed).await {
                    let Ok(mut rendered) = serde_json::to_string(&response) else {
                        tracing::error!(%conn_id, "failed to serialise response envelope");
                        continue;
                    };
                    rendered.push('\n');
                    if write_half.write_all(rendered.as_bytes()).await.is_err() {
                        break;
                    }
                    if write_half.flush().await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_after_registering_fresh_connection_is_false() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id);
        assert!(!registry.is_stale(id));
    }

    #[test]
    fn unregistered_connection_is_considered_stale() {
        let registry = ConnectionRegistry::new();
        assert!(registry.is_stale(Uuid::new_v4()));
    }

    #[test]
    fn forgetting_removes_the_entry() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id);
        registry.forget(id);
        assert!(registry.is_stale(id));
    }
}
