// Server loop module
// Accepts connections until shutdown, then drains in-flight ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use crate::config::AppState;

/// Poll interval while waiting for in-flight connections
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Accept connections on `listener` until the signal handler requests shutdown
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    signals: Arc<SignalHandler>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                }
            }

            () = signals.shutdown.notified() => {
                tracing::info!("shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    drop(listener);
    let deadline = Duration::from_secs(state.config.performance.write_timeout);
    drain_connections(&active_connections, deadline).await;
    Ok(())
}

/// Wait for in-flight connections to finish, up to `deadline`
async fn drain_connections(active_connections: &AtomicUsize, deadline: Duration) {
    let started = tokio::time::Instant::now();
    loop {
        let active = active_connections.load(Ordering::SeqCst);
        if active == 0 {
            tracing::info!("all connections closed");
            return;
        }
        if started.elapsed() >= deadline {
            tracing::warn!(active, "drain deadline passed, dropping open connections");
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}
