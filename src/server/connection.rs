// Connection handling module
// Accepts a single TCP connection and serves HTTP/1.1 on it

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppState;
use crate::handler;

/// Accept a connection unless the configured limit is reached.
///
/// The counter is incremented before the limit check and rolled back on
/// rejection, so concurrent accepts cannot overshoot the limit.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) {
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if at_capacity(prev_count, state.config.performance.max_connections) {
        conn_counter.fetch_sub(1, Ordering::SeqCst);
        tracing::warn!(
            active = prev_count,
            max = ?state.config.performance.max_connections,
            %peer_addr,
            "max connections reached, connection rejected"
        );
        drop(stream);
        return;
    }

    tracing::trace!(%peer_addr, "accepted connection");
    handle_connection(stream, peer_addr, Arc::clone(state), Arc::clone(conn_counter));
}

fn at_capacity(active: usize, max_connections: Option<u64>) -> bool {
    max_connections.is_some_and(|max| active >= usize::try_from(max).unwrap_or(usize::MAX))
}

/// Serve one connection in a spawned task, then release its counter slot.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let timeout_duration = Duration::from_secs(std::cmp::max(
            performance.read_timeout,
            performance.write_timeout,
        ));

        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive_timeout > 0);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state), peer_addr)),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::debug!(%peer_addr, error = %err, "connection error"),
            Err(_) => tracing::warn!(
                %peer_addr,
                timeout_secs = timeout_duration.as_secs(),
                "connection timed out"
            ),
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
