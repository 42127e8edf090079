//! Shared pieces for the example binaries.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;

#[derive(Clone)]
struct Flaky {
    failures: usize,
    calls: Arc<AtomicUsize>,
}

/// Answers 503 for the first `failures` calls, then 200.
async fn flaky(State(state): State<Flaky>) -> (StatusCode, String) {
    let n = state.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if n <= state.failures {
        tracing::info!(call = n, "server: answering 503");
        (StatusCode::SERVICE_UNAVAILABLE, "try again later".to_string())
    } else {
        tracing::info!(call = n, "server: answering 200");
        (StatusCode::OK, format!("served on call {n}"))
    }
}

/// Echoes selected request headers back as text.
async fn headers(headers: HeaderMap) -> String {
    ["user-agent", "x-ms-version"]
        .iter()
        .map(|name| {
            let value = headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            format!("{name}: {value}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Start a demo server on an ephemeral local port.
///
/// Routes:
/// - `GET /flaky`: 503 for the first `failures` calls, then 200
/// - `GET /headers`: echoes `user-agent` and `x-ms-version`
pub async fn spawn_demo_server(failures: usize) -> anyhow::Result<SocketAddr> {
    let app = Router::new()
        .route("/flaky", get(flaky))
        .route("/headers", get(headers))
        .with_state(Flaky {
            failures,
            calls: Arc::new(AtomicUsize::new(0)),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error = %err, "demo server stopped");
        }
    });

    Ok(addr)
}
