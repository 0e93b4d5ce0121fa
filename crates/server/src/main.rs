//! Adaptive practice backend.
//!
//! - Axum HTTP API over the session orchestration services
//! - SQLite persistence (sqlx), agent consulted over HTTP
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   PRACTICE_DB_URL    : SQLite URL (default "sqlite:practice.sqlite3")
//!   AGENT_BASE_URL     : agent endpoint (default "http://localhost:5000")
//!   AGENT_TIMEOUT_SECS : bound on each agent call (default 10)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod error;
mod protocol;
mod routes;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use practice_core::Clock;
use services::agent::HttpAgentClient;
use services::AppServices;

use crate::routes::build_router;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let db_url =
        std::env::var("PRACTICE_DB_URL").unwrap_or_else(|_| "sqlite:practice.sqlite3".into());
    let agent = Arc::new(HttpAgentClient::from_env()?);
    let services = AppServices::new_sqlite(&db_url, Clock::default_clock(), agent).await?;

    let app = build_router(services);

    let addr: SocketAddr = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

    let listener = TcpListener::bind(addr).await?;
    info!(target: "server", %addr, %db_url, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(target: "server", "shutdown signal received");
    }
}
