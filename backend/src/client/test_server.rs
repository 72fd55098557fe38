//! Live servers on ephemeral ports for client tests.

use axum::http::HeaderValue;
use axum::Router;
use std::time::Duration;
use tempfile::TempDir;

use super::ApiClient;
use crate::storage::CsvConnection;
use crate::{create_router, AppState};

/// Serve `router` on `127.0.0.1:0` and return its base URL
pub async fn spawn_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A full CRM server over a fresh data directory, plus a client for it
pub async fn spawn_crm() -> (ApiClient, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let state = AppState::new(
        CsvConnection::new(temp_dir.path()).unwrap(),
        Duration::from_secs(5),
        "₹",
    );
    let base_url = spawn_router(create_router(
        state,
        HeaderValue::from_static("http://localhost:8080"),
    ))
    .await;
    (ApiClient::new(&base_url, Duration::from_secs(5)).unwrap(), temp_dir)
}

/// Base URL of a port nobody is listening on
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
