//! # Clinic CRM Backend
//!
//! Records backend for a small clinic: doctors, staff and patients, plus the
//! dated records that hang off them (advances, salary payments, test-report
//! charges, attendance and history).
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST API under /api, API client)
//!     ↓
//! Domain Layer (aggregation, cascade deletion, services)
//!     ↓
//! Storage Layer (CSV files)
//! ```

pub mod client;
pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::domain::{CascadeDeleter, RecordService, ReportService, SubjectService};
use crate::storage::{Connection, CsvConnection, RecordStorage, SubjectStorage};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub record_service: RecordService,
    pub subject_service: SubjectService,
    pub report_service: ReportService,
}

impl AppState {
    pub fn new<C>(connection: C, call_timeout: Duration, currency_symbol: &str) -> Self
    where
        C: Connection,
        C::RecordRepository: 'static,
        C::SubjectRepository: 'static,
    {
        let records: Arc<dyn RecordStorage> = Arc::new(connection.create_record_repository());
        let subjects: Arc<dyn SubjectStorage> = Arc::new(connection.create_subject_repository());

        Self {
            record_service: RecordService::new(records.clone(), subjects.clone()),
            subject_service: SubjectService::new(
                subjects,
                records.clone(),
                CascadeDeleter::new(call_timeout),
            ),
            report_service: ReportService::new(records, currency_symbol),
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &Config) -> Result<AppState> {
    info!("Setting up CSV storage in {}", config.data_dir.display());
    let connection = CsvConnection::new(&config.data_dir)?;

    info!("Setting up application state");
    Ok(AppState::new(
        connection,
        config.call_timeout(),
        &config.currency_symbol,
    ))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, allowed_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .nest("/api", io::rest::router())
        .layer(cors)
        .with_state(app_state)
}
