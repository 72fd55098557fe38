//! # Domain Module
//!
//! Business logic for the clinic CRM, independent of HTTP and of the storage
//! format.
//!
//! ## Module Organization
//!
//! - **record_date**: reading the two date encodings found in stored records
//! - **aggregation**: month/year filtering and totals over dated records
//! - **cascade**: best-effort deletion of a subject and its dependent records
//! - **record_service**: CRUD over advances, salaries, test reports, attendance and history
//! - **subject_service**: CRUD over doctors, staff and patients, plus cascade deletion
//! - **report_service**: monthly summaries with formatted totals
//!
//! ## Business Rules
//!
//! - Amounts are coerced to numbers once, when a record is read; aggregation
//!   never fails on bad input
//! - `DD/MM/YYYY` is day first; new writes are always stored as `YYYY-MM-DD`
//! - A subject is removed only after every dependent collection was attempted

pub mod aggregation;
pub mod cascade;
pub mod commands;
pub mod errors;
pub mod record_date;
pub mod record_service;
pub mod report_service;
pub mod subject_service;

pub use aggregation::{aggregate_by_period, aggregate_for_subject, subtotals_by_subject, Aggregate};
pub use cascade::{CascadeDeleter, CascadeError, CascadeOutcome, DependentDeleter, PrimaryDeleter};
pub use errors::{NotFoundError, RecordValidationError, SubjectValidationError};
pub use record_service::RecordService;
pub use report_service::ReportService;
pub use subject_service::SubjectService;
