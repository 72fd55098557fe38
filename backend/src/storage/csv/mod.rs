//! # CSV Storage Module
//!
//! File-based storage for the CRM: one CSV file per collection under a single
//! data directory.
//!
//! ```text
//! clinic-data/
//!   doctors.csv  staff.csv  patients.csv
//!   doctor-advances.csv  staff-advances.csv  staff-salaries.csv
//!   test-reports.csv  patient-attendance.csv  patient-history.csv  patient-payments.csv
//! ```
//!
//! Record files share one header:
//! ```csv
//! id,subject_id,subject_name,date,amount,reason,notes
//! 5f0c…,P7,Asha Rao,2025-03-05,1500,Consultation,
//! ```
//!
//! Read-modify-write cycles on a file are serialised by [`CsvConnection`], and
//! every write replaces the file atomically.

pub mod connection;
pub mod record_repository;
pub mod subject_repository;

#[cfg(test)]
pub mod test_utils;

pub use connection::CsvConnection;
pub use record_repository::RecordRepository;
pub use subject_repository::SubjectRepository;
