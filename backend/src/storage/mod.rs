//! # Storage Module
//!
//! Persistence for subjects and their records. Domain services depend on the
//! [`RecordStorage`] and [`SubjectStorage`] traits; [`csv::CsvConnection`] is the
//! concrete backend.

pub mod csv;
pub mod traits;

pub use self::csv::CsvConnection;
pub use traits::{Connection, RecordStorage, SubjectStorage};
