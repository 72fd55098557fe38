//! Typed failures raised by the domain services.
//!
//! Services return `anyhow::Result`; the REST layer downcasts to these types to
//! choose a status code.

use shared::{RecordKind, SubjectKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordValidationError {
    #[error("subject_id is required")]
    MissingSubjectId,
    #[error("Invalid date '{0}': expected YYYY-MM-DD or DD/MM/YYYY")]
    InvalidDate(String),
    #[error("{} {subject_id} does not exist", subject_kind.label())]
    UnknownSubject {
        subject_kind: SubjectKind,
        subject_id: String,
    },
    #[error("{kind} records belong to a {expected}, not a {actual}")]
    SubjectKindMismatch {
        kind: RecordKind,
        expected: SubjectKind,
        actual: SubjectKind,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubjectValidationError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Name cannot exceed {max} characters")]
    NameTooLong { max: usize },
}

/// A lookup by id found nothing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{what} {id} not found")]
pub struct NotFoundError {
    pub what: &'static str,
    pub id: String,
}

impl NotFoundError {
    pub fn record(kind: RecordKind, id: &str) -> Self {
        Self {
            what: kind.label(),
            id: id.to_string(),
        }
    }

    pub fn subject(kind: SubjectKind, id: &str) -> Self {
        Self {
            what: kind.label(),
            id: id.to_string(),
        }
    }
}
