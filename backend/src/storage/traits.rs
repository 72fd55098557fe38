//! # Storage Traits
//!
//! Storage abstractions used by the domain layer. The CSV implementation in
//! [`super::csv`] is the only backend today; services only ever see these traits.

use anyhow::Result;
use async_trait::async_trait;
use shared::{FinancialRecord, RecordKind, Subject, SubjectKind};

/// Persistence for dated records, one collection per [`RecordKind`]
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// All records of a kind, in insertion order
    async fn list_records(&self, kind: RecordKind) -> Result<Vec<FinancialRecord>>;

    async fn get_record(&self, kind: RecordKind, record_id: &str) -> Result<Option<FinancialRecord>>;

    /// Records of a kind that belong to one subject
    async fn list_records_for_subject(
        &self,
        kind: RecordKind,
        subject_id: &str,
    ) -> Result<Vec<FinancialRecord>>;

    /// Append a new record; the id must already be assigned
    async fn store_record(&self, kind: RecordKind, record: &FinancialRecord) -> Result<()>;

    /// Replace the record with the same id
    /// Returns false when no such record exists
    async fn update_record(&self, kind: RecordKind, record: &FinancialRecord) -> Result<bool>;

    /// Returns true if the record was found and deleted
    async fn delete_record(&self, kind: RecordKind, record_id: &str) -> Result<bool>;

    /// Delete every record of a kind that belongs to a subject
    /// Returns the number of records removed
    async fn delete_records_for_subject(&self, kind: RecordKind, subject_id: &str) -> Result<usize>;
}

/// Persistence for doctors, staff members and patients
#[async_trait]
pub trait SubjectStorage: Send + Sync {
    /// All subjects of a kind, ordered by name
    async fn list_subjects(&self, kind: SubjectKind) -> Result<Vec<Subject>>;

    async fn get_subject(&self, kind: SubjectKind, subject_id: &str) -> Result<Option<Subject>>;

    async fn store_subject(&self, kind: SubjectKind, subject: &Subject) -> Result<()>;

    /// Returns false when no such subject exists
    async fn update_subject(&self, kind: SubjectKind, subject: &Subject) -> Result<bool>;

    /// Returns true if the subject was found and deleted
    async fn delete_subject(&self, kind: SubjectKind, subject_id: &str) -> Result<bool>;
}

/// A storage backend that can hand out repositories
pub trait Connection: Send + Sync + Clone {
    type RecordRepository: RecordStorage;
    type SubjectRepository: SubjectStorage;

    fn create_record_repository(&self) -> Self::RecordRepository;

    fn create_subject_repository(&self) -> Self::SubjectRepository;
}
