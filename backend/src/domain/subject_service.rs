use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use shared::{CreateSubjectRequest, RecordKind, Subject, SubjectKind, UpdateSubjectRequest};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::cascade::{CascadeDeleter, CascadeOutcome, DependentDeleter, PrimaryDeleter};
use super::errors::{NotFoundError, SubjectValidationError};
use crate::storage::{RecordStorage, SubjectStorage};

const MAX_NAME_LENGTH: usize = 100;

/// Removes one record kind of a subject straight from storage
pub struct StoredRecordDeleter {
    kind: RecordKind,
    records: Arc<dyn RecordStorage>,
}

impl StoredRecordDeleter {
    pub fn new(kind: RecordKind, records: Arc<dyn RecordStorage>) -> Self {
        Self { kind, records }
    }
}

#[async_trait]
impl DependentDeleter for StoredRecordDeleter {
    fn kind(&self) -> RecordKind {
        self.kind
    }

    async fn delete_for_subject(&self, subject_id: &str) -> Result<usize> {
        self.records
            .delete_records_for_subject(self.kind, subject_id)
            .await
    }
}

/// Removes the subject row itself from storage
pub struct StoredSubjectDeleter {
    kind: SubjectKind,
    subjects: Arc<dyn SubjectStorage>,
}

impl StoredSubjectDeleter {
    pub fn new(kind: SubjectKind, subjects: Arc<dyn SubjectStorage>) -> Self {
        Self { kind, subjects }
    }
}

#[async_trait]
impl PrimaryDeleter for StoredSubjectDeleter {
    fn subject_kind(&self) -> SubjectKind {
        self.kind
    }

    async fn delete_subject(&self, subject_id: &str) -> Result<bool> {
        self.subjects.delete_subject(self.kind, subject_id).await
    }
}

/// Service for managing doctors, staff members and patients
#[derive(Clone)]
pub struct SubjectService {
    subjects: Arc<dyn SubjectStorage>,
    records: Arc<dyn RecordStorage>,
    cascade: CascadeDeleter,
}

impl SubjectService {
    pub fn new(
        subjects: Arc<dyn SubjectStorage>,
        records: Arc<dyn RecordStorage>,
        cascade: CascadeDeleter,
    ) -> Self {
        Self {
            subjects,
            records,
            cascade,
        }
    }

    pub async fn list_subjects(&self, kind: SubjectKind) -> Result<Vec<Subject>> {
        info!("Listing {}", kind.collection());
        let subjects = self.subjects.list_subjects(kind).await?;
        info!("Found {} {}", subjects.len(), kind.collection());
        Ok(subjects)
    }

    pub async fn get_subject(&self, kind: SubjectKind, subject_id: &str) -> Result<Option<Subject>> {
        let subject = self.subjects.get_subject(kind, subject_id).await?;
        if subject.is_none() {
            warn!("{} not found: {}", kind.label(), subject_id);
        }
        Ok(subject)
    }

    pub async fn create_subject(&self, kind: SubjectKind, request: CreateSubjectRequest) -> Result<Subject> {
        info!("Creating {}: name={}", kind, request.name);
        let name = Self::validate_name(&request.name)?;

        let now = Utc::now().to_rfc3339();
        let subject = Subject {
            id: Uuid::new_v4().to_string(),
            name,
            status: request.status.unwrap_or_default(),
            phone: request.phone.filter(|p| !p.trim().is_empty()),
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            created_at: now.clone(),
            updated_at: now,
        };

        self.subjects.store_subject(kind, &subject).await?;
        info!("Created {}: {} with ID: {}", kind, subject.name, subject.id);
        Ok(subject)
    }

    pub async fn update_subject(
        &self,
        kind: SubjectKind,
        subject_id: &str,
        request: UpdateSubjectRequest,
    ) -> Result<Subject> {
        info!("Updating {} {}", kind, subject_id);

        let mut subject = self
            .subjects
            .get_subject(kind, subject_id)
            .await?
            .ok_or_else(|| NotFoundError::subject(kind, subject_id))?;

        if let Some(name) = request.name {
            subject.name = Self::validate_name(&name)?;
        }
        if let Some(status) = request.status {
            subject.status = status;
        }
        if let Some(phone) = request.phone {
            subject.phone = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if let Some(notes) = request.notes {
            subject.notes = Some(notes).filter(|n| !n.trim().is_empty());
        }
        subject.updated_at = Utc::now().to_rfc3339();

        if !self.subjects.update_subject(kind, &subject).await? {
            return Err(NotFoundError::subject(kind, subject_id).into());
        }
        info!("Updated {}: {} with ID: {}", kind, subject.name, subject.id);
        Ok(subject)
    }

    /// Delete only the subject row, leaving its records in place
    pub async fn delete_subject(&self, kind: SubjectKind, subject_id: &str) -> Result<()> {
        info!("Deleting {} {}", kind, subject_id);
        if !self.subjects.delete_subject(kind, subject_id).await? {
            return Err(NotFoundError::subject(kind, subject_id).into());
        }
        Ok(())
    }

    /// Delete the subject and every record that references it
    ///
    /// The outcome is returned as-is; callers decide how a failed primary
    /// deletion is reported.
    pub async fn cascade_delete(&self, kind: SubjectKind, subject_id: &str) -> CascadeOutcome {
        let dependents: Vec<Arc<dyn DependentDeleter>> = kind
            .dependent_kinds()
            .iter()
            .map(|record_kind| {
                Arc::new(StoredRecordDeleter::new(*record_kind, self.records.clone()))
                    as Arc<dyn DependentDeleter>
            })
            .collect();
        let primary = StoredSubjectDeleter::new(kind, self.subjects.clone());

        self.cascade
            .delete_subject(subject_id, &dependents, &primary)
            .await
    }

    fn validate_name(name: &str) -> Result<String, SubjectValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SubjectValidationError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(SubjectValidationError::NameTooLong {
                max: MAX_NAME_LENGTH,
            });
        }
        Ok(name.to_string())
    }
}
