use anyhow::Result;
use shared::{CreateRecordRequest, FinancialRecord, RecordKind, SubjectKind, UpdateRecordRequest};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::errors::{NotFoundError, RecordValidationError};
use super::record_date::normalize_to_iso;
use crate::storage::{RecordStorage, SubjectStorage};

/// Trimmed text, with blank input treated as absent
fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Service for the dated records of every [`RecordKind`]
///
/// Dates are normalised to `YYYY-MM-DD` on every write, and the subject a new
/// record points at must exist.
#[derive(Clone)]
pub struct RecordService {
    records: Arc<dyn RecordStorage>,
    subjects: Arc<dyn SubjectStorage>,
}

impl RecordService {
    pub fn new(records: Arc<dyn RecordStorage>, subjects: Arc<dyn SubjectStorage>) -> Self {
        Self { records, subjects }
    }

    pub async fn list_records(&self, kind: RecordKind) -> Result<Vec<FinancialRecord>> {
        info!("Listing {} records", kind);
        let records = self.records.list_records(kind).await?;
        info!("Found {} {} records", records.len(), kind);
        Ok(records)
    }

    pub async fn get_record(&self, kind: RecordKind, record_id: &str) -> Result<Option<FinancialRecord>> {
        let record = self.records.get_record(kind, record_id).await?;
        if record.is_none() {
            warn!("{} record not found: {}", kind, record_id);
        }
        Ok(record)
    }

    /// Records of one subject; the subject kind in the path must own `kind`
    pub async fn list_records_for_subject(
        &self,
        kind: RecordKind,
        subject_kind: SubjectKind,
        subject_id: &str,
    ) -> Result<Vec<FinancialRecord>> {
        Self::ensure_owner(kind, subject_kind)?;
        info!("Listing {} records of {} {}", kind, subject_kind, subject_id);
        self.records.list_records_for_subject(kind, subject_id).await
    }

    pub async fn create_record(
        &self,
        kind: RecordKind,
        request: CreateRecordRequest,
    ) -> Result<FinancialRecord> {
        info!(
            "Creating {}: subject={}, date={}, amount={}",
            kind.label(),
            request.subject_id,
            request.date,
            request.amount
        );

        let subject_id = request.subject_id.trim().to_string();
        if subject_id.is_empty() {
            return Err(RecordValidationError::MissingSubjectId.into());
        }
        let date = normalize_to_iso(&request.date)
            .ok_or_else(|| RecordValidationError::InvalidDate(request.date.clone()))?;

        let subject_kind = kind.subject_kind();
        let subject = self
            .subjects
            .get_subject(subject_kind, &subject_id)
            .await?
            .ok_or_else(|| RecordValidationError::UnknownSubject {
                subject_kind,
                subject_id: subject_id.clone(),
            })?;

        let subject_name = match request.subject_name.trim() {
            "" => subject.name,
            name => name.to_string(),
        };

        let record = FinancialRecord {
            id: Uuid::new_v4().to_string(),
            subject_id,
            subject_name,
            date,
            amount: request.amount,
            reason: clean_text(request.reason),
            notes: clean_text(request.notes),
        };

        self.records.store_record(kind, &record).await?;
        info!("Created {} {} for {}", kind.label(), record.id, record.subject_name);
        Ok(record)
    }

    /// Apply a partial update; blank `reason`/`notes` clear the field
    pub async fn update_record(
        &self,
        kind: RecordKind,
        record_id: &str,
        request: UpdateRecordRequest,
    ) -> Result<FinancialRecord> {
        info!("Updating {} record {}", kind, record_id);

        let mut record = self
            .records
            .get_record(kind, record_id)
            .await?
            .ok_or_else(|| NotFoundError::record(kind, record_id))?;

        if let Some(date) = request.date {
            record.date =
                normalize_to_iso(&date).ok_or(RecordValidationError::InvalidDate(date))?;
        }
        if let Some(amount) = request.amount {
            record.amount = amount;
        }
        if let Some(name) = request.subject_name {
            let name = name.trim();
            if !name.is_empty() {
                record.subject_name = name.to_string();
            }
        }
        if request.reason.is_some() {
            record.reason = clean_text(request.reason);
        }
        if request.notes.is_some() {
            record.notes = clean_text(request.notes);
        }

        if !self.records.update_record(kind, &record).await? {
            // Deleted between the read and the write
            return Err(NotFoundError::record(kind, record_id).into());
        }
        info!("Updated {} record {}", kind, record_id);
        Ok(record)
    }

    pub async fn delete_record(&self, kind: RecordKind, record_id: &str) -> Result<()> {
        info!("Deleting {} record {}", kind, record_id);
        if !self.records.delete_record(kind, record_id).await? {
            return Err(NotFoundError::record(kind, record_id).into());
        }
        Ok(())
    }

    /// Delete every record of `kind` for a subject; zero matches is a success
    pub async fn delete_records_for_subject(
        &self,
        kind: RecordKind,
        subject_kind: SubjectKind,
        subject_id: &str,
    ) -> Result<usize> {
        Self::ensure_owner(kind, subject_kind)?;
        info!("Deleting all {} records of {} {}", kind, subject_kind, subject_id);
        self.records.delete_records_for_subject(kind, subject_id).await
    }

    fn ensure_owner(kind: RecordKind, subject_kind: SubjectKind) -> Result<(), RecordValidationError> {
        let expected = kind.subject_kind();
        if expected != subject_kind {
            return Err(RecordValidationError::SubjectKindMismatch {
                kind,
                expected,
                actual: subject_kind,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::{sample_subject, TestHelper};

    async fn service_with_patient(helper: &TestHelper) -> RecordService {
        helper
            .subject_repo
            .store_subject(SubjectKind::Patient, &sample_subject("P7", "Asha Rao"))
            .await
            .unwrap();
        RecordService::new(
            Arc::new(helper.record_repo.clone()),
            Arc::new(helper.subject_repo.clone()),
        )
    }

    fn payment(date: &str, amount: f64) -> CreateRecordRequest {
        CreateRecordRequest {
            subject_id: "P7".to_string(),
            subject_name: String::new(),
            date: date.to_string(),
            amount,
            reason: Some("  Consultation ".to_string()),
            notes: Some("   ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_normalises_date_and_fills_name() {
        let helper = TestHelper::new().unwrap();
        let service = service_with_patient(&helper).await;

        let record = service
            .create_record(RecordKind::PatientPayment, payment("05/03/2025", 1500.0))
            .await
            .unwrap();

        assert_eq!(record.date, "2025-03-05");
        assert_eq!(record.subject_name, "Asha Rao");
        assert_eq!(record.reason.as_deref(), Some("Consultation"));
        assert_eq!(record.notes, None);
        assert!(Uuid::parse_str(&record.id).is_ok());

        let stored = service
            .get_record(RecordKind::PatientPayment, &record.id)
            .await
            .unwrap();
        assert_eq!(stored, Some(record));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let helper = TestHelper::new().unwrap();
        let service = service_with_patient(&helper).await;

        let err = service
            .create_record(RecordKind::PatientPayment, payment("someday", 1.0))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<RecordValidationError>(),
            Some(&RecordValidationError::InvalidDate("someday".to_string()))
        );

        let mut request = payment("2025-03-05", 1.0);
        request.subject_id = "P404".to_string();
        let err = service
            .create_record(RecordKind::PatientPayment, request)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecordValidationError>(),
            Some(RecordValidationError::UnknownSubject { .. })
        ));

        let mut request = payment("2025-03-05", 1.0);
        request.subject_id = "  ".to_string();
        let err = service
            .create_record(RecordKind::PatientPayment, request)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<RecordValidationError>(),
            Some(&RecordValidationError::MissingSubjectId)
        );
    }

    #[tokio::test]
    async fn test_staff_record_needs_a_staff_subject() {
        let helper = TestHelper::new().unwrap();
        let service = service_with_patient(&helper).await;

        // P7 is a patient, not a staff member
        let err = service
            .create_record(RecordKind::StaffAdvance, payment("2025-03-05", 1.0))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<RecordValidationError>().is_some());
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let helper = TestHelper::new().unwrap();
        let service = service_with_patient(&helper).await;
        let record = service
            .create_record(RecordKind::PatientPayment, payment("2025-03-05", 1500.0))
            .await
            .unwrap();

        let updated = service
            .update_record(
                RecordKind::PatientPayment,
                &record.id,
                UpdateRecordRequest {
                    date: Some("31/03/2025".to_string()),
                    reason: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.date, "2025-03-31");
        assert_eq!(updated.amount, 1500.0);
        assert_eq!(updated.reason, None);
        assert_eq!(updated.subject_name, "Asha Rao");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_record() {
        let helper = TestHelper::new().unwrap();
        let service = service_with_patient(&helper).await;

        let err = service
            .update_record(RecordKind::TestReport, "missing", UpdateRecordRequest::default())
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<NotFoundError>().is_some());

        let err = service
            .delete_record(RecordKind::TestReport, "missing")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "test report missing not found");
    }

    #[tokio::test]
    async fn test_subject_scoped_operations_check_the_owner() {
        let helper = TestHelper::new().unwrap();
        let service = service_with_patient(&helper).await;
        service
            .create_record(RecordKind::PatientPayment, payment("2025-03-05", 10.0))
            .await
            .unwrap();
        service
            .create_record(RecordKind::PatientPayment, payment("2025-03-06", 20.0))
            .await
            .unwrap();

        let err = service
            .list_records_for_subject(RecordKind::PatientPayment, SubjectKind::Staff, "P7")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecordValidationError>(),
            Some(RecordValidationError::SubjectKindMismatch { .. })
        ));

        let deleted = service
            .delete_records_for_subject(RecordKind::PatientPayment, SubjectKind::Patient, "P7")
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(service
            .list_records_for_subject(RecordKind::PatientPayment, SubjectKind::Patient, "P7")
            .await
            .unwrap()
            .is_empty());
    }
}
