use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{parse_amount_text, FinancialRecord, RecordKind};
use tracing::{debug, info};

use super::connection::CsvConnection;
use crate::storage::traits::RecordStorage;

/// On-disk shape of a record: every column is text
///
/// Amounts are kept as written so that legacy files with `"1,500"` or blank
/// cells still load; they are coerced when converted to a [`FinancialRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordRow {
    id: String,
    subject_id: String,
    #[serde(default)]
    subject_name: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    notes: String,
}

fn empty_to_none(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<RecordRow> for FinancialRecord {
    fn from(row: RecordRow) -> Self {
        FinancialRecord {
            id: row.id,
            subject_id: row.subject_id,
            subject_name: row.subject_name,
            date: row.date,
            amount: parse_amount_text(&row.amount),
            reason: empty_to_none(row.reason),
            notes: empty_to_none(row.notes),
        }
    }
}

impl From<&FinancialRecord> for RecordRow {
    fn from(record: &FinancialRecord) -> Self {
        RecordRow {
            id: record.id.clone(),
            subject_id: record.subject_id.clone(),
            subject_name: record.subject_name.clone(),
            date: record.date.clone(),
            amount: record.amount.to_string(),
            reason: record.reason.clone().unwrap_or_default(),
            notes: record.notes.clone().unwrap_or_default(),
        }
    }
}

/// CSV-backed record repository, one file per record kind
#[derive(Clone)]
pub struct RecordRepository {
    connection: CsvConnection,
}

impl RecordRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    async fn read_records(&self, kind: RecordKind) -> Result<Vec<FinancialRecord>> {
        let path = self.connection.record_file_path(kind);
        let rows: Vec<RecordRow> = self.connection.read_rows(&path).await?;
        Ok(rows.into_iter().map(FinancialRecord::from).collect())
    }
}

#[async_trait]
impl RecordStorage for RecordRepository {
    async fn list_records(&self, kind: RecordKind) -> Result<Vec<FinancialRecord>> {
        let records = self.read_records(kind).await?;
        debug!("Loaded {} {} records", records.len(), kind);
        Ok(records)
    }

    async fn get_record(&self, kind: RecordKind, record_id: &str) -> Result<Option<FinancialRecord>> {
        let records = self.read_records(kind).await?;
        Ok(records.into_iter().find(|r| r.id == record_id))
    }

    async fn list_records_for_subject(
        &self,
        kind: RecordKind,
        subject_id: &str,
    ) -> Result<Vec<FinancialRecord>> {
        let records = self.read_records(kind).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.subject_id == subject_id)
            .collect())
    }

    async fn store_record(&self, kind: RecordKind, record: &FinancialRecord) -> Result<()> {
        let path = self.connection.record_file_path(kind);
        let row = RecordRow::from(record);
        self.connection
            .modify_rows(&path, move |rows: &mut Vec<RecordRow>| {
                rows.push(row);
                ((), true)
            })
            .await?;
        info!("Stored {} record {}", kind, record.id);
        Ok(())
    }

    async fn update_record(&self, kind: RecordKind, record: &FinancialRecord) -> Result<bool> {
        let path = self.connection.record_file_path(kind);
        let row = RecordRow::from(record);
        self.connection
            .modify_rows(&path, move |rows: &mut Vec<RecordRow>| {
                match rows.iter_mut().find(|existing| existing.id == row.id) {
                    Some(existing) => {
                        *existing = row;
                        (true, true)
                    }
                    None => (false, false),
                }
            })
            .await
    }

    async fn delete_record(&self, kind: RecordKind, record_id: &str) -> Result<bool> {
        let path = self.connection.record_file_path(kind);
        self.connection
            .modify_rows(&path, |rows: &mut Vec<RecordRow>| {
                let before = rows.len();
                rows.retain(|row| row.id != record_id);
                let deleted = rows.len() != before;
                (deleted, deleted)
            })
            .await
    }

    async fn delete_records_for_subject(&self, kind: RecordKind, subject_id: &str) -> Result<usize> {
        let path = self.connection.record_file_path(kind);
        let deleted = self
            .connection
            .modify_rows(&path, |rows: &mut Vec<RecordRow>| {
                let before = rows.len();
                rows.retain(|row| row.subject_id != subject_id);
                let deleted = before - rows.len();
                (deleted, deleted > 0)
            })
            .await?;
        info!("Deleted {} {} records of subject {}", deleted, kind, subject_id);
        Ok(deleted)
    }
}
