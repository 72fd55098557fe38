use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{Subject, SubjectKind, SubjectStatus};
use tracing::info;

use super::connection::CsvConnection;
use crate::storage::traits::SubjectStorage;

/// On-disk shape of a subject
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SubjectRow {
    id: String,
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<SubjectRow> for Subject {
    fn from(row: SubjectRow) -> Self {
        Subject {
            id: row.id,
            name: row.name,
            status: SubjectStatus::parse_lenient(&row.status),
            phone: non_empty(row.phone),
            notes: non_empty(row.notes),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Subject> for SubjectRow {
    fn from(subject: &Subject) -> Self {
        SubjectRow {
            id: subject.id.clone(),
            name: subject.name.clone(),
            status: subject.status.as_str().to_string(),
            phone: subject.phone.clone().unwrap_or_default(),
            notes: subject.notes.clone().unwrap_or_default(),
            created_at: subject.created_at.clone(),
            updated_at: subject.updated_at.clone(),
        }
    }
}

/// CSV-backed repository for doctors, staff and patients
#[derive(Clone)]
pub struct SubjectRepository {
    connection: CsvConnection,
}

impl SubjectRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    async fn read_subjects(&self, kind: SubjectKind) -> Result<Vec<Subject>> {
        let path = self.connection.subject_file_path(kind);
        let rows: Vec<SubjectRow> = self.connection.read_rows(&path).await?;
        Ok(rows.into_iter().map(Subject::from).collect())
    }
}

#[async_trait]
impl SubjectStorage for SubjectRepository {
    async fn list_subjects(&self, kind: SubjectKind) -> Result<Vec<Subject>> {
        let mut subjects = self.read_subjects(kind).await?;
        subjects.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(subjects)
    }

    async fn get_subject(&self, kind: SubjectKind, subject_id: &str) -> Result<Option<Subject>> {
        let subjects = self.read_subjects(kind).await?;
        Ok(subjects.into_iter().find(|s| s.id == subject_id))
    }

    async fn store_subject(&self, kind: SubjectKind, subject: &Subject) -> Result<()> {
        let path = self.connection.subject_file_path(kind);
        let row = SubjectRow::from(subject);
        self.connection
            .modify_rows(&path, move |rows: &mut Vec<SubjectRow>| {
                rows.push(row);
                ((), true)
            })
            .await?;
        info!("Stored {} {} ({})", kind, subject.id, subject.name);
        Ok(())
    }

    async fn update_subject(&self, kind: SubjectKind, subject: &Subject) -> Result<bool> {
        let path = self.connection.subject_file_path(kind);
        let row = SubjectRow::from(subject);
        self.connection
            .modify_rows(&path, move |rows: &mut Vec<SubjectRow>| {
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

    async fn delete_subject(&self, kind: SubjectKind, subject_id: &str) -> Result<bool> {
        let path = self.connection.subject_file_path(kind);
        let deleted = self
            .connection
            .modify_rows(&path, |rows: &mut Vec<SubjectRow>| {
                let before = rows.len();
                rows.retain(|row| row.id != subject_id);
                let deleted = rows.len() != before;
                (deleted, deleted)
            })
            .await?;
        if deleted {
            info!("Deleted {} {}", kind, subject_id);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::{sample_subject, TestHelper};

    #[tokio::test]
    async fn test_subjects_are_listed_by_name() {
        let helper = TestHelper::new().unwrap();
        let repo = &helper.subject_repo;
        repo.store_subject(SubjectKind::Patient, &sample_subject("P2", "zoya"))
            .await
            .unwrap();
        repo.store_subject(SubjectKind::Patient, &sample_subject("P1", "Arjun"))
            .await
            .unwrap();

        let names: Vec<String> = repo
            .list_subjects(SubjectKind::Patient)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Arjun", "zoya"]);
        assert!(repo.list_subjects(SubjectKind::Doctor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subject_round_trips_through_csv() {
        let helper = TestHelper::new().unwrap();
        let repo = &helper.subject_repo;
        let mut subject = sample_subject("S1", "Ravi Kumar");
        subject.status = SubjectStatus::Inactive;
        subject.phone = Some("0123 456".to_string());

        repo.store_subject(SubjectKind::Staff, &subject).await.unwrap();
        let loaded = repo.get_subject(SubjectKind::Staff, "S1").await.unwrap();
        assert_eq!(loaded, Some(subject));
    }

    #[tokio::test]
    async fn test_update_and_delete_subject() {
        let helper = TestHelper::new().unwrap();
        let repo = &helper.subject_repo;
        let mut subject = sample_subject("D1", "Dr. Mehta");
        repo.store_subject(SubjectKind::Doctor, &subject).await.unwrap();

        subject.name = "Dr. A. Mehta".to_string();
        assert!(repo.update_subject(SubjectKind::Doctor, &subject).await.unwrap());
        assert_eq!(
            repo.get_subject(SubjectKind::Doctor, "D1").await.unwrap().unwrap().name,
            "Dr. A. Mehta"
        );

        assert!(repo.delete_subject(SubjectKind::Doctor, "D1").await.unwrap());
        assert!(!repo.delete_subject(SubjectKind::Doctor, "D1").await.unwrap());
        assert!(repo.get_subject(SubjectKind::Doctor, "D1").await.unwrap().is_none());
    }
}
