/// Test utilities for CSV-backed tests
///
/// Every test gets its own temporary data directory, removed when the
/// environment is dropped even if the test panics.
use anyhow::Result;
use shared::{FinancialRecord, Subject, SubjectStatus};
use tempfile::TempDir;

use super::connection::CsvConnection;
use super::record_repository::RecordRepository;
use super::subject_repository::SubjectRepository;

/// Temporary data directory plus a connection to it
pub struct TestEnvironment {
    pub connection: CsvConnection,
    pub base_path: std::path::PathBuf,
    _temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let connection = CsvConnection::new(temp_dir.path())?;
        Ok(Self {
            connection,
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        })
    }
}

/// Repositories wired to a fresh [`TestEnvironment`]
pub struct TestHelper {
    pub env: TestEnvironment,
    pub record_repo: RecordRepository,
    pub subject_repo: SubjectRepository,
}

impl TestHelper {
    pub fn new() -> Result<Self> {
        let env = TestEnvironment::new()?;
        let record_repo = RecordRepository::new(env.connection.clone());
        let subject_repo = SubjectRepository::new(env.connection.clone());
        Ok(Self {
            env,
            record_repo,
            subject_repo,
        })
    }
}

pub fn sample_record(id: &str, subject_id: &str, date: &str, amount: f64) -> FinancialRecord {
    FinancialRecord {
        id: id.to_string(),
        subject_id: subject_id.to_string(),
        subject_name: format!("Subject {}", subject_id),
        date: date.to_string(),
        amount,
        reason: None,
        notes: None,
    }
}

pub fn sample_subject(id: &str, name: &str) -> Subject {
    Subject {
        id: id.to_string(),
        name: name.to_string(),
        status: SubjectStatus::Active,
        phone: None,
        notes: None,
        created_at: "2025-01-01T00:00:00+00:00".to_string(),
        updated_at: "2025-01-01T00:00:00+00:00".to_string(),
    }
}
