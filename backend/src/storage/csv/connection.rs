use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{RecordKind, SubjectKind};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::record_repository::RecordRepository;
use super::subject_repository::SubjectRepository;
use crate::storage::traits::Connection;

/// CsvConnection owns the data directory and serialises writes per file
///
/// Layout: one file per collection directly under the base directory, e.g.
/// `patients.csv`, `patient-payments.csv`, `staff-advances.csv`.
#[derive(Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
    file_locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl CsvConnection {
    /// Create a new CSV connection, creating the base directory if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).with_context(|| {
                format!("Failed to create data directory {}", base_path.display())
            })?;
            info!("📁 Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
            file_locks: Arc::new(DashMap::new()),
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn record_file_path(&self, kind: RecordKind) -> PathBuf {
        self.base_directory.join(format!("{}.csv", kind.path()))
    }

    pub fn subject_file_path(&self, kind: SubjectKind) -> PathBuf {
        self.base_directory.join(format!("{}.csv", kind.collection()))
    }

    fn file_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        self.file_locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Read every row of a CSV file
    ///
    /// A missing file is an empty collection. Rows that fail to deserialise are
    /// skipped with a warning rather than failing the whole read.
    pub async fn read_rows<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        let (rows, skipped) = self.load_rows(path).await?;
        for problem in &skipped {
            warn!("Skipping malformed row in {}: {}", path.display(), problem);
        }
        Ok(rows)
    }

    /// Parse a CSV file, returning the good rows and a description of each bad one
    async fn load_rows<T: DeserializeOwned>(&self, path: &Path) -> Result<(Vec<T>, Vec<String>)> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} does not exist yet, treating as empty", path.display());
                return Ok((Vec::new(), Vec::new()));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        for (index, row) in reader.deserialize::<T>().enumerate() {
            match row {
                Ok(row) => rows.push(row),
                Err(e) => skipped.push(format!("row {}: {}", index + 1, e)),
            }
        }
        Ok((rows, skipped))
    }

    /// Replace the contents of a CSV file
    ///
    /// The new contents are written to a sibling temporary file and renamed
    /// over the original, so readers never observe a half-written file.
    pub async fn write_rows<T: Serialize>(&self, path: &Path, rows: &[T]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to encode {}: {}", path.display(), e))?;

        let temp_path = path.with_extension("csv.tmp");
        tokio::fs::write(&temp_path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        tokio::fs::rename(&temp_path, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Read, change and write back a CSV file under its lock
    ///
    /// The file is rewritten only when `change` reports that it modified rows.
    /// A file with malformed rows is never rewritten: the call fails and the
    /// file is left as it was.
    pub async fn modify_rows<T, R, F>(&self, path: &Path, change: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        R: Send,
        F: FnOnce(&mut Vec<T>) -> (R, bool) + Send,
    {
        let lock = self.file_lock(path);
        let _guard = lock.lock().await;

        let (mut rows, skipped) = self.load_rows::<T>(path).await?;
        if !skipped.is_empty() {
            anyhow::bail!(
                "Refusing to rewrite {}: {} malformed row(s), first {}",
                path.display(),
                skipped.len(),
                skipped[0]
            );
        }
        let (result, changed) = change(&mut rows);
        if changed {
            self.write_rows(path, &rows).await?;
        }
        Ok(result)
    }
}

impl Connection for CsvConnection {
    type RecordRepository = RecordRepository;
    type SubjectRepository = SubjectRepository;

    fn create_record_repository(&self) -> Self::RecordRepository {
        RecordRepository::new(self.clone())
    }

    fn create_subject_repository(&self) -> Self::SubjectRepository {
        SubjectRepository::new(self.clone())
    }
}
