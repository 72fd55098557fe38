//! Cascade deletion driven from the client side over the REST API.
//!
//! Each dependent collection is cleared with
//! `DELETE /api/{resource}/{subjectKind}/{subjectId}` and the subject itself
//! with `DELETE /api/{subjects}/{id}`, orchestrated by the same
//! [`CascadeDeleter`] the server uses.

use async_trait::async_trait;
use shared::{RecordKind, SubjectKind};
use std::sync::Arc;

use super::api_client::ApiClient;
use crate::domain::{CascadeDeleter, CascadeOutcome, DependentDeleter, PrimaryDeleter};

pub struct RemoteRecordDeleter {
    client: ApiClient,
    kind: RecordKind,
}

impl RemoteRecordDeleter {
    pub fn new(client: ApiClient, kind: RecordKind) -> Self {
        Self { client, kind }
    }
}

#[async_trait]
impl DependentDeleter for RemoteRecordDeleter {
    fn kind(&self) -> RecordKind {
        self.kind
    }

    async fn delete_for_subject(&self, subject_id: &str) -> anyhow::Result<usize> {
        Ok(self
            .client
            .delete_records_for_subject(self.kind, subject_id)
            .await?)
    }
}

pub struct RemoteSubjectDeleter {
    client: ApiClient,
    kind: SubjectKind,
}

impl RemoteSubjectDeleter {
    pub fn new(client: ApiClient, kind: SubjectKind) -> Self {
        Self { client, kind }
    }
}

#[async_trait]
impl PrimaryDeleter for RemoteSubjectDeleter {
    fn subject_kind(&self) -> SubjectKind {
        self.kind
    }

    async fn delete_subject(&self, subject_id: &str) -> anyhow::Result<bool> {
        match self.client.delete_subject(self.kind, subject_id).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// HTTP deleters for every dependent collection of `kind`
pub fn remote_dependents(client: &ApiClient, kind: SubjectKind) -> Vec<Arc<dyn DependentDeleter>> {
    kind.dependent_kinds()
        .iter()
        .map(|record_kind| {
            Arc::new(RemoteRecordDeleter::new(client.clone(), *record_kind)) as Arc<dyn DependentDeleter>
        })
        .collect()
}

/// Cascade-delete a subject through the API
pub async fn cascade_delete_remote(
    client: &ApiClient,
    cascade: &CascadeDeleter,
    kind: SubjectKind,
    subject_id: &str,
) -> CascadeOutcome {
    let dependents = remote_dependents(client, kind);
    let primary = RemoteSubjectDeleter::new(client.clone(), kind);
    cascade.delete_subject(subject_id, &dependents, &primary).await
}
