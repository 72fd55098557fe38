use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared::{
    ApiResponse, CascadeReport, CreateRecordRequest, CreateSubjectRequest, DeleteRecordsResponse,
    FinancialRecord, PeriodKey, PeriodSummary, RecordKind, Subject, SubjectKind,
    UpdateRecordRequest, UpdateSubjectRequest,
};
use std::time::Duration;
use tracing::debug;

/// Message used when the server reports `success: false` without saying why
pub const DEFAULT_FAILURE_MESSAGE: &str = "Request was not successful";

/// Why a call to the CRM API failed
///
/// `Transport` and `Status` mean the request never produced a usable answer;
/// `Domain` means the server answered and refused.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Could not decode response: {0}")]
    Decode(String),
    #[error("{message}")]
    Domain { message: String },
    #[error("Invalid base URL {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status: 404, .. })
    }
}

/// Typed client for the `/api` endpoints
///
/// Every method returns the envelope's `data` on success. Failed calls leave
/// nothing behind on the caller's side; there is no client-side cache to
/// invalidate.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `{base}/api/{segments...}`, each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    /// Send a request and unwrap the envelope
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let envelope: ApiResponse<T> = self.send_envelope(request).await?;
        envelope
            .data
            .ok_or_else(|| ClientError::Decode("Response carried no data".to_string()))
    }

    /// Send a request whose successful response carries no data
    async fn send_unit(&self, request: RequestBuilder) -> Result<(), ClientError> {
        let _: ApiResponse<Value> = self.send_envelope(request).await?;
        Ok(())
    }

    async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiResponse<Value>>(&bytes)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown status").to_string());
            debug!("API call failed with {}: {}", status, message);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiResponse<T> =
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))?;
        if !envelope.success {
            return Err(ClientError::Domain {
                message: envelope
                    .message
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            });
        }
        Ok(envelope)
    }

    fn get(&self, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        Ok(self.http.get(self.url(segments)?))
    }

    fn post<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> Result<RequestBuilder, ClientError> {
        Ok(self.http.post(self.url(segments)?).json(body))
    }

    fn put<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> Result<RequestBuilder, ClientError> {
        Ok(self.http.put(self.url(segments)?).json(body))
    }

    fn delete(&self, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        Ok(self.http.delete(self.url(segments)?))
    }

    // Records

    pub async fn list_records(&self, kind: RecordKind) -> Result<Vec<FinancialRecord>, ClientError> {
        self.send(self.get(&[kind.path()])?).await
    }

    pub async fn get_record(&self, kind: RecordKind, record_id: &str) -> Result<FinancialRecord, ClientError> {
        self.send(self.get(&[kind.path(), record_id])?).await
    }

    pub async fn list_records_for_subject(
        &self,
        kind: RecordKind,
        subject_id: &str,
    ) -> Result<Vec<FinancialRecord>, ClientError> {
        self.send(self.get(&[kind.path(), kind.subject_kind().segment(), subject_id])?)
            .await
    }

    pub async fn create_record(
        &self,
        kind: RecordKind,
        request: &CreateRecordRequest,
    ) -> Result<FinancialRecord, ClientError> {
        self.send(self.post(&[kind.path()], request)?).await
    }

    pub async fn update_record(
        &self,
        kind: RecordKind,
        record_id: &str,
        request: &UpdateRecordRequest,
    ) -> Result<FinancialRecord, ClientError> {
        self.send(self.put(&[kind.path(), record_id], request)?).await
    }

    pub async fn delete_record(&self, kind: RecordKind, record_id: &str) -> Result<(), ClientError> {
        self.send_unit(self.delete(&[kind.path(), record_id])?).await
    }

    /// Delete every record of `kind` for a subject, returning how many went
    pub async fn delete_records_for_subject(
        &self,
        kind: RecordKind,
        subject_id: &str,
    ) -> Result<usize, ClientError> {
        let request = self.delete(&[kind.path(), kind.subject_kind().segment(), subject_id])?;
        let response: DeleteRecordsResponse = self.send(request).await?;
        Ok(response.deleted_count)
    }

    // Subjects

    pub async fn list_subjects(&self, kind: SubjectKind) -> Result<Vec<Subject>, ClientError> {
        self.send(self.get(&[kind.collection()])?).await
    }

    pub async fn get_subject(&self, kind: SubjectKind, subject_id: &str) -> Result<Subject, ClientError> {
        self.send(self.get(&[kind.collection(), subject_id])?).await
    }

    pub async fn create_subject(
        &self,
        kind: SubjectKind,
        request: &CreateSubjectRequest,
    ) -> Result<Subject, ClientError> {
        self.send(self.post(&[kind.collection()], request)?).await
    }

    pub async fn update_subject(
        &self,
        kind: SubjectKind,
        subject_id: &str,
        request: &UpdateSubjectRequest,
    ) -> Result<Subject, ClientError> {
        self.send(self.put(&[kind.collection(), subject_id], request)?)
            .await
    }

    /// Delete the subject row only
    pub async fn delete_subject(&self, kind: SubjectKind, subject_id: &str) -> Result<(), ClientError> {
        self.send_unit(self.delete(&[kind.collection(), subject_id])?)
            .await
    }

    /// Ask the server to run the cascade itself
    pub async fn cascade_delete_subject(
        &self,
        kind: SubjectKind,
        subject_id: &str,
    ) -> Result<CascadeReport, ClientError> {
        self.send(self.delete(&[kind.collection(), subject_id, "cascade"])?)
            .await
    }

    // Reports

    pub async fn period_report(
        &self,
        kind: RecordKind,
        period: PeriodKey,
        subject_id: Option<&str>,
    ) -> Result<PeriodSummary, ClientError> {
        let mut request = self
            .get(&["reports", kind.path()])?
            .query(&[("month", period.month.to_string()), ("year", period.year.to_string())]);
        if let Some(subject_id) = subject_id {
            request = request.query(&[("subject_id", subject_id)]);
        }
        self.send(request).await
    }
}
