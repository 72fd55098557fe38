//! # REST API for Dated Records
//!
//! Advances, salary payments, test reports, attendance and history entries all
//! share one set of operations, selected by the record kind in the path.

use axum::{http::StatusCode, response::Response};
use serde_json::Value;
use shared::{CreateRecordRequest, DeleteRecordsResponse, RecordKind, SubjectKind, UpdateRecordRequest};
use tracing::info;

use super::envelope::{failure, from_error, ok, ok_with_message};
use crate::AppState;

/// `GET /api/{resource}`
pub async fn list_records(state: &AppState, kind: RecordKind) -> Response {
    match state.record_service.list_records(kind).await {
        Ok(records) => ok(StatusCode::OK, records),
        Err(e) => from_error(&format!("Failed to list {}", kind), e),
    }
}

/// `GET /api/{resource}/{id}`
pub async fn get_record(state: &AppState, kind: RecordKind, record_id: &str) -> Response {
    match state.record_service.get_record(kind, record_id).await {
        Ok(Some(record)) => ok(StatusCode::OK, record),
        Ok(None) => failure(
            StatusCode::NOT_FOUND,
            format!("{} {} not found", kind.label(), record_id),
        ),
        Err(e) => from_error(&format!("Failed to get {} {}", kind, record_id), e),
    }
}

/// `POST /api/{resource}`
pub async fn create_record(state: &AppState, kind: RecordKind, body: Value) -> Response {
    let request: CreateRecordRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            return failure(
                StatusCode::BAD_REQUEST,
                format!("Invalid {} request: {}", kind.label(), e),
            )
        }
    };
    info!("Create {} request: {:?}", kind, request);

    match state.record_service.create_record(kind, request).await {
        Ok(record) => ok(StatusCode::CREATED, record),
        Err(e) => from_error(&format!("Failed to create {}", kind.label()), e),
    }
}

/// `PUT /api/{resource}/{id}`
pub async fn update_record(state: &AppState, kind: RecordKind, record_id: &str, body: Value) -> Response {
    let request: UpdateRecordRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            return failure(
                StatusCode::BAD_REQUEST,
                format!("Invalid {} update: {}", kind.label(), e),
            )
        }
    };

    match state.record_service.update_record(kind, record_id, request).await {
        Ok(record) => ok(StatusCode::OK, record),
        Err(e) => from_error(&format!("Failed to update {} {}", kind, record_id), e),
    }
}

/// `DELETE /api/{resource}/{id}`
pub async fn delete_record(state: &AppState, kind: RecordKind, record_id: &str) -> Response {
    match state.record_service.delete_record(kind, record_id).await {
        Ok(()) => ok_with_message(
            DeleteRecordsResponse { deleted_count: 1 },
            format!("Deleted {} {}", kind.label(), record_id),
        ),
        Err(e) => from_error(&format!("Failed to delete {} {}", kind, record_id), e),
    }
}

/// `GET /api/{resource}/{subjectKind}/{subjectId}`
pub async fn list_records_for_subject(
    state: &AppState,
    kind: RecordKind,
    subject_kind: SubjectKind,
    subject_id: &str,
) -> Response {
    match state
        .record_service
        .list_records_for_subject(kind, subject_kind, subject_id)
        .await
    {
        Ok(records) => ok(StatusCode::OK, records),
        Err(e) => from_error(
            &format!("Failed to list {} of {} {}", kind, subject_kind, subject_id),
            e,
        ),
    }
}

/// `DELETE /api/{resource}/{subjectKind}/{subjectId}`
pub async fn delete_records_for_subject(
    state: &AppState,
    kind: RecordKind,
    subject_kind: SubjectKind,
    subject_id: &str,
) -> Response {
    match state
        .record_service
        .delete_records_for_subject(kind, subject_kind, subject_id)
        .await
    {
        Ok(deleted_count) => ok_with_message(
            DeleteRecordsResponse { deleted_count },
            format!("Deleted {} {} records of {} {}", deleted_count, kind, subject_kind, subject_id),
        ),
        Err(e) => from_error(
            &format!("Failed to delete {} of {} {}", kind, subject_kind, subject_id),
            e,
        ),
    }
}
