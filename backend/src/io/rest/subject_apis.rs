//! # REST API for Doctors, Staff and Patients

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use shared::{ApiResponse, CreateSubjectRequest, SubjectKind, UpdateSubjectRequest};
use tracing::{error, info};

use super::envelope::{done, failure, from_error, ok};
use crate::domain::CascadeError;
use crate::AppState;

pub async fn list_subjects(state: &AppState, kind: SubjectKind) -> Response {
    match state.subject_service.list_subjects(kind).await {
        Ok(subjects) => ok(StatusCode::OK, subjects),
        Err(e) => from_error(&format!("Failed to list {}", kind.collection()), e),
    }
}

pub async fn get_subject(state: &AppState, kind: SubjectKind, subject_id: &str) -> Response {
    match state.subject_service.get_subject(kind, subject_id).await {
        Ok(Some(subject)) => ok(StatusCode::OK, subject),
        Ok(None) => failure(
            StatusCode::NOT_FOUND,
            format!("{} {} not found", kind.label(), subject_id),
        ),
        Err(e) => from_error(&format!("Failed to get {} {}", kind, subject_id), e),
    }
}

pub async fn create_subject(state: &AppState, kind: SubjectKind, body: Value) -> Response {
    let request: CreateSubjectRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => return failure(StatusCode::BAD_REQUEST, format!("Invalid {} request: {}", kind, e)),
    };

    match state.subject_service.create_subject(kind, request).await {
        Ok(subject) => ok(StatusCode::CREATED, subject),
        Err(e) => from_error(&format!("Failed to create {}", kind), e),
    }
}

pub async fn update_subject(state: &AppState, kind: SubjectKind, subject_id: &str, body: Value) -> Response {
    let request: UpdateSubjectRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => return failure(StatusCode::BAD_REQUEST, format!("Invalid {} update: {}", kind, e)),
    };

    match state.subject_service.update_subject(kind, subject_id, request).await {
        Ok(subject) => ok(StatusCode::OK, subject),
        Err(e) => from_error(&format!("Failed to update {} {}", kind, subject_id), e),
    }
}

/// Delete the subject row only
pub async fn delete_subject(state: &AppState, kind: SubjectKind, subject_id: &str) -> Response {
    match state.subject_service.delete_subject(kind, subject_id).await {
        Ok(()) => done(format!("{} {} deleted", kind.label(), subject_id)),
        Err(e) => from_error(&format!("Failed to delete {} {}", kind, subject_id), e),
    }
}

/// `DELETE /api/{subjects}/{id}/cascade`
///
/// Responds with the cascade report in every case. A failed primary deletion
/// sets `success: false` and carries the composed error as the message.
pub async fn cascade_delete_subject(state: &AppState, kind: SubjectKind, subject_id: &str) -> Response {
    let outcome = state.subject_service.cascade_delete(kind, subject_id).await;
    let report = outcome.to_report();

    let failed = outcome.failed_dependents();
    if !failed.is_empty() {
        info!(
            "Cascade of {} {} left {} dependent collections uncleaned",
            kind,
            subject_id,
            failed.len()
        );
    }

    match outcome.into_result() {
        Ok(_) => {
            let message = format!("{} {} and its records deleted", kind.label(), subject_id);
            (StatusCode::OK, Json(ApiResponse::ok_with_message(report, message))).into_response()
        }
        Err(e) => {
            let status = match &e {
                CascadeError::PrimaryFailed { cause, .. } => match cause.as_ref() {
                    CascadeError::NotFound { .. } => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                },
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error!("{}", e);
            let body = ApiResponse {
                success: false,
                data: Some(report),
                message: Some(e.to_string()),
            };
            (status, Json(body)).into_response()
        }
    }
}
