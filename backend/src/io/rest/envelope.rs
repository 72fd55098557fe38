//! Building `{ success, data?, message? }` responses and mapping domain errors
//! onto status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use shared::{ApiResponse, PeriodError};
use tracing::error;

use crate::domain::{NotFoundError, RecordValidationError, SubjectValidationError};

pub fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(ApiResponse::ok(data))).into_response()
}

pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok_with_message(data, message))).into_response()
}

/// Success that carries only a message
pub fn done(message: impl Into<String>) -> Response {
    let body = ApiResponse::<()> {
        success: true,
        data: None,
        message: Some(message.into()),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::failure(message))).into_response()
}

/// Status code for a failed service call
///
/// Validation failures are 400, missing ids 404, anything else is treated as
/// a storage failure.
pub fn status_for(e: &anyhow::Error) -> StatusCode {
    if e.downcast_ref::<RecordValidationError>().is_some()
        || e.downcast_ref::<SubjectValidationError>().is_some()
        || e.downcast_ref::<PeriodError>().is_some()
    {
        StatusCode::BAD_REQUEST
    } else if e.downcast_ref::<NotFoundError>().is_some() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Log a failed service call and turn it into an envelope response
pub fn from_error(context: &str, e: anyhow::Error) -> Response {
    let status = status_for(&e);
    if status.is_server_error() {
        error!("{}: {:#}", context, e);
        failure(status, format!("{}: {}", context, e))
    } else {
        tracing::warn!("{}: {}", context, e);
        failure(status, e.to_string())
    }
}
