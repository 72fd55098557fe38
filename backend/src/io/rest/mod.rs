//! # REST API Interface Layer
//!
//! HTTP endpoints for the CRM, all mounted under `/api`. Every response body is
//! an [`shared::ApiResponse`] envelope, including errors.
//!
//! Record kinds (`/patient-payments`, `/staff-advances`, …) and subject
//! collections (`/doctors`, `/staff`, `/patients`) share the same path shapes,
//! so requests are routed by position and dispatched on the first segment:
//!
//! | path                          | records                        | subjects            |
//! |-------------------------------|--------------------------------|---------------------|
//! | `/{resource}`                 | list, create                   | list, create        |
//! | `/{resource}/{key}`           | get, update, delete by id      | get, update, delete |
//! | `/{resource}/{key}/{target}`  | list/delete by `{kind}/{id}`   | `{id}/cascade`      |
//! | `/reports/{resource}`         | monthly summary                |                     |

pub mod envelope;
pub mod record_apis;
pub mod report_apis;
pub mod subject_apis;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{Json, Response},
    routing::get,
    Router,
};
use serde_json::Value;
use shared::{RecordKind, SubjectKind};
use tracing::info;

use crate::AppState;
use envelope::failure;
use report_apis::ReportParams;

/// What the first path segment refers to
#[derive(Debug, Clone, Copy, PartialEq)]
enum Resource {
    Records(RecordKind),
    Subjects(SubjectKind),
}

impl Resource {
    fn resolve(segment: &str) -> Result<Self, Response> {
        RecordKind::from_path(segment)
            .map(Resource::Records)
            .or_else(|| SubjectKind::from_collection(segment).map(Resource::Subjects))
            .ok_or_else(|| failure(StatusCode::BAD_REQUEST, format!("Unknown resource: {}", segment)))
    }
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, Response> {
    body.map(|Json(value)| value)
        .map_err(|e| failure(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e)))
}

/// Routes for everything under `/api`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/:resource", get(get_report))
        .route("/:resource", get(list_resource).post(create_resource))
        .route(
            "/:resource/:key",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .route(
            "/:resource/:key/:target",
            get(get_nested).delete(delete_nested),
        )
}

async fn list_resource(State(state): State<AppState>, Path(resource): Path<String>) -> Response {
    info!("GET /api/{}", resource);
    match Resource::resolve(&resource) {
        Ok(Resource::Records(kind)) => record_apis::list_records(&state, kind).await,
        Ok(Resource::Subjects(kind)) => subject_apis::list_subjects(&state, kind).await,
        Err(response) => response,
    }
}

async fn create_resource(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    info!("POST /api/{}", resource);
    let resolved = match Resource::resolve(&resource) {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };
    let body = match json_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    match resolved {
        Resource::Records(kind) => record_apis::create_record(&state, kind, body).await,
        Resource::Subjects(kind) => subject_apis::create_subject(&state, kind, body).await,
    }
}

async fn get_resource(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    info!("GET /api/{}/{}", resource, id);
    match Resource::resolve(&resource) {
        Ok(Resource::Records(kind)) => record_apis::get_record(&state, kind, &id).await,
        Ok(Resource::Subjects(kind)) => subject_apis::get_subject(&state, kind, &id).await,
        Err(response) => response,
    }
}

async fn update_resource(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    info!("PUT /api/{}/{}", resource, id);
    let resolved = match Resource::resolve(&resource) {
        Ok(resolved) => resolved,
        Err(response) => return response,
    };
    let body = match json_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    match resolved {
        Resource::Records(kind) => record_apis::update_record(&state, kind, &id, body).await,
        Resource::Subjects(kind) => subject_apis::update_subject(&state, kind, &id, body).await,
    }
}

async fn delete_resource(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    info!("DELETE /api/{}/{}", resource, id);
    match Resource::resolve(&resource) {
        Ok(Resource::Records(kind)) => record_apis::delete_record(&state, kind, &id).await,
        Ok(Resource::Subjects(kind)) => subject_apis::delete_subject(&state, kind, &id).await,
        Err(response) => response,
    }
}

fn subject_kind_segment(segment: &str) -> Result<SubjectKind, Response> {
    SubjectKind::from_segment(segment).ok_or_else(|| {
        failure(
            StatusCode::BAD_REQUEST,
            format!("Unknown subject kind: {}", segment),
        )
    })
}

async fn get_nested(
    State(state): State<AppState>,
    Path((resource, key, target)): Path<(String, String, String)>,
) -> Response {
    info!("GET /api/{}/{}/{}", resource, key, target);
    match Resource::resolve(&resource) {
        Ok(Resource::Records(kind)) => match subject_kind_segment(&key) {
            Ok(subject_kind) => {
                record_apis::list_records_for_subject(&state, kind, subject_kind, &target).await
            }
            Err(response) => response,
        },
        Ok(Resource::Subjects(_)) => failure(
            StatusCode::NOT_FOUND,
            format!("No such endpoint: GET /api/{}/{}/{}", resource, key, target),
        ),
        Err(response) => response,
    }
}

async fn delete_nested(
    State(state): State<AppState>,
    Path((resource, key, target)): Path<(String, String, String)>,
) -> Response {
    info!("DELETE /api/{}/{}/{}", resource, key, target);
    match Resource::resolve(&resource) {
        Ok(Resource::Records(kind)) => match subject_kind_segment(&key) {
            Ok(subject_kind) => {
                record_apis::delete_records_for_subject(&state, kind, subject_kind, &target).await
            }
            Err(response) => response,
        },
        Ok(Resource::Subjects(kind)) if target == "cascade" => {
            subject_apis::cascade_delete_subject(&state, kind, &key).await
        }
        Ok(Resource::Subjects(_)) => failure(
            StatusCode::NOT_FOUND,
            format!("No such endpoint: DELETE /api/{}/{}/{}", resource, key, target),
        ),
        Err(response) => response,
    }
}

async fn get_report(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    params: Result<Query<ReportParams>, QueryRejection>,
) -> Response {
    info!("GET /api/reports/{} - query: {:?}", resource, params);
    let kind = match RecordKind::from_path(&resource) {
        Some(kind) => kind,
        None => {
            return failure(
                StatusCode::BAD_REQUEST,
                format!("No reports for resource: {}", resource),
            )
        }
    };
    match params {
        Ok(Query(params)) => report_apis::period_report(&state, kind, params).await,
        Err(e) => failure(StatusCode::BAD_REQUEST, format!("Invalid report query: {}", e)),
    }
}
