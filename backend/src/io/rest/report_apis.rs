//! # REST API for Monthly Reports

use axum::{http::StatusCode, response::Response};
use serde::Deserialize;
use shared::{PeriodKey, RecordKind};

use super::envelope::{failure, from_error, ok};
use crate::domain::commands::reports::PeriodReportQuery;
use crate::AppState;

/// Query string of `GET /api/reports/{resource}`
///
/// Missing `month`/`year` fall back to the current month.
#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    pub month: Option<u32>,
    pub year: Option<i32>,
    #[serde(alias = "subjectId")]
    pub subject_id: Option<String>,
}

impl ReportParams {
    fn into_query(self, kind: RecordKind) -> Result<PeriodReportQuery, shared::PeriodError> {
        let current = PeriodKey::current();
        let period = PeriodKey::new(
            self.month.unwrap_or(current.month),
            self.year.unwrap_or(current.year),
        )?;
        Ok(PeriodReportQuery {
            kind,
            period,
            subject_id: self.subject_id.filter(|id| !id.trim().is_empty()),
        })
    }
}

pub async fn period_report(state: &AppState, kind: RecordKind, params: ReportParams) -> Response {
    let query = match params.into_query(kind) {
        Ok(query) => query,
        Err(e) => return failure(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.report_service.period_summary(query).await {
        Ok(summary) => ok(StatusCode::OK, summary),
        Err(e) => from_error(&format!("Failed to build {} report", kind), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_default_to_current_month() {
        let query = ReportParams::default().into_query(RecordKind::TestReport).unwrap();
        assert_eq!(query.period, PeriodKey::current());
        assert_eq!(query.subject_id, None);
    }

    #[test]
    fn test_params_reject_bad_month() {
        let params = ReportParams {
            month: Some(13),
            year: Some(2025),
            subject_id: None,
        };
        assert!(params.into_query(RecordKind::TestReport).is_err());
    }

    #[test]
    fn test_blank_subject_is_ignored() {
        let params = ReportParams {
            month: Some(3),
            year: Some(2025),
            subject_id: Some(" ".to_string()),
        };
        let query = params.into_query(RecordKind::StaffAdvance).unwrap();
        assert_eq!(query.subject_id, None);
        assert_eq!(query.period, PeriodKey::new(3, 2025).unwrap());
    }
}
