//! Wire types shared between the clinic CRM server and its clients.
//!
//! Every REST response is wrapped in [`ApiResponse`]. Records and subjects are
//! plain serde structs; loosely typed fields (`amount`, ids) are coerced on the
//! way in by the helpers in [`amount`].

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod amount;

pub use amount::{parse_amount_text, to_amount};

/// Kind of subject a record can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Doctor,
    Staff,
    Patient,
}

impl SubjectKind {
    pub const ALL: [SubjectKind; 3] = [SubjectKind::Doctor, SubjectKind::Staff, SubjectKind::Patient];

    /// Singular path segment used in subject-scoped record routes
    /// (`/patient-payments/patient/P7`)
    pub fn segment(&self) -> &'static str {
        match self {
            SubjectKind::Doctor => "doctor",
            SubjectKind::Staff => "staff",
            SubjectKind::Patient => "patient",
        }
    }

    /// Collection path for the subjects themselves (`/patients/P7`)
    pub fn collection(&self) -> &'static str {
        match self {
            SubjectKind::Doctor => "doctors",
            SubjectKind::Staff => "staff",
            SubjectKind::Patient => "patients",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.segment() == segment)
    }

    pub fn from_collection(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.collection() == path)
    }

    /// Record kinds that reference a subject of this kind and must be
    /// removed before the subject itself
    pub fn dependent_kinds(&self) -> &'static [RecordKind] {
        match self {
            SubjectKind::Doctor => &[RecordKind::DoctorAdvance],
            SubjectKind::Staff => &[RecordKind::StaffAdvance, RecordKind::StaffSalary],
            SubjectKind::Patient => &[
                RecordKind::PatientAttendance,
                RecordKind::PatientHistory,
                RecordKind::PatientPayment,
                RecordKind::TestReport,
            ],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubjectKind::Doctor => "Doctor",
            SubjectKind::Staff => "Staff member",
            SubjectKind::Patient => "Patient",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Kind of dated record stored by the CRM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    StaffAdvance,
    StaffSalary,
    DoctorAdvance,
    TestReport,
    PatientAttendance,
    PatientHistory,
    PatientPayment,
}

impl RecordKind {
    pub const ALL: [RecordKind; 7] = [
        RecordKind::StaffAdvance,
        RecordKind::StaffSalary,
        RecordKind::DoctorAdvance,
        RecordKind::TestReport,
        RecordKind::PatientAttendance,
        RecordKind::PatientHistory,
        RecordKind::PatientPayment,
    ];

    /// REST collection path, also used as the storage file stem
    pub fn path(&self) -> &'static str {
        match self {
            RecordKind::StaffAdvance => "staff-advances",
            RecordKind::StaffSalary => "staff-salaries",
            RecordKind::DoctorAdvance => "doctor-advances",
            RecordKind::TestReport => "test-reports",
            RecordKind::PatientAttendance => "patient-attendance",
            RecordKind::PatientHistory => "patient-history",
            RecordKind::PatientPayment => "patient-payments",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.path() == path)
    }

    /// The kind of subject every record of this kind points at
    pub fn subject_kind(&self) -> SubjectKind {
        match self {
            RecordKind::StaffAdvance | RecordKind::StaffSalary => SubjectKind::Staff,
            RecordKind::DoctorAdvance => SubjectKind::Doctor,
            RecordKind::TestReport
            | RecordKind::PatientAttendance
            | RecordKind::PatientHistory
            | RecordKind::PatientPayment => SubjectKind::Patient,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::StaffAdvance => "staff advance",
            RecordKind::StaffSalary => "salary payment",
            RecordKind::DoctorAdvance => "doctor advance",
            RecordKind::TestReport => "test report",
            RecordKind::PatientAttendance => "attendance entry",
            RecordKind::PatientHistory => "history entry",
            RecordKind::PatientPayment => "patient payment",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Whether a subject is currently on the books
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectStatus {
    #[default]
    Active,
    Inactive,
}

impl SubjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectStatus::Active => "active",
            SubjectStatus::Inactive => "inactive",
        }
    }

    /// Anything that is not explicitly inactive is treated as active
    pub fn parse_lenient(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("inactive") {
            SubjectStatus::Inactive
        } else {
            SubjectStatus::Active
        }
    }
}

/// A dated record: advance, salary payment, test-report charge, attendance or
/// history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    #[serde(deserialize_with = "amount::deserialize_id")]
    pub id: String,
    /// Owning doctor, staff member or patient
    #[serde(alias = "subjectId", deserialize_with = "amount::deserialize_id")]
    pub subject_id: String,
    /// Display name captured when the record was created
    #[serde(default, alias = "subjectName", deserialize_with = "amount::deserialize_text")]
    pub subject_name: String,
    /// `YYYY-MM-DD`, or `DD/MM/YYYY` in legacy data; empty when unknown
    #[serde(default, deserialize_with = "amount::deserialize_text")]
    pub date: String,
    /// Already coerced; unparsable input arrives here as 0.0
    #[serde(default, deserialize_with = "amount::deserialize_amount")]
    pub amount: f64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A doctor, staff member or patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(deserialize_with = "amount::deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: SubjectStatus,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Response envelope used by every endpoint
///
/// `success: false` is a domain failure even when the HTTP status is 2xx.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Body of `POST /{resource}`: a record without its id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRecordRequest {
    #[serde(alias = "subjectId", deserialize_with = "amount::deserialize_id")]
    pub subject_id: String,
    /// Looked up from the subject when left empty
    #[serde(default, alias = "subjectName")]
    pub subject_name: String,
    pub date: String,
    #[serde(default, deserialize_with = "amount::deserialize_amount")]
    pub amount: f64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `PUT /{resource}/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateRecordRequest {
    #[serde(default, alias = "subjectName")]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "amount::deserialize_optional_amount")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSubjectRequest {
    pub name: String,
    #[serde(default)]
    pub status: Option<SubjectStatus>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateSubjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<SubjectStatus>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of a bulk or single delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRecordsResponse {
    pub deleted_count: usize,
}

/// A calendar month used as the aggregation granularity
///
/// Months are always 1-based. Callers holding 0-based month state convert
/// with [`PeriodKey::from_zero_based`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriodKey")]
pub struct PeriodKey {
    pub month: u32,
    pub year: i32,
}

#[derive(Deserialize)]
struct RawPeriodKey {
    month: u32,
    year: i32,
}

impl TryFrom<RawPeriodKey> for PeriodKey {
    type Error = PeriodError;

    fn try_from(raw: RawPeriodKey) -> Result<Self, Self::Error> {
        PeriodKey::new(raw.month, raw.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("Month must be between 1 and 12, got {0}")]
    MonthOutOfRange(u32),
    #[error("Zero-based month must be between 0 and 11, got {0}")]
    ZeroBasedMonthOutOfRange(u32),
}

impl PeriodKey {
    pub fn new(month: u32, year: i32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::MonthOutOfRange(month));
        }
        Ok(Self { month, year })
    }

    /// Build from a 0-based month index (January = 0)
    pub fn from_zero_based(month_index: u32, year: i32) -> Result<Self, PeriodError> {
        if month_index > 11 {
            return Err(PeriodError::ZeroBasedMonthOutOfRange(month_index));
        }
        Ok(Self {
            month: month_index + 1,
            year,
        })
    }

    /// The period a calendar date falls in
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            year: date.year(),
        }
    }

    /// The period of today's local date
    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.month() == self.month && date.year() == self.year
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Total of one subject's records within a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSubtotal {
    pub subject_id: String,
    pub subject_name: String,
    pub total: f64,
    pub count: usize,
}

/// Aggregated view of one record kind for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub kind: RecordKind,
    pub period: PeriodKey,
    /// Set when the summary was restricted to one subject
    #[serde(default)]
    pub subject_id: Option<String>,
    pub total: f64,
    pub formatted_total: String,
    pub count: usize,
    pub by_subject: Vec<SubjectSubtotal>,
    pub records: Vec<FinancialRecord>,
}

/// What happened to one dependent collection during a cascade delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependentDeletion {
    pub kind: RecordKind,
    /// Rows removed, when the deletion succeeded
    #[serde(default)]
    pub deleted_count: Option<usize>,
    /// Failure description, when it did not
    #[serde(default)]
    pub error: Option<String>,
}

/// Report returned by `DELETE /{subjects}/{id}/cascade`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub subject_kind: SubjectKind,
    pub subject_id: String,
    pub dependents: Vec<DependentDeletion>,
    pub primary_deleted: bool,
}
