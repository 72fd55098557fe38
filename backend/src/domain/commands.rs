//! Domain-level query types
//! These are used by services inside the domain layer and are **not** exposed
//! over the public API. The REST layer maps query strings onto them.

pub mod reports {
    use shared::{PeriodKey, RecordKind};

    /// Which records a period report covers
    #[derive(Debug, Clone, PartialEq)]
    pub struct PeriodReportQuery {
        pub kind: RecordKind,
        pub period: PeriodKey,
        /// Restrict the report to one doctor, staff member or patient
        pub subject_id: Option<String>,
    }
}
