//! Month/year aggregation of dated records.
//!
//! Every page that shows advances, salary payments or test-report charges asks
//! the same question: which records fall in this month, and what do they add
//! up to? This module answers it once.
//!
//! ## Leniency
//!
//! Aggregation never fails. A record whose date is missing or cannot be parsed
//! is excluded from the period; a record whose amount could not be parsed was
//! already coerced to `0.0` when it was deserialised and is still counted.

use shared::{FinancialRecord, PeriodKey, PeriodSummary, RecordKind, SubjectSubtotal};
use std::collections::HashMap;
use tracing::debug;

use super::record_date::parse_record_date;

/// Records of one period together with their total
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate<'a> {
    pub matching: Vec<&'a FinancialRecord>,
    pub total: f64,
    pub count: usize,
}

impl Aggregate<'_> {
    /// Owned copies of the matching records
    pub fn to_records(&self) -> Vec<FinancialRecord> {
        self.matching.iter().map(|r| (*r).clone()).collect()
    }
}

/// The period a record belongs to, if its date can be read
pub fn record_period(record: &FinancialRecord) -> Option<PeriodKey> {
    parse_record_date(&record.date).map(PeriodKey::containing)
}

fn in_period(record: &FinancialRecord, period: PeriodKey) -> bool {
    match parse_record_date(&record.date) {
        Some(date) => period.contains(date),
        None => {
            debug!(
                "Excluding record {} from {}: unreadable date {:?}",
                record.id, period, record.date
            );
            false
        }
    }
}

fn collect<'a, I>(records: I, period: PeriodKey) -> Aggregate<'a>
where
    I: IntoIterator<Item = &'a FinancialRecord>,
{
    let matching: Vec<&FinancialRecord> = records
        .into_iter()
        .filter(|record| in_period(record, period))
        .collect();
    let total = matching.iter().map(|r| r.amount).sum();
    let count = matching.len();
    Aggregate {
        matching,
        total,
        count,
    }
}

/// Filter records to a month and sum their amounts
pub fn aggregate_by_period(records: &[FinancialRecord], period: PeriodKey) -> Aggregate<'_> {
    collect(records, period)
}

/// Same as [`aggregate_by_period`], restricted to one subject first
pub fn aggregate_for_subject<'a>(
    records: &'a [FinancialRecord],
    subject_id: &str,
    period: PeriodKey,
) -> Aggregate<'a> {
    collect(records.iter().filter(|r| r.subject_id == subject_id), period)
}

/// Per-subject totals within a period, ordered by subject name then id
///
/// The name shown is the one captured on the first matching record.
pub fn subtotals_by_subject(records: &[FinancialRecord], period: PeriodKey) -> Vec<SubjectSubtotal> {
    let mut by_subject: HashMap<&str, SubjectSubtotal> = HashMap::new();

    for record in aggregate_by_period(records, period).matching {
        let entry = by_subject
            .entry(record.subject_id.as_str())
            .or_insert_with(|| SubjectSubtotal {
                subject_id: record.subject_id.clone(),
                subject_name: record.subject_name.clone(),
                total: 0.0,
                count: 0,
            });
        entry.total += record.amount;
        entry.count += 1;
    }

    let mut subtotals: Vec<SubjectSubtotal> = by_subject.into_values().collect();
    subtotals.sort_by(|a, b| {
        a.subject_name
            .cmp(&b.subject_name)
            .then_with(|| a.subject_id.cmp(&b.subject_id))
    });
    subtotals
}

/// Build the full summary for a record kind and period
///
/// When `subject_id` is given, the records, total and subtotals are limited to
/// that subject.
pub fn summarize(
    kind: RecordKind,
    records: &[FinancialRecord],
    period: PeriodKey,
    subject_id: Option<&str>,
    formatted_total: impl Fn(f64) -> String,
) -> PeriodSummary {
    let aggregate = match subject_id {
        Some(subject_id) => aggregate_for_subject(records, subject_id, period),
        None => aggregate_by_period(records, period),
    };
    let matching = aggregate.to_records();
    let by_subject = subtotals_by_subject(&matching, period);

    PeriodSummary {
        kind,
        period,
        subject_id: subject_id.map(str::to_string),
        total: aggregate.total,
        formatted_total: formatted_total(aggregate.total),
        count: aggregate.count,
        by_subject,
        records: matching,
    }
}
