use anyhow::Result;
use shared::PeriodSummary;
use std::sync::Arc;
use tracing::info;

use super::aggregation::summarize;
use super::commands::reports::PeriodReportQuery;
use crate::storage::RecordStorage;

/// Monthly totals over stored records
#[derive(Clone)]
pub struct ReportService {
    records: Arc<dyn RecordStorage>,
    currency_symbol: String,
}

impl ReportService {
    pub fn new(records: Arc<dyn RecordStorage>, currency_symbol: impl Into<String>) -> Self {
        Self {
            records,
            currency_symbol: currency_symbol.into(),
        }
    }

    /// Load one record kind and aggregate it for the requested month
    pub async fn period_summary(&self, query: PeriodReportQuery) -> Result<PeriodSummary> {
        info!(
            "Building {} report for {} (subject: {:?})",
            query.kind, query.period, query.subject_id
        );

        let records = self.records.list_records(query.kind).await?;
        let summary = summarize(
            query.kind,
            &records,
            query.period,
            query.subject_id.as_deref(),
            |total| self.format_amount(total),
        );

        info!(
            "{} report for {}: {} records totalling {}",
            query.kind, query.period, summary.count, summary.formatted_total
        );
        Ok(summary)
    }

    /// Format an amount with the configured symbol and Indian digit grouping
    ///
    /// `1234567.5` with `₹` becomes `₹12,34,567.50`; negatives get a leading `-`.
    pub fn format_amount(&self, amount: f64) -> String {
        let fixed = format!("{:.2}", amount.abs());
        let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
        let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
        format!(
            "{}{}{}.{}",
            sign,
            self.currency_symbol,
            group_indian(whole),
            fraction
        )
    }
}

/// `1234567` -> `12,34,567`: the last three digits, then pairs
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), last_three)
}
