//! Reduces an artist's earnings ledger to a trended annual revenue figure.

use chrono::{Datelike, Months, NaiveDate};
use std::collections::BTreeMap;

use crate::errors::AppError;
use crate::models::{EarningsRecord, TrendSummary};

/// Computes `min(12-month total, 2 x 6-month total)` over monthly buckets.
///
/// Windows are anchored on the latest record date and exclusive at their start:
/// a record exactly six months before `latest_date` is outside the 6-month window.
pub fn trended_annual_revenue(records: &[EarningsRecord]) -> Result<TrendSummary, AppError> {
    let mut dated: Vec<(NaiveDate, f64)> = records.iter().map(|r| (r.date, r.amount)).collect();
    dated.sort_by_key(|(date, _)| *date);

    let Some(&(latest_date, _)) = dated.last() else {
        return Err(AppError::InsufficientData(
            "no earnings records were supplied".to_string(),
        ));
    };

    let six_month_start = window_start(latest_date, 6)?;
    let twelve_month_start = window_start(latest_date, 12)?;

    let six_month_total = bucketed_total(dated.iter().filter(|(d, _)| *d > six_month_start));
    let twelve_month_total =
        bucketed_total(dated.iter().filter(|(d, _)| *d > twelve_month_start));

    let trended_annual = twelve_month_total.min(2.0 * six_month_total);

    tracing::debug!(
        "Trended revenue through {}: 6m={:.2} 12m={:.2} trended={:.2}",
        latest_date,
        six_month_total,
        twelve_month_total,
        trended_annual
    );

    Ok(TrendSummary {
        latest_date,
        six_month_total,
        twelve_month_total,
        trended_annual,
    })
}

fn window_start(latest: NaiveDate, months: u32) -> Result<NaiveDate, AppError> {
    latest.checked_sub_months(Months::new(months)).ok_or_else(|| {
        AppError::BadRequest(format!("date {} is out of range", latest))
    })
}

/// Sums per calendar month, then sums the months.
fn bucketed_total<'a>(entries: impl Iterator<Item = &'a (NaiveDate, f64)>) -> f64 {
    let mut buckets: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for (date, amount) in entries {
        *buckets.entry((date.year(), date.month())).or_insert(0.0) += amount;
    }
    buckets.values().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, amount: f64) -> EarningsRecord {
        EarningsRecord {
            artist_id: "A1".to_string(),
            partner_name: "Cinq".to_string(),
            track_title: "Track".to_string(),
            amount,
            currency: "USD".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        }
    }

    #[test]
    fn test_empty_ledger_is_insufficient() {
        assert!(matches!(
            trended_annual_revenue(&[]),
            Err(AppError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_steady_stream_uses_twelve_month_total() {
        let records: Vec<_> = (1..=12)
            .map(|m| record(&format!("2024-{:02}-15", m), 100.0))
            .collect();
        let summary = trended_annual_revenue(&records).unwrap();

        assert_eq!(summary.twelve_month_total, 1200.0);
        assert_eq!(summary.six_month_total, 600.0);
        assert_eq!(summary.trended_annual, 1200.0);
    }

    #[test]
    fn test_declining_recent_months_cap_the_estimate() {
        let mut records: Vec<_> = (1..=6)
            .map(|m| record(&format!("2024-{:02}-10", m), 300.0))
            .collect();
        records.extend((7..=12).map(|m| record(&format!("2024-{:02}-10", m), 50.0)));

        let summary = trended_annual_revenue(&records).unwrap();
        assert_eq!(summary.twelve_month_total, 2100.0);
        assert_eq!(summary.six_month_total, 300.0);
        assert_eq!(summary.trended_annual, 600.0);
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let records = vec![record("2024-01-31", 1000.0), record("2024-07-31", 10.0)];
        let summary = trended_annual_revenue(&records).unwrap();

        // 2024-01-31 is exactly six months before the latest date.
        assert_eq!(summary.six_month_total, 10.0);
        assert_eq!(summary.twelve_month_total, 1010.0);
        assert_eq!(summary.trended_annual, 20.0);
    }

    #[test]
    fn test_old_records_fall_outside_both_windows() {
        let records = vec![record("2020-05-01", 9999.0), record("2024-05-01", 40.0)];
        let summary = trended_annual_revenue(&records).unwrap();

        assert_eq!(summary.twelve_month_total, 40.0);
        assert_eq!(summary.trended_annual, 40.0);
    }

    #[test]
    fn test_same_month_rows_share_a_bucket() {
        let records = vec![
            record("2024-03-01", 10.0),
            record("2024-03-20", 15.0),
            record("2024-02-10", 5.0),
        ];
        let summary = trended_annual_revenue(&records).unwrap();
        assert_eq!(summary.six_month_total, 30.0);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let ordered = vec![record("2024-01-05", 1.0), record("2024-09-05", 2.0)];
        let reversed: Vec<_> = ordered.iter().cloned().rev().collect();

        assert_eq!(
            trended_annual_revenue(&ordered).unwrap(),
            trended_annual_revenue(&reversed).unwrap()
        );
    }
}
