//! Growth metrics over the advisor's historical filings.

use chrono::{Duration, NaiveDate};

use crate::models::FilingSnapshot;

/// Lookback window when matching a filing to a target date.
const NEAREST_WINDOW_DAYS: i64 = 183;
/// CAGR requires at least half a year between endpoints.
const MIN_CAGR_YEARS: f64 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct GrowthMetrics {
    pub aum_cagr_1y: Option<f64>,
    pub aum_cagr_3y: Option<f64>,
    pub aum_cagr_5y: Option<f64>,
    pub aum_cagr_all: Option<f64>,
    pub client_cagr_3y: Option<f64>,
    pub employee_cagr_3y: Option<f64>,
    pub client_growth_yoy: Option<f64>,
    pub employee_growth_yoy: Option<f64>,
    /// Filings per year beyond the first, over the filing span.
    pub amendment_frequency: Option<f64>,
}

/// Compute every growth metric from the filing history (oldest first).
pub fn compute_growth(history: &[FilingSnapshot]) -> GrowthMetrics {
    let mut sorted: Vec<&FilingSnapshot> = history.iter().collect();
    sorted.sort_by_key(|f| f.filing_date);

    GrowthMetrics {
        aum_cagr_1y: period_cagr(&sorted, 1.0, |f| f.total_aum),
        aum_cagr_3y: period_cagr(&sorted, 3.0, |f| f.total_aum),
        aum_cagr_5y: period_cagr(&sorted, 5.0, |f| f.total_aum),
        aum_cagr_all: all_time_cagr(&sorted, |f| f.total_aum),
        client_cagr_3y: period_cagr(&sorted, 3.0, |f| f.total_accounts),
        employee_cagr_3y: period_cagr(&sorted, 3.0, |f| f.total_employees),
        client_growth_yoy: yoy_growth(&sorted, |f| f.total_clients.or(f.total_accounts)),
        employee_growth_yoy: yoy_growth(&sorted, |f| f.total_employees),
        amendment_frequency: amendment_frequency(&sorted),
    }
}

/// `(end/start)^(1/years) - 1`, defined only for positive endpoints at least
/// half a year apart.
fn cagr(start: i64, end: i64, years: f64) -> Option<f64> {
    if start <= 0 || end <= 0 || years < MIN_CAGR_YEARS {
        return None;
    }
    Some((end as f64 / start as f64).powf(1.0 / years) - 1.0)
}

fn years_between(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64 / 365.25
}

/// All-time CAGR between the oldest and newest filing carrying the field.
fn all_time_cagr(
    sorted: &[&FilingSnapshot],
    field: fn(&FilingSnapshot) -> Option<i64>,
) -> Option<f64> {
    let with_field: Vec<&&FilingSnapshot> = sorted.iter().filter(|f| field(f).is_some()).collect();
    let first = with_field.first()?;
    let last = with_field.last()?;
    cagr(field(first)?, field(last)?, years_between(first.filing_date, last.filing_date))
}

/// CAGR against the filing nearest `latest - years`, within a six-month
/// window either side.
fn period_cagr(
    sorted: &[&FilingSnapshot],
    years: f64,
    field: fn(&FilingSnapshot) -> Option<i64>,
) -> Option<f64> {
    let latest = sorted.iter().rev().find(|f| field(f).is_some())?;
    let target = latest.filing_date - Duration::days((years * 365.25) as i64);

    let baseline = sorted
        .iter()
        .filter(|f| field(f).is_some() && f.filing_date < latest.filing_date)
        .min_by_key(|f| (f.filing_date - target).num_days().abs())?;
    if (baseline.filing_date - target).num_days().abs() > NEAREST_WINDOW_DAYS {
        return None;
    }

    cagr(
        field(baseline)?,
        field(latest)?,
        years_between(baseline.filing_date, latest.filing_date),
    )
}

/// Fractional growth between the two most recent filings carrying the field.
fn yoy_growth(
    sorted: &[&FilingSnapshot],
    field: impl Fn(&FilingSnapshot) -> Option<i64>,
) -> Option<f64> {
    let mut recent = sorted.iter().rev().filter(|f| field(f).is_some());
    let latest = recent.next()?;
    let previous = recent.next()?;
    let (new, old) = (field(latest)?, field(previous)?);
    if old <= 0 {
        return None;
    }
    Some((new - old) as f64 / old as f64)
}

fn amendment_frequency(sorted: &[&FilingSnapshot]) -> Option<f64> {
    let first = sorted.first()?;
    let last = sorted.last()?;
    let years = years_between(first.filing_date, last.filing_date);
    if years < MIN_CAGR_YEARS {
        return None;
    }
    Some((sorted.len() as f64 - 1.0) / years)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(date: &str, aum: i64, accounts: i64, employees: i64) -> FilingSnapshot {
        FilingSnapshot {
            crd_number: 1,
            filing_date: date.parse().unwrap(),
            filing_type: Some("annual".to_string()),
            total_aum: Some(aum),
            total_accounts: Some(accounts),
            total_employees: Some(employees),
            total_clients: Some(accounts),
        }
    }

    #[test]
    fn test_all_time_cagr() {
        let history = vec![
            snapshot("2020-03-31", 100_000_000, 100, 10),
            snapshot("2024-03-31", 200_000_000, 160, 14),
        ];
        let growth = compute_growth(&history);
        // Doubling over four years: 2^(1/4) - 1.
        let expected = 2.0_f64.powf(0.25) - 1.0;
        assert!((growth.aum_cagr_all.unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_one_year_cagr_uses_nearest_filing() {
        let history = vec![
            snapshot("2022-03-31", 90_000_000, 90, 9),
            // Nearest to latest - 1y (2023-03-31): two months off, in window.
            snapshot("2023-05-20", 100_000_000, 100, 10),
            snapshot("2024-03-31", 112_000_000, 108, 11),
        ];
        let growth = compute_growth(&history);
        let one_year = growth.aum_cagr_1y.unwrap();
        let years = years_between("2023-05-20".parse().unwrap(), "2024-03-31".parse().unwrap());
        let expected = (112.0_f64 / 100.0).powf(1.0 / years) - 1.0;
        assert!((one_year - expected).abs() < 1e-9);
    }

    #[test]
    fn test_window_miss_yields_none() {
        // Only filings years apart: nothing within six months of latest - 1y.
        let history = vec![
            snapshot("2019-03-31", 90_000_000, 90, 9),
            snapshot("2024-03-31", 112_000_000, 108, 11),
        ];
        let growth = compute_growth(&history);
        assert!(growth.aum_cagr_1y.is_none());
        assert!(growth.aum_cagr_all.is_some());
    }

    #[test]
    fn test_cagr_rejects_bad_endpoints() {
        assert!(cagr(0, 100, 2.0).is_none());
        assert!(cagr(100, 0, 2.0).is_none());
        assert!(cagr(100, 200, 0.2).is_none());
        assert!(cagr(100, 200, 0.5).is_some());
    }

    #[test]
    fn test_yoy_uses_two_most_recent() {
        let history = vec![
            snapshot("2022-03-31", 1, 100, 20),
            snapshot("2023-03-31", 1, 110, 20),
            snapshot("2024-03-31", 1, 121, 22),
        ];
        let growth = compute_growth(&history);
        assert!((growth.client_growth_yoy.unwrap() - 0.10).abs() < 1e-9);
        assert!((growth.employee_growth_yoy.unwrap() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_amendment_frequency() {
        let history = vec![
            snapshot("2022-01-01", 1, 1, 1),
            snapshot("2023-01-01", 1, 1, 1),
            snapshot("2023-07-01", 1, 1, 1),
            snapshot("2024-01-01", 1, 1, 1),
        ];
        let growth = compute_growth(&history);
        // Three filings beyond the first over two years.
        assert!((growth.amendment_frequency.unwrap() - 1.5).abs() < 0.01);
    }

    #[test]
    fn test_empty_history() {
        let growth = compute_growth(&[]);
        assert!(growth.aum_cagr_all.is_none());
        assert!(growth.amendment_frequency.is_none());
    }
}
