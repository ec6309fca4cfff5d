//! Advance pricing: discounted declining annuity, payment schedule and quotes.

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::errors::AppError;
use crate::models::{
    total_periods, AdvanceQuote, FundingConfig, Frequency, PaymentSchedule, TrendSummary,
};

/// Minimum advance, in the ledger currency, that qualifies for funding.
pub const QUALIFICATION_FLOOR: f64 = 1000.0;
/// Days between a quote and the assumed funding date.
pub const FUNDING_OFFSET_DAYS: u64 = 15;

/// Present value of the payments the advance is repaid from.
///
/// Each period pays `trended * (1 - cushion) / periods_per_year`, shrinking by
/// `decline_rate` per period and discounted at `discount_rate / periods_per_year`.
pub fn present_value(trended_annual: f64, config: &FundingConfig) -> Result<f64, AppError> {
    validate_inputs(trended_annual, config)?;

    let periods_per_year = f64::from(config.frequency.periods_per_year());
    let periods = config.total_periods();
    let periodic_payment = trended_annual * (1.0 - config.cushion) / periods_per_year;
    let periodic_discount_rate = config.discount_rate / periods_per_year;

    let retained = 1.0 - config.decline_rate;
    let growth = 1.0 + periodic_discount_rate;

    let mut total = 0.0;
    let mut payment = periodic_payment;
    let mut discount = growth;
    for _ in 0..periods {
        total += payment / discount;
        payment *= retained;
        discount *= growth;
    }

    if !total.is_finite() {
        return Err(AppError::CalculationError(format!(
            "present value overflowed for trended revenue {} over {} periods",
            trended_annual, periods
        )));
    }

    Ok(total)
}

fn validate_inputs(trended_annual: f64, config: &FundingConfig) -> Result<(), AppError> {
    if !trended_annual.is_finite() || trended_annual < 0.0 {
        return Err(AppError::CalculationError(format!(
            "trended revenue must be a non-negative number, got {}",
            trended_annual
        )));
    }
    for (name, rate) in [
        ("cushion", config.cushion),
        ("decline_rate", config.decline_rate),
        ("discount_rate", config.discount_rate),
    ] {
        if !(0.0..1.0).contains(&rate) {
            return Err(AppError::CalculationError(format!(
                "{} for partner '{}' must be in [0, 1), got {}",
                name, config.partner_name, rate
            )));
        }
    }
    if !config.term_years.is_finite() || config.term_years <= 0.0 {
        return Err(AppError::CalculationError(format!(
            "term_years for partner '{}' must be positive, got {}",
            config.partner_name, config.term_years
        )));
    }
    Ok(())
}

/// Legacy flat projection: `trended * (1 - cushion) * (1 - discount_rate) * term_years`.
pub fn closed_form_projection(
    trended_annual: f64,
    cushion: f64,
    discount_rate: f64,
    term_years: f64,
) -> f64 {
    trended_annual * (1.0 - cushion) * (1.0 - discount_rate) * term_years
}

/// Payment dates for an advance quoted on `today`.
///
/// Funding is assumed `FUNDING_OFFSET_DAYS` out; the first payment lands on the first
/// day of the following month and the last one `total_periods` months later, less a day.
pub fn project_schedule(
    today: NaiveDate,
    term_years: f64,
    frequency: Frequency,
) -> Result<PaymentSchedule, AppError> {
    let out_of_range =
        || AppError::CalculationError(format!("schedule from {} is out of range", today));

    let fund_date = today
        .checked_add_days(Days::new(FUNDING_OFFSET_DAYS))
        .ok_or_else(out_of_range)?;
    let first_payment_date = fund_date
        .with_day(1)
        .and_then(|d| d.checked_add_months(Months::new(1)))
        .ok_or_else(out_of_range)?;
    let last_payment_date = first_payment_date
        .checked_add_months(Months::new(total_periods(term_years, frequency)))
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(out_of_range)?;

    Ok(PaymentSchedule {
        first_payment_date,
        last_payment_date,
    })
}

/// Prices an advance from a trend summary and the partner's funding terms.
pub fn quote_advance(
    trend: &TrendSummary,
    config: &FundingConfig,
    currency: &str,
    today: NaiveDate,
) -> Result<AdvanceQuote, AppError> {
    let value = present_value(trend.trended_annual, config)?;
    let amount = round_cents(value);
    let schedule = project_schedule(today, config.term_years, config.frequency)?;

    tracing::info!(
        "Advance for partner '{}': {:.2} {} over {} period(s)",
        config.partner_name,
        amount,
        currency,
        config.total_periods()
    );

    Ok(AdvanceQuote {
        amount,
        currency: currency.to_string(),
        qualifies: amount >= QUALIFICATION_FLOOR,
        schedule,
    })
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
