use chrono::{Datelike, Months, NaiveDate};

use super::{denominator, finite, non_negative};
use crate::underwriting::errors::{FormulaError, ValidationError};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Daily interest accrual: `((amount / 100) * rate_percent) / day_count_basis`.
///
/// `annual_rate` is a ratio, so `amount * annual_rate` is the same product as
/// `(amount / 100) * rate_percent`.
pub fn per_diem(amount: f64, annual_rate: f64, day_count_basis: f64) -> Result<f64, FormulaError> {
    let amount = non_negative("amount", amount)?;
    let annual_rate = non_negative("prepaid_interest_annual_rate", annual_rate)?;
    let basis = denominator("per_diem_day_count_basis", day_count_basis)?;
    Ok(finite("per_diem", amount * annual_rate / basis)?)
}

pub fn prepaid_interest(per_diem: f64, days: u32) -> Result<f64, FormulaError> {
    let per_diem = non_negative("per_diem", per_diem)?;
    Ok(finite("prepaid_interest", per_diem * f64::from(days))?)
}

/// Days of interest collected at closing: the closing date itself through the last day of its
/// month. The first day of the following month is not counted.
///
/// A loan closing on October 22nd prepays 10 days; one closing on the 1st prepays the whole
/// month.
pub fn days_until_next_month(closing_date: NaiveDate) -> Result<u32, ValidationError> {
    let out_of_range = || ValidationError::DateOutOfRange {
        field: "target_closing_date",
    };

    let month_start = closing_date.with_day(1).ok_or_else(out_of_range)?;
    let next_month = month_start
        .checked_add_months(Months::new(1))
        .ok_or_else(out_of_range)?;

    let days = next_month.signed_duration_since(closing_date).num_days();
    u32::try_from(days).map_err(|_| out_of_range())
}

/// Origination fee: `(amount / 100) * percent`, with `percent` held as a ratio.
pub fn origination_fee(amount: f64, fee_ratio: f64) -> Result<f64, FormulaError> {
    let amount = non_negative("amount", amount)?;
    let fee_ratio = non_negative("origination_fee_percent", fee_ratio)?;
    Ok(finite("origination_fee", amount * fee_ratio)?)
}

pub fn monthly_interest(amount: f64, annual_rate: f64) -> Result<f64, FormulaError> {
    let amount = non_negative("amount", amount)?;
    let annual_rate = non_negative("prepaid_interest_annual_rate", annual_rate)?;
    Ok(finite("monthly_interest", amount * annual_rate / MONTHS_PER_YEAR)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::underwriting::errors::ArithmeticError;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn per_diem_matches_percent_formula() {
        let cases = [
            (100_000.0, 13.0, 360.0),
            (250_000.0, 11.5, 365.0),
            (0.0, 12.0, 360.0),
            (1_234_567.89, 9.75, 360.0),
        ];

        for (amount, rate_percent, basis) in cases {
            let expected = ((amount / 100.0) * rate_percent) / basis;
            let actual = per_diem(amount, rate_percent / 100.0, basis).expect("per diem");
            assert!(
                (actual - expected).abs() < 1e-9,
                "amount {amount} rate {rate_percent}: {actual} != {expected}"
            );
        }
    }

    #[test]
    fn per_diem_golden_value() {
        let value = per_diem(100_000.0, 0.13, 360.0).expect("per diem");
        assert!((value - 36.111_111_111).abs() < 1e-6);
    }

    #[test]
    fn per_diem_rejects_zero_basis() {
        assert_eq!(
            per_diem(100_000.0, 0.13, 0.0),
            Err(FormulaError::Arithmetic(ArithmeticError::ZeroDenominator {
                operand: "per_diem_day_count_basis"
            }))
        );
    }

    #[test]
    fn per_diem_rejects_non_finite_basis() {
        assert!(matches!(
            per_diem(100_000.0, 0.13, f64::INFINITY),
            Err(FormulaError::Arithmetic(
                ArithmeticError::NonFiniteDenominator { .. }
            ))
        ));
    }

    #[test]
    fn prepaid_interest_scales_by_days() {
        let daily = per_diem(100_000.0, 0.13, 360.0).expect("per diem");
        let prepaid = prepaid_interest(daily, 10).expect("prepaid");
        assert!((prepaid - 361.111_111_11).abs() < 1e-6);
        assert_eq!(prepaid_interest(daily, 0).expect("zero days"), 0.0);
    }

    #[test]
    fn prepaid_interest_rejects_negative_per_diem() {
        assert!(matches!(
            prepaid_interest(-1.0, 5),
            Err(FormulaError::Validation(ValidationError::Negative { .. }))
        ));
    }

    #[test]
    fn day_count_golden_fixtures() {
        let fixtures = [
            (date(2025, 10, 22), 10),
            (date(2025, 10, 31), 1),
            (date(2025, 10, 1), 31),
            (date(2025, 12, 15), 17),
            (date(2024, 2, 28), 2),
            (date(2025, 2, 28), 1),
            (date(2025, 4, 1), 30),
        ];

        for (closing, expected) in fixtures {
            assert_eq!(
                days_until_next_month(closing).expect("in range"),
                expected,
                "closing on {closing}"
            );
        }
    }

    #[test]
    fn origination_fee_golden_value() {
        let fee = origination_fee(100_000.0, 0.05).expect("fee");
        assert!((fee - 5_000.0).abs() < 1e-9);
    }

    #[test]
    fn monthly_interest_is_a_twelfth_of_annual() {
        let monthly = monthly_interest(120_000.0, 0.12).expect("monthly");
        assert!((monthly - 1_200.0).abs() < 1e-9);
    }
}
