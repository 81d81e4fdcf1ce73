//! Deterministic underwriting formulas.
//!
//! Every function is pure and receives the settings snapshot explicitly. Invalid operands come
//! back as [`FormulaError`] values instead of panicking so callers can render feedback per metric.

mod interest;
mod liquidity;

pub use interest::{
    days_until_next_month, monthly_interest, origination_fee, per_diem, prepaid_interest,
};
pub use liquidity::{
    liquidity_ratio, required_liquidity, LiquidityComponents, LiquidityTier, RESERVE_MONTHS,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::errors::{ArithmeticError, FormulaError, ValidationError};
use super::repository::LoanRecord;
use super::settings::UnderwritingSettings;

/// Numeric inputs the formulas read from a loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaInputs {
    pub amount: f64,
    pub appraisal_or_arv: f64,
    pub other_mortgage_monthly_payments: Vec<f64>,
    pub other_mortgage_total_exposure: f64,
    pub target_closing_date: NaiveDate,
    pub liquidity_on_hand: Option<f64>,
    pub credit_score: Option<u16>,
}

impl FormulaInputs {
    pub fn from_loan(loan: &LoanRecord) -> Self {
        let other_mortgages = loan.other_mortgages();
        Self {
            amount: loan.amount,
            appraisal_or_arv: loan.appraisal_or_arv(),
            other_mortgage_monthly_payments: other_mortgages
                .iter()
                .map(|mortgage| mortgage.monthly_payment)
                .collect(),
            other_mortgage_total_exposure: other_mortgages
                .iter()
                .map(|mortgage| mortgage.monthly_carrying_cost)
                .sum(),
            target_closing_date: loan.purchase_details.target_closing_date,
            liquidity_on_hand: loan
                .intake
                .liquidity
                .as_ref()
                .map(|liquidity| liquidity.value.amount),
            credit_score: loan
                .intake
                .credit_score
                .as_ref()
                .map(|score| score.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtvAssessment {
    pub ltv: f64,
    pub max_ltv: f64,
    pub over_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityAssessment {
    pub liquidity_on_hand: f64,
    pub ratio: f64,
    pub tier: LiquidityTier,
}

/// Every metric computed for a loan, produced only when all of them succeed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaResult {
    pub per_diem: f64,
    pub prepaid_days: u32,
    pub prepaid_interest: f64,
    pub origination_fee: f64,
    pub monthly_interest: f64,
    pub required_liquidity: f64,
    /// `None` when the borrower has not reported liquidity yet.
    pub liquidity: Option<LiquidityAssessment>,
    pub ltv: LtvAssessment,
    pub credit_score_meets_minimum: Option<bool>,
    pub other_mortgages_within_limit: bool,
}

/// Strict evaluation: the first failing metric aborts the computation.
pub fn compute_formulas(
    loan: &LoanRecord,
    settings: &UnderwritingSettings,
) -> Result<FormulaResult, FormulaError> {
    compute(&FormulaInputs::from_loan(loan), settings)
}

pub fn compute(
    inputs: &FormulaInputs,
    settings: &UnderwritingSettings,
) -> Result<FormulaResult, FormulaError> {
    let daily = per_diem(
        inputs.amount,
        settings.prepaid_interest_annual_rate,
        settings.per_diem_day_count_basis,
    )?;
    let prepaid_days = days_until_next_month(inputs.target_closing_date)?;
    let prepaid = prepaid_interest(daily, prepaid_days)?;
    let origination = origination_fee(inputs.amount, settings.origination_fee_percent)?;
    let monthly = monthly_interest(inputs.amount, settings.prepaid_interest_annual_rate)?;
    let required = required_liquidity(&components(
        inputs,
        settings,
        monthly,
        origination,
        prepaid,
    ))?;

    let liquidity = match inputs.liquidity_on_hand {
        Some(on_hand) => {
            let ratio = liquidity_ratio(on_hand, required)?;
            Some(LiquidityAssessment {
                liquidity_on_hand: on_hand,
                ratio,
                tier: LiquidityTier::classify(ratio, settings),
            })
        }
        None => None,
    };

    let ltv = assess_ltv(inputs.amount, inputs.appraisal_or_arv, settings)?;

    Ok(FormulaResult {
        per_diem: daily,
        prepaid_days,
        prepaid_interest: prepaid,
        origination_fee: origination,
        monthly_interest: monthly,
        required_liquidity: required,
        liquidity,
        ltv,
        credit_score_meets_minimum: credit_check(inputs, settings),
        other_mortgages_within_limit: other_mortgages_within_limit(inputs, settings),
    })
}

pub fn loan_to_value(amount: f64, appraisal_or_arv: f64) -> Result<f64, FormulaError> {
    let amount = non_negative("amount", amount)?;
    let value = denominator("appraisal_or_arv", appraisal_or_arv)?;
    Ok(amount / value)
}

pub fn assess_ltv(
    amount: f64,
    appraisal_or_arv: f64,
    settings: &UnderwritingSettings,
) -> Result<LtvAssessment, FormulaError> {
    let ltv = loan_to_value(amount, appraisal_or_arv)?;
    Ok(LtvAssessment {
        ltv,
        max_ltv: settings.max_ltv,
        over_threshold: ltv > settings.max_ltv,
    })
}

/// A metric that could not be produced for the pipeline projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableMetric {
    pub metric: String,
    pub reason: String,
}

/// Lenient evaluation used by the pipeline view: each metric is independent and a failure only
/// blanks the metrics that depend on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormulaSummary {
    pub per_diem: Option<f64>,
    pub prepaid_days: Option<u32>,
    pub prepaid_interest: Option<f64>,
    pub origination_fee: Option<f64>,
    pub monthly_interest: Option<f64>,
    pub required_liquidity: Option<f64>,
    pub liquidity: Option<LiquidityAssessment>,
    pub ltv: Option<LtvAssessment>,
    pub credit_score_meets_minimum: Option<bool>,
    pub other_mortgages_within_limit: bool,
    pub unavailable: Vec<UnavailableMetric>,
}

impl FormulaSummary {
    fn record<T, E: std::fmt::Display>(
        &mut self,
        metric: &str,
        result: Result<T, E>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.unavailable.push(UnavailableMetric {
                    metric: metric.to_string(),
                    reason: err.to_string(),
                });
                None
            }
        }
    }

    fn blocked(&mut self, metric: &str, dependency: &str) {
        self.unavailable.push(UnavailableMetric {
            metric: metric.to_string(),
            reason: format!("{dependency} not available"),
        });
    }
}

pub fn summarize_formulas(loan: &LoanRecord, settings: &UnderwritingSettings) -> FormulaSummary {
    summarize(&FormulaInputs::from_loan(loan), settings)
}

pub fn summarize(inputs: &FormulaInputs, settings: &UnderwritingSettings) -> FormulaSummary {
    let mut summary = FormulaSummary::default();

    summary.per_diem = summary.record(
        "per_diem",
        per_diem(
            inputs.amount,
            settings.prepaid_interest_annual_rate,
            settings.per_diem_day_count_basis,
        ),
    );
    summary.prepaid_days = summary.record(
        "prepaid_days",
        days_until_next_month(inputs.target_closing_date),
    );
    summary.prepaid_interest = match (summary.per_diem, summary.prepaid_days) {
        (Some(daily), Some(days)) => {
            summary.record("prepaid_interest", prepaid_interest(daily, days))
        }
        (None, _) => {
            summary.blocked("prepaid_interest", "per_diem");
            None
        }
        (_, None) => {
            summary.blocked("prepaid_interest", "prepaid_days");
            None
        }
    };
    summary.origination_fee = summary.record(
        "origination_fee",
        origination_fee(inputs.amount, settings.origination_fee_percent),
    );
    summary.monthly_interest = summary.record(
        "monthly_interest",
        monthly_interest(inputs.amount, settings.prepaid_interest_annual_rate),
    );

    summary.required_liquidity = match (
        summary.monthly_interest,
        summary.origination_fee,
        summary.prepaid_interest,
    ) {
        (Some(monthly), Some(origination), Some(prepaid)) => summary.record(
            "required_liquidity",
            required_liquidity(&components(
                inputs,
                settings,
                monthly,
                origination,
                prepaid,
            )),
        ),
        _ => {
            summary.blocked("required_liquidity", "an upstream fee or interest metric");
            None
        }
    };

    if let Some(on_hand) = inputs.liquidity_on_hand {
        match summary.required_liquidity {
            Some(required) => {
                summary.liquidity = summary
                    .record("liquidity_ratio", liquidity_ratio(on_hand, required))
                    .map(|ratio| LiquidityAssessment {
                        liquidity_on_hand: on_hand,
                        ratio,
                        tier: LiquidityTier::classify(ratio, settings),
                    });
            }
            None => summary.blocked("liquidity_ratio", "required_liquidity"),
        }
    }

    summary.ltv = summary.record(
        "ltv",
        assess_ltv(inputs.amount, inputs.appraisal_or_arv, settings),
    );
    summary.credit_score_meets_minimum = credit_check(inputs, settings);
    summary.other_mortgages_within_limit = other_mortgages_within_limit(inputs, settings);

    summary
}

fn components<'a>(
    inputs: &'a FormulaInputs,
    settings: &UnderwritingSettings,
    monthly_interest: f64,
    origination_fee: f64,
    prepaid_interest: f64,
) -> LiquidityComponents<'a> {
    LiquidityComponents {
        monthly_interest,
        monthly_service_fee: settings.monthly_service_fee,
        document_preparation_fee: settings.document_preparation_fee,
        closing_cost_estimate: settings.closing_cost_estimate,
        other_mortgage_monthly_payments: &inputs.other_mortgage_monthly_payments,
        other_mortgage_total_exposure: inputs.other_mortgage_total_exposure,
        origination_fee,
        prepaid_interest,
    }
}

fn credit_check(inputs: &FormulaInputs, settings: &UnderwritingSettings) -> Option<bool> {
    inputs
        .credit_score
        .map(|score| score >= settings.min_credit_score)
}

fn other_mortgages_within_limit(inputs: &FormulaInputs, settings: &UnderwritingSettings) -> bool {
    inputs.other_mortgage_monthly_payments.len() <= settings.max_other_mortgage_loans as usize
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite { field });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(value)
}

/// Overflowed results surface as errors instead of an infinite metric.
fn finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NonFinite { field })
    }
}

fn denominator(operand: &'static str, value: f64) -> Result<f64, FormulaError> {
    if !value.is_finite() {
        return Err(ArithmeticError::NonFiniteDenominator { operand }.into());
    }
    if value == 0.0 {
        return Err(ArithmeticError::ZeroDenominator { operand }.into());
    }
    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: operand,
            value,
        }
        .into());
    }
    Ok(value)
}
