use serde::{Deserialize, Serialize};

use super::{denominator, finite, non_negative};
use crate::underwriting::errors::FormulaError;
use crate::underwriting::settings::UnderwritingSettings;

/// Months of carrying costs the borrower must hold in reserve.
pub const RESERVE_MONTHS: f64 = 6.0;

/// Additive terms of the liquidity requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityComponents<'a> {
    pub monthly_interest: f64,
    pub monthly_service_fee: f64,
    pub document_preparation_fee: f64,
    pub closing_cost_estimate: f64,
    pub other_mortgage_monthly_payments: &'a [f64],
    pub other_mortgage_total_exposure: f64,
    pub origination_fee: f64,
    pub prepaid_interest: f64,
}

pub fn required_liquidity(components: &LiquidityComponents<'_>) -> Result<f64, FormulaError> {
    let monthly_interest = non_negative("monthly_interest", components.monthly_interest)?;
    let service_fee = non_negative("monthly_service_fee", components.monthly_service_fee)?;
    let document_fee = non_negative(
        "document_preparation_fee",
        components.document_preparation_fee,
    )?;
    let closing_costs = non_negative("closing_cost_estimate", components.closing_cost_estimate)?;
    let exposure = non_negative(
        "other_mortgage_total_exposure",
        components.other_mortgage_total_exposure,
    )?;
    let origination = non_negative("origination_fee", components.origination_fee)?;
    let prepaid = non_negative("prepaid_interest", components.prepaid_interest)?;

    let mut other_payments = 0.0;
    for payment in components.other_mortgage_monthly_payments {
        other_payments += non_negative("other_mortgage_monthly_payment", *payment)?;
    }

    let total = monthly_interest * RESERVE_MONTHS
        + service_fee
        + document_fee
        + closing_costs
        + other_payments * RESERVE_MONTHS
        + exposure * RESERVE_MONTHS
        + origination
        + prepaid;
    Ok(finite("required_liquidity", total)?)
}

pub fn liquidity_ratio(liquidity_on_hand: f64, required: f64) -> Result<f64, FormulaError> {
    let on_hand = non_negative("liquidity_on_hand", liquidity_on_hand)?;
    let required = denominator("required_liquidity", required)?;
    Ok(on_hand / required)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityTier {
    Insufficient,
    Acceptable,
    Excellent,
}

impl LiquidityTier {
    pub fn classify(ratio: f64, settings: &UnderwritingSettings) -> Self {
        if ratio >= settings.excellent_liquidity_ratio {
            Self::Excellent
        } else if ratio >= settings.acceptable_liquidity_ratio {
            Self::Acceptable
        } else {
            Self::Insufficient
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Insufficient => "insufficient",
            Self::Acceptable => "acceptable",
            Self::Excellent => "excellent",
        }
    }
}
