use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

const PERCENT_SCALE: f64 = 100.0;

/// Tunable underwriting knobs. Percent-style values (`max_ltv`, `origination_fee_percent`,
/// `prepaid_interest_annual_rate`) are held as ratios in `0..=1`; [`SettingsView`] and
/// [`SettingsUpdate`] are the only places they are scaled to and from `0..=100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderwritingSettings {
    pub max_ltv: f64,
    pub min_credit_score: u16,
    pub acceptable_liquidity_ratio: f64,
    pub excellent_liquidity_ratio: f64,
    pub monthly_service_fee: f64,
    pub document_preparation_fee: f64,
    pub closing_cost_estimate: f64,
    pub origination_fee_percent: f64,
    pub prepaid_interest_annual_rate: f64,
    pub per_diem_day_count_basis: f64,
    pub max_other_mortgage_loans: u32,
}

impl Default for UnderwritingSettings {
    fn default() -> Self {
        Self {
            max_ltv: 0.75,
            min_credit_score: 660,
            acceptable_liquidity_ratio: 1.0,
            excellent_liquidity_ratio: 1.5,
            monthly_service_fee: 250.0,
            document_preparation_fee: 995.0,
            closing_cost_estimate: 3_500.0,
            origination_fee_percent: 0.02,
            prepaid_interest_annual_rate: 0.12,
            per_diem_day_count_basis: 360.0,
            max_other_mortgage_loans: 5,
        }
    }
}

impl UnderwritingSettings {
    /// Check the invariants every stored snapshot must hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ratio("max_ltv", self.max_ltv)?;
        ratio("origination_fee_percent", self.origination_fee_percent)?;
        ratio(
            "prepaid_interest_annual_rate",
            self.prepaid_interest_annual_rate,
        )?;
        non_negative("acceptable_liquidity_ratio", self.acceptable_liquidity_ratio)?;
        non_negative("excellent_liquidity_ratio", self.excellent_liquidity_ratio)?;
        non_negative("monthly_service_fee", self.monthly_service_fee)?;
        non_negative("document_preparation_fee", self.document_preparation_fee)?;
        non_negative("closing_cost_estimate", self.closing_cost_estimate)?;
        non_negative("per_diem_day_count_basis", self.per_diem_day_count_basis)?;

        if self.per_diem_day_count_basis == 0.0 {
            return Err(ValidationError::NotPositive {
                field: "per_diem_day_count_basis",
            });
        }

        if self.excellent_liquidity_ratio < self.acceptable_liquidity_ratio {
            return Err(ValidationError::LiquidityThresholdOrder {
                acceptable: self.acceptable_liquidity_ratio,
                excellent: self.excellent_liquidity_ratio,
            });
        }

        Ok(())
    }

    /// Produce the next settings snapshot. Nothing is applied unless every field passes.
    pub fn apply_update(&self, update: &SettingsUpdate) -> Result<Self, ValidationError> {
        let mut next = self.clone();

        if let Some(value) = update.max_ltv {
            next.max_ltv = percent_to_ratio("max_ltv", value)?;
        }
        if let Some(value) = update.min_credit_score {
            next.min_credit_score = value;
        }
        if let Some(value) = update.acceptable_liquidity_ratio {
            next.acceptable_liquidity_ratio = value;
        }
        if let Some(value) = update.excellent_liquidity_ratio {
            next.excellent_liquidity_ratio = value;
        }
        if let Some(value) = update.monthly_service_fee {
            next.monthly_service_fee = value;
        }
        if let Some(value) = update.document_preparation_fee {
            next.document_preparation_fee = value;
        }
        if let Some(value) = update.closing_cost_estimate {
            next.closing_cost_estimate = value;
        }
        if let Some(value) = update.origination_fee_percent {
            next.origination_fee_percent = percent_to_ratio("origination_fee_percent", value)?;
        }
        if let Some(value) = update.prepaid_interest_annual_rate {
            next.prepaid_interest_annual_rate =
                percent_to_ratio("prepaid_interest_annual_rate", value)?;
        }
        if let Some(value) = update.per_diem_day_count_basis {
            next.per_diem_day_count_basis = value;
        }
        if let Some(value) = update.max_other_mortgage_loans {
            next.max_other_mortgage_loans = value;
        }

        next.validate()?;
        Ok(next)
    }

    pub fn view(&self) -> SettingsView {
        SettingsView::from(self)
    }
}

/// Boundary representation of the settings with percentages expressed as `0..=100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsView {
    pub max_ltv: f64,
    pub min_credit_score: u16,
    pub acceptable_liquidity_ratio: f64,
    pub excellent_liquidity_ratio: f64,
    pub monthly_service_fee: f64,
    pub document_preparation_fee: f64,
    pub closing_cost_estimate: f64,
    pub origination_fee_percent: f64,
    pub prepaid_interest_annual_rate: f64,
    pub per_diem_day_count_basis: f64,
    pub max_other_mortgage_loans: u32,
}

impl From<&UnderwritingSettings> for SettingsView {
    fn from(settings: &UnderwritingSettings) -> Self {
        Self {
            max_ltv: settings.max_ltv * PERCENT_SCALE,
            min_credit_score: settings.min_credit_score,
            acceptable_liquidity_ratio: settings.acceptable_liquidity_ratio,
            excellent_liquidity_ratio: settings.excellent_liquidity_ratio,
            monthly_service_fee: settings.monthly_service_fee,
            document_preparation_fee: settings.document_preparation_fee,
            closing_cost_estimate: settings.closing_cost_estimate,
            origination_fee_percent: settings.origination_fee_percent * PERCENT_SCALE,
            prepaid_interest_annual_rate: settings.prepaid_interest_annual_rate * PERCENT_SCALE,
            per_diem_day_count_basis: settings.per_diem_day_count_basis,
            max_other_mortgage_loans: settings.max_other_mortgage_loans,
        }
    }
}

/// Partial administrative update. Percent fields arrive as `0..=100`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub max_ltv: Option<f64>,
    #[serde(default)]
    pub min_credit_score: Option<u16>,
    #[serde(default)]
    pub acceptable_liquidity_ratio: Option<f64>,
    #[serde(default)]
    pub excellent_liquidity_ratio: Option<f64>,
    #[serde(default)]
    pub monthly_service_fee: Option<f64>,
    #[serde(default)]
    pub document_preparation_fee: Option<f64>,
    #[serde(default)]
    pub closing_cost_estimate: Option<f64>,
    #[serde(default)]
    pub origination_fee_percent: Option<f64>,
    #[serde(default)]
    pub prepaid_interest_annual_rate: Option<f64>,
    #[serde(default)]
    pub per_diem_day_count_basis: Option<f64>,
    #[serde(default)]
    pub max_other_mortgage_loans: Option<u32>,
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

fn ratio(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    let value = non_negative(field, value)?;
    if value > 1.0 {
        return Err(ValidationError::OutOfRange {
            field,
            value: value * PERCENT_SCALE,
            min: 0.0,
            max: PERCENT_SCALE,
        });
    }
    Ok(value)
}

fn percent_to_ratio(field: &'static str, percent: f64) -> Result<f64, ValidationError> {
    let percent = non_negative(field, percent)?;
    if percent > PERCENT_SCALE {
        return Err(ValidationError::OutOfRange {
            field,
            value: percent,
            min: 0.0,
            max: PERCENT_SCALE,
        });
    }
    Ok(percent / PERCENT_SCALE)
}
