use super::completeness::FormKind;
use super::domain::{LoanId, UserRole};
use super::pipeline::LoanStage;

/// Malformed or out-of-range input. Carries enough context to render field-level feedback.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} must not be negative (found {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("{field} must be between {min} and {max} (found {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{field} falls outside the supported calendar range")]
    DateOutOfRange { field: &'static str },
    #[error("{field} is timestamped in the future")]
    SubmittedInFuture { field: &'static str },
    #[error(
        "excellent liquidity ratio ({excellent}) must not be below the acceptable ratio ({acceptable})"
    )]
    LiquidityThresholdOrder { acceptable: f64, excellent: f64 },
    #[error("'{0}' is not a valid pre-approval decision")]
    InvalidDecision(String),
    #[error("declining a loan requires notes")]
    MissingDeclineNotes,
    #[error("stage cannot move backward from {from} to {to}")]
    StageRegression { from: LoanStage, to: LoanStage },
    #[error("'{0}' is not a known loan stage")]
    UnknownStage(String),
    #[error("'{0}' is not a known form")]
    UnknownForm(String),
    #[error("'{key}' is not a field of the {form} form")]
    UnknownField { form: FormKind, key: String },
    #[error("{role} may not save the {form} form")]
    RoleNotPermitted { role: UserRole, form: FormKind },
}

/// A referenced record does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFoundError {
    #[error("loan {0} not found")]
    Loan(LoanId),
}

/// A formula denominator could not be divided by.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArithmeticError {
    #[error("{operand} is zero; cannot divide")]
    ZeroDenominator { operand: &'static str },
    #[error("{operand} is not a finite number; cannot divide")]
    NonFiniteDenominator { operand: &'static str },
}

/// Failure of a single formula evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}
