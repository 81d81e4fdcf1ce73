use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::underwriting::errors::ValidationError;

/// Lifecycle stages a loan moves through, in order. `Archived` is terminal and replaces deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStage {
    Intake,
    Processing,
    Underwriting,
    ClosingPrep,
    Closing,
    Funded,
    Archived,
}

impl LoanStage {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Intake,
            Self::Processing,
            Self::Underwriting,
            Self::ClosingPrep,
            Self::Closing,
            Self::Funded,
            Self::Archived,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Processing => "processing",
            Self::Underwriting => "underwriting",
            Self::ClosingPrep => "closing_prep",
            Self::Closing => "closing",
            Self::Funded => "funded",
            Self::Archived => "archived",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Intake => "Intake",
            Self::Processing => "Processing",
            Self::Underwriting => "Underwriting",
            Self::ClosingPrep => "Closing Prep",
            Self::Closing => "Closing",
            Self::Funded => "Funded",
            Self::Archived => "Archived",
        }
    }

    pub fn index(self) -> usize {
        Self::ordered()
            .iter()
            .position(|stage| *stage == self)
            .unwrap_or_default()
    }

    pub fn next(self) -> Option<Self> {
        Self::ordered().get(self.index() + 1).copied()
    }

    /// Forward-only move. Staying on the current stage is accepted as a no-op.
    pub fn advance_to(self, target: Self) -> Result<Self, ValidationError> {
        if target < self {
            return Err(ValidationError::StageRegression {
                from: self,
                to: target,
            });
        }
        Ok(target)
    }
}

impl fmt::Display for LoanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LoanStage {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ordered()
            .into_iter()
            .find(|stage| stage.key() == normalized)
            .ok_or_else(|| ValidationError::UnknownStage(value.to_string()))
    }
}
