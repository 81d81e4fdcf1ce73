use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::completeness::ValuationField;
use super::domain::{
    BorrowerId, BorrowerIntake, LoanApplication, LoanId, LoanType, OtherMortgage, PurchaseDetails,
};
use super::forms::RoleForms;
use super::pipeline::{AiAssessment, DecisionState, LoanStage};
use super::settings::UnderwritingSettings;

/// Stored loan: the root that role forms, the assessment, and the decision attach to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: LoanId,
    pub borrower_id: BorrowerId,
    pub loan_type: LoanType,
    pub amount: f64,
    pub purchase_details: PurchaseDetails,
    #[serde(default)]
    pub intake: BorrowerIntake,
    #[serde(default)]
    pub forms: RoleForms,
    #[serde(default)]
    pub assessment: Option<AiAssessment>,
    #[serde(default)]
    pub review: DecisionState,
    pub stage: LoanStage,
    pub submitted_at: DateTime<Utc>,
}

impl LoanRecord {
    pub fn from_application(
        id: LoanId,
        application: LoanApplication,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            borrower_id: application.borrower_id,
            loan_type: application.loan_type,
            amount: application.amount,
            purchase_details: application.purchase_details,
            intake: application.intake,
            forms: RoleForms::default(),
            assessment: None,
            review: DecisionState::default(),
            stage: LoanStage::Intake,
            submitted_at,
        }
    }

    pub fn other_mortgages(&self) -> &[OtherMortgage] {
        self.intake
            .other_mortgages
            .as_ref()
            .map(|submitted| submitted.value.as_slice())
            .unwrap_or_default()
    }

    /// Property value used for LTV: the appraised value from the valuation form when one has been
    /// entered, otherwise the ARV from the application.
    pub fn appraisal_or_arv(&self) -> f64 {
        self.forms
            .valuation
            .values
            .number(ValuationField::AppraisedValue)
            .filter(|value| *value > 0.0)
            .unwrap_or(self.purchase_details.arv)
    }
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait LoanRepository: Send + Sync {
    fn insert(&self, record: LoanRecord) -> Result<LoanRecord, RepositoryError>;
    fn update(&self, record: LoanRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError>;
    fn for_borrower(&self, borrower_id: &BorrowerId) -> Result<Vec<LoanRecord>, RepositoryError>;
    fn list(&self) -> Result<Vec<LoanRecord>, RepositoryError>;
}

/// Holder of the singleton settings snapshot.
pub trait SettingsStore: Send + Sync {
    fn current(&self) -> Result<UnderwritingSettings, RepositoryError>;
    fn replace(&self, settings: UnderwritingSettings) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
