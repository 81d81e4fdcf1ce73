//! Loan underwriting: deterministic formulas, role form completeness, prefill reuse across a
//! borrower's loans, and the lender pipeline with its pre-approval decision.

pub mod completeness;
pub mod domain;
pub mod errors;
pub mod formulas;
pub mod forms;
pub mod pipeline;
pub mod prefill;
pub mod repository;
pub mod router;
pub mod service;
pub mod settings;

#[cfg(test)]
mod tests;

pub use completeness::{evaluate_completeness, CompletenessReport, FieldSpec, FormKind};
pub use domain::{
    Actor, BorrowerId, BorrowerIntake, DocumentRef, ExitStrategy, LiquidityProof, LlcDetails,
    LoanApplication, LoanId, LoanType, OtherMortgage, PastProject, PurchaseDetails,
    ReferralContact, Submitted, UserRole,
};
pub use errors::{ArithmeticError, FormulaError, NotFoundError, ValidationError};
pub use formulas::{compute, compute_formulas, FormulaInputs, FormulaResult, FormulaSummary};
pub use forms::{FormStatus, RoleFormValues, RoleForms};
pub use pipeline::{
    advance_stage, apply_decision, AiAssessment, AiRecommendation, DecisionRequest,
    LenderPipelineRecord, LoanStage, PipelineStateMachine, PreApprovalDecision,
};
pub use prefill::{
    resolve_prefill, FreshnessPolicy, PrefillFact, PrefillReuseResolver, UnderwritingPrefill,
};
pub use repository::{LoanRecord, LoanRepository, RepositoryError, SettingsStore};
pub use router::underwriting_router;
pub use service::{
    FormSaveOutcome, FormSubmission, UnderwritingService, UnderwritingServiceError,
};
pub use settings::{SettingsUpdate, SettingsView, UnderwritingSettings};
