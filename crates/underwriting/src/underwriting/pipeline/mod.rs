//! Lender-facing pipeline projection and its decision/stage transitions.

mod decision;
mod stage;

pub use decision::{DecisionState, PreApprovalDecision};
pub use stage::LoanStage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{BorrowerId, LoanId, LoanType};
use super::errors::ValidationError;
use super::formulas::{summarize_formulas, FormulaSummary};
use super::forms::FormStatus;
use super::repository::LoanRecord;
use super::settings::UnderwritingSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiRecommendation {
    Approve,
    Decline,
    ManualReview,
}

/// Model-generated recommendation attached to a loan. Advisory only; it never changes the
/// decision by itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAssessment {
    pub recommendation: AiRecommendation,
    pub confidence: f64,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

impl AiAssessment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.confidence.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "confidence",
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::OutOfRange {
                field: "confidence",
                value: self.confidence,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// Request to change a loan's pre-approval decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub decision: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub decided_by: Option<String>,
}

/// Read-side projection joining a loan with its forms, formulas, assessment, and decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LenderPipelineRecord {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub loan_type: LoanType,
    pub amount: f64,
    pub stage: LoanStage,
    pub stage_label: &'static str,
    pub stage_index: usize,
    pub pre_approval_decision: PreApprovalDecision,
    pub decision_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    pub ai_assessment: Option<AiAssessment>,
    pub formulas: FormulaSummary,
    pub forms: Vec<FormStatus>,
    pub forms_complete: bool,
    pub is_complete: bool,
}

impl LenderPipelineRecord {
    pub fn decision_state(&self) -> DecisionState {
        DecisionState {
            decision: self.pre_approval_decision,
            notes: self.decision_notes.clone(),
            decided_at: self.decided_at,
            decided_by: self.decided_by.clone(),
        }
    }

    fn with_decision(mut self, state: DecisionState) -> Self {
        self.pre_approval_decision = state.decision;
        self.decision_label = state.decision.label();
        self.decision_notes = state.notes;
        self.decided_at = state.decided_at;
        self.decided_by = state.decided_by;
        self.is_complete = overall_complete(self.forms_complete, self.pre_approval_decision);
        self
    }

    fn with_stage(mut self, stage: LoanStage) -> Self {
        self.stage = stage;
        self.stage_label = stage.label();
        self.stage_index = stage.index();
        self
    }
}

/// Builds pipeline records against a settings snapshot owned by the caller.
pub struct PipelineStateMachine {
    settings: UnderwritingSettings,
}

impl PipelineStateMachine {
    pub fn new(settings: UnderwritingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &UnderwritingSettings {
        &self.settings
    }

    /// Recompute the pipeline view of a loan. Formula failures only blank the affected metrics.
    pub fn project(&self, loan: &LoanRecord) -> LenderPipelineRecord {
        let forms = loan.forms.statuses();
        let forms_complete = forms.iter().all(|status| status.is_complete);
        let review = &loan.review;

        LenderPipelineRecord {
            loan_id: loan.id.clone(),
            borrower_id: loan.borrower_id.clone(),
            loan_type: loan.loan_type,
            amount: loan.amount,
            stage: loan.stage,
            stage_label: loan.stage.label(),
            stage_index: loan.stage.index(),
            pre_approval_decision: review.decision,
            decision_label: review.decision.label(),
            decision_notes: review.notes.clone(),
            decided_at: review.decided_at,
            decided_by: review.decided_by.clone(),
            ai_assessment: loan.assessment.clone(),
            formulas: summarize_formulas(loan, &self.settings),
            forms,
            forms_complete,
            is_complete: overall_complete(forms_complete, review.decision),
        }
    }
}

/// Apply an explicit decision. On error the input record is untouched and no partial state is
/// produced.
pub fn apply_decision(
    record: &LenderPipelineRecord,
    request: &DecisionRequest,
    at: DateTime<Utc>,
) -> Result<LenderPipelineRecord, ValidationError> {
    let state = DecisionState::transition(
        &request.decision,
        request.notes.as_deref(),
        request.decided_by.as_deref(),
        at,
    )?;
    Ok(record.clone().with_decision(state))
}

pub fn advance_stage(
    record: &LenderPipelineRecord,
    target: LoanStage,
) -> Result<LenderPipelineRecord, ValidationError> {
    let stage = record.stage.advance_to(target)?;
    Ok(record.clone().with_stage(stage))
}

fn overall_complete(forms_complete: bool, decision: PreApprovalDecision) -> bool {
    forms_complete && !decision.is_pending()
}
