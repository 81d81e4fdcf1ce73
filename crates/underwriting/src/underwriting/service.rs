use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::completeness::{CompletenessReport, FormKind};
use super::domain::{Actor, BorrowerId, BorrowerIntake, LoanApplication, LoanId};
use super::errors::{FormulaError, NotFoundError, ValidationError};
use super::formulas::{compute_formulas, FormulaResult};
use super::forms::RoleFormValues;
use super::pipeline::{
    advance_stage, apply_decision, AiAssessment, DecisionRequest, LenderPipelineRecord, LoanStage,
    PipelineStateMachine,
};
use super::prefill::{FreshnessPolicy, PrefillReuseResolver, UnderwritingPrefill};
use super::repository::{LoanRecord, LoanRepository, RepositoryError, SettingsStore};
use super::settings::{SettingsUpdate, UnderwritingSettings};

const MIN_CREDIT_SCORE: f64 = 300.0;
const MAX_CREDIT_SCORE: f64 = 850.0;
/// Tolerated client clock drift on intake fact timestamps.
const SUBMISSION_CLOCK_SKEW_MINUTES: i64 = 5;

/// Full replacement payload for one role form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub actor: Actor,
    #[serde(default)]
    pub values: serde_json::Map<String, Value>,
}

/// Result of saving a role form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSaveOutcome {
    pub loan_id: LoanId,
    pub form: FormKind,
    pub completeness: CompletenessReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_keys: Vec<String>,
    pub last_updated_at: DateTime<Utc>,
}

/// Service composing the loan repository, settings store, prefill resolver, and pipeline.
pub struct UnderwritingService<R, S> {
    repository: Arc<R>,
    settings: Arc<S>,
    resolver: PrefillReuseResolver,
}

static LOAN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_loan_id() -> LoanId {
    let id = LOAN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LoanId(format!("loan-{id:06}"))
}

impl<R, S> UnderwritingService<R, S>
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    pub fn new(repository: Arc<R>, settings: Arc<S>, policy: FreshnessPolicy) -> Self {
        Self {
            repository,
            settings,
            resolver: PrefillReuseResolver::new(policy),
        }
    }

    /// Validate and store a new loan application.
    pub fn submit(
        &self,
        application: LoanApplication,
    ) -> Result<LoanRecord, UnderwritingServiceError> {
        let now = Utc::now();
        validate_application(&application, now)?;

        let record = LoanRecord::from_application(next_loan_id(), application, now);
        let stored = self.repository.insert(record)?;

        info!(
            loan_id = %stored.id,
            borrower_id = %stored.borrower_id,
            amount = stored.amount,
            "loan application submitted"
        );
        Ok(stored)
    }

    pub fn get(&self, loan_id: &LoanId) -> Result<LoanRecord, UnderwritingServiceError> {
        self.repository
            .fetch(loan_id)?
            .ok_or_else(|| NotFoundError::Loan(loan_id.clone()).into())
    }

    /// Replace the stored values of one form. The previous bag is discarded entirely.
    pub fn save_form(
        &self,
        loan_id: &LoanId,
        form: FormKind,
        submission: FormSubmission,
    ) -> Result<FormSaveOutcome, UnderwritingServiceError> {
        let mut record = self.get(loan_id)?;
        let normalized = RoleFormValues::normalize(form, &submission.values);
        let completeness = normalized.values.completeness();
        let saved_at = Utc::now();

        if !normalized.ignored_keys.is_empty() {
            warn!(
                loan_id = %loan_id,
                form = form.key(),
                ignored = ?normalized.ignored_keys,
                "dropped fields outside the form schema"
            );
        }

        record
            .forms
            .replace(normalized.values, submission.actor.clone(), saved_at)?;
        self.repository.update(record)?;

        info!(
            loan_id = %loan_id,
            form = form.key(),
            role = submission.actor.role.label(),
            missing = completeness.missing.len(),
            "role form saved"
        );

        Ok(FormSaveOutcome {
            loan_id: loan_id.clone(),
            form,
            completeness,
            ignored_keys: normalized.ignored_keys,
            last_updated_at: saved_at,
        })
    }

    pub fn record_assessment(
        &self,
        loan_id: &LoanId,
        assessment: AiAssessment,
    ) -> Result<LenderPipelineRecord, UnderwritingServiceError> {
        assessment.validate()?;
        let mut record = self.get(loan_id)?;
        record.assessment = Some(assessment);
        self.repository.update(record.clone())?;

        debug!(loan_id = %loan_id, "ai assessment recorded");
        self.project(&record)
    }

    /// Current pipeline view of a loan, recomputed from the stored record.
    pub fn pipeline(
        &self,
        loan_id: &LoanId,
    ) -> Result<LenderPipelineRecord, UnderwritingServiceError> {
        let record = self.get(loan_id)?;
        self.project(&record)
    }

    pub fn pipeline_list(
        &self,
        stage: Option<LoanStage>,
    ) -> Result<Vec<LenderPipelineRecord>, UnderwritingServiceError> {
        let machine = PipelineStateMachine::new(self.settings.current()?);
        let mut loans = self.repository.list()?;
        loans.retain(|loan| stage.map(|stage| loan.stage == stage).unwrap_or(true));
        loans.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(loans.iter().map(|loan| machine.project(loan)).collect())
    }

    /// Apply a pre-approval decision. The stored loan changes only if the transition is valid.
    pub fn apply_decision(
        &self,
        loan_id: &LoanId,
        request: &DecisionRequest,
    ) -> Result<LenderPipelineRecord, UnderwritingServiceError> {
        let mut record = self.get(loan_id)?;
        let current = self.project(&record)?;
        let updated = apply_decision(&current, request, Utc::now())?;

        record.review = updated.decision_state();
        self.repository.update(record)?;

        info!(
            loan_id = %loan_id,
            from = current.pre_approval_decision.key(),
            to = updated.pre_approval_decision.key(),
            "pre-approval decision applied"
        );
        Ok(updated)
    }

    pub fn advance_stage(
        &self,
        loan_id: &LoanId,
        target: LoanStage,
    ) -> Result<LenderPipelineRecord, UnderwritingServiceError> {
        let mut record = self.get(loan_id)?;
        let current = self.project(&record)?;
        let updated = advance_stage(&current, target)?;

        record.stage = updated.stage;
        self.repository.update(record)?;

        info!(
            loan_id = %loan_id,
            from = current.stage.key(),
            to = updated.stage.key(),
            "loan stage advanced"
        );
        Ok(updated)
    }

    /// Strict formula evaluation for a stored loan against the current settings.
    pub fn formulas(&self, loan_id: &LoanId) -> Result<FormulaResult, UnderwritingServiceError> {
        let record = self.get(loan_id)?;
        let settings = self.settings.current()?;
        Ok(compute_formulas(&record, &settings)?)
    }

    /// Resolve reusable borrower facts, skipping `current_loan` when given.
    pub fn prefill(
        &self,
        borrower_id: &BorrowerId,
        current_loan: Option<&LoanId>,
    ) -> Result<UnderwritingPrefill, UnderwritingServiceError> {
        if let Some(loan_id) = current_loan {
            self.get(loan_id)?;
        }

        let loans = self.repository.for_borrower(borrower_id)?;
        let prefill = self
            .resolver
            .resolve(borrower_id, current_loan, &loans, Utc::now());

        debug!(
            borrower_id = %borrower_id,
            prior_loans = loans.len(),
            reusable = prefill.reusable_count(),
            "prefill resolved"
        );
        Ok(prefill)
    }

    pub fn settings(&self) -> Result<UnderwritingSettings, UnderwritingServiceError> {
        Ok(self.settings.current()?)
    }

    /// Validate an administrative update and swap in the new snapshot.
    pub fn update_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<UnderwritingSettings, UnderwritingServiceError> {
        let next = self.settings.current()?.apply_update(update)?;
        self.settings.replace(next.clone())?;

        info!(?update, "underwriting settings updated");
        Ok(next)
    }

    fn project(
        &self,
        record: &LoanRecord,
    ) -> Result<LenderPipelineRecord, UnderwritingServiceError> {
        let machine = PipelineStateMachine::new(self.settings.current()?);
        Ok(machine.project(record))
    }
}

fn validate_application(
    application: &LoanApplication,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if application.borrower_id.0.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: "borrower_id",
        });
    }

    amount("amount", application.amount)?;
    if application.amount == 0.0 {
        return Err(ValidationError::NotPositive { field: "amount" });
    }

    let purchase = &application.purchase_details;
    amount("purchase_price", purchase.purchase_price)?;
    amount("rehab_budget", purchase.rehab_budget)?;
    amount("arv", purchase.arv)?;

    if let Some(score) = &application.intake.credit_score {
        let value = f64::from(score.value);
        if !(MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&value) {
            return Err(ValidationError::OutOfRange {
                field: "credit_score",
                value,
                min: MIN_CREDIT_SCORE,
                max: MAX_CREDIT_SCORE,
            });
        }
    }
    if let Some(liquidity) = &application.intake.liquidity {
        amount("liquidity_amount", liquidity.value.amount)?;
    }
    if let Some(mortgages) = &application.intake.other_mortgages {
        for mortgage in &mortgages.value {
            amount("other_mortgage_monthly_payment", mortgage.monthly_payment)?;
            amount(
                "other_mortgage_monthly_carrying_cost",
                mortgage.monthly_carrying_cost,
            )?;
        }
    }

    validate_fact_timestamps(&application.intake, now)
}

/// Intake facts may not be stamped later than `now` plus the skew allowance.
fn validate_fact_timestamps(
    intake: &BorrowerIntake,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    let latest_allowed = now + Duration::minutes(SUBMISSION_CLOCK_SKEW_MINUTES);
    let stamps = [
        ("credit_score", intake.credit_score.as_ref().map(|fact| fact.submitted_at)),
        ("liquidity", intake.liquidity.as_ref().map(|fact| fact.submitted_at)),
        ("llc", intake.llc.as_ref().map(|fact| fact.submitted_at)),
        ("referral", intake.referral.as_ref().map(|fact| fact.submitted_at)),
        ("past_projects", intake.past_projects.as_ref().map(|fact| fact.submitted_at)),
        ("other_mortgages", intake.other_mortgages.as_ref().map(|fact| fact.submitted_at)),
    ];

    for (field, submitted_at) in stamps {
        if submitted_at.is_some_and(|at| at > latest_allowed) {
            return Err(ValidationError::SubmittedInFuture { field });
        }
    }
    Ok(())
}

fn amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite { field });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

/// Error raised by the underwriting service.
#[derive(Debug, thiserror::Error)]
pub enum UnderwritingServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Formula(#[from] FormulaError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
