//! Carry borrower facts from earlier loans into a new intake.
//!
//! The resolver only reads prior loans. Every fact reports where it came from and how old it is,
//! even when it is too stale to reuse, so the intake form can still show what is on file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    BorrowerId, LiquidityProof, LlcDetails, LoanId, OtherMortgage, PastProject, ReferralContact,
    Submitted,
};
use super::repository::LoanRecord;

pub const DEFAULT_FRESHNESS_WINDOW_DAYS: u32 = 30;

/// How old a fact may be and still default into a new intake. The boundary is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessPolicy {
    pub window_days: u32,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_FRESHNESS_WINDOW_DAYS,
        }
    }
}

impl FreshnessPolicy {
    pub fn new(window_days: u32) -> Self {
        Self { window_days }
    }

    pub fn allows(&self, age_days: i64) -> bool {
        age_days <= i64::from(self.window_days)
    }
}

/// One reusable fact and its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefillFact<T> {
    pub value: Option<T>,
    pub source_loan_id: Option<LoanId>,
    pub on_file_date: Option<DateTime<Utc>>,
    pub age_days: Option<i64>,
    pub can_reuse: bool,
}

impl<T> PrefillFact<T> {
    pub fn absent() -> Self {
        Self {
            value: None,
            source_loan_id: None,
            on_file_date: None,
            age_days: None,
            can_reuse: false,
        }
    }

    pub fn is_on_file(&self) -> bool {
        self.value.is_some()
    }

    /// The value to default into the form, if policy allows it.
    pub fn reusable_value(&self) -> Option<&T> {
        if self.can_reuse {
            self.value.as_ref()
        } else {
            None
        }
    }
}

/// Facts resolved for a single intake session. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderwritingPrefill {
    pub borrower_id: BorrowerId,
    pub window_days: u32,
    pub resolved_at: DateTime<Utc>,
    pub credit_score: PrefillFact<u16>,
    pub liquidity: PrefillFact<LiquidityProof>,
    pub llc: PrefillFact<LlcDetails>,
    pub referral: PrefillFact<ReferralContact>,
    pub past_projects: PrefillFact<Vec<PastProject>>,
    pub other_mortgages: PrefillFact<Vec<OtherMortgage>>,
}

impl UnderwritingPrefill {
    pub fn reusable_count(&self) -> usize {
        [
            self.credit_score.can_reuse,
            self.liquidity.can_reuse,
            self.llc.can_reuse,
            self.referral.can_reuse,
            self.past_projects.can_reuse,
            self.other_mortgages.can_reuse,
        ]
        .into_iter()
        .filter(|reusable| *reusable)
        .count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrefillReuseResolver {
    policy: FreshnessPolicy,
}

impl PrefillReuseResolver {
    pub fn new(policy: FreshnessPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Resolve the prefill for `borrower_id` from `loans`. Loans owned by other borrowers and the
    /// loan identified by `current_loan` are ignored.
    pub fn resolve(
        &self,
        borrower_id: &BorrowerId,
        current_loan: Option<&LoanId>,
        loans: &[LoanRecord],
        now: DateTime<Utc>,
    ) -> UnderwritingPrefill {
        let prior: Vec<&LoanRecord> = loans
            .iter()
            .filter(|loan| &loan.borrower_id == borrower_id)
            .filter(|loan| Some(&loan.id) != current_loan)
            .collect();

        UnderwritingPrefill {
            borrower_id: borrower_id.clone(),
            window_days: self.policy.window_days,
            resolved_at: now,
            credit_score: self.latest(&prior, now, |loan| loan.intake.credit_score.as_ref()),
            liquidity: self.latest(&prior, now, |loan| loan.intake.liquidity.as_ref()),
            llc: self.latest(&prior, now, |loan| loan.intake.llc.as_ref()),
            referral: self.latest(&prior, now, |loan| loan.intake.referral.as_ref()),
            past_projects: self.latest(&prior, now, |loan| loan.intake.past_projects.as_ref()),
            other_mortgages: self.latest(&prior, now, |loan| {
                loan.intake.other_mortgages.as_ref()
            }),
        }
    }

    /// Most recent submission of one fact. Equal timestamps fall back to the greater loan id so
    /// the choice is deterministic.
    fn latest<T, F>(&self, loans: &[&LoanRecord], now: DateTime<Utc>, select: F) -> PrefillFact<T>
    where
        T: Clone,
        F: Fn(&LoanRecord) -> Option<&Submitted<T>>,
    {
        let newest = loans
            .iter()
            .copied()
            .filter_map(|loan| select(loan).map(|fact| (&loan.id, fact)))
            .max_by(|(left_id, left), (right_id, right)| {
                left.submitted_at
                    .cmp(&right.submitted_at)
                    .then_with(|| left_id.cmp(right_id))
            });

        match newest {
            Some((loan_id, fact)) => {
                // Clock skew can put a submission slightly in the future; treat it as fresh.
                let age_days = now
                    .signed_duration_since(fact.submitted_at)
                    .num_days()
                    .max(0);
                PrefillFact {
                    value: Some(fact.value.clone()),
                    source_loan_id: Some(loan_id.clone()),
                    on_file_date: Some(fact.submitted_at),
                    age_days: Some(age_days),
                    can_reuse: self.policy.allows(age_days),
                }
            }
            None => PrefillFact::absent(),
        }
    }
}

/// Convenience wrapper over [`PrefillReuseResolver::resolve`] for a one-off window.
pub fn resolve_prefill(
    borrower_id: &BorrowerId,
    current_loan: Option<&LoanId>,
    borrower_loans: &[LoanRecord],
    freshness_window_days: u32,
    now: DateTime<Utc>,
) -> UnderwritingPrefill {
    PrefillReuseResolver::new(FreshnessPolicy::new(freshness_window_days)).resolve(
        borrower_id,
        current_loan,
        borrower_loans,
        now,
    )
}
