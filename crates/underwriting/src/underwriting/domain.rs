use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for loan applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoanId(pub String);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for the borrower that owns one or more loans.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BorrowerId(pub String);

impl fmt::Display for BorrowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    FixAndFlip,
    GroundUpConstruction,
    Bridge,
    Rental,
}

impl LoanType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FixAndFlip => "Fix & Flip",
            Self::GroundUpConstruction => "Ground-Up Construction",
            Self::Bridge => "Bridge",
            Self::Rental => "Rental",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStrategy {
    Sell,
    Refinance,
    Hold,
}

/// Acquisition and renovation figures captured at application time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseDetails {
    pub purchase_price: f64,
    pub rehab_budget: f64,
    pub arv: f64,
    pub target_closing_date: NaiveDate,
    pub exit_strategy: ExitStrategy,
}

/// A borrower fact stamped with the moment it was submitted, so reuse can judge staleness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submitted<T> {
    pub value: T,
    pub submitted_at: DateTime<Utc>,
}

impl<T> Submitted<T> {
    pub fn new(value: T, submitted_at: DateTime<Utc>) -> Self {
        Self {
            value,
            submitted_at,
        }
    }
}

/// Pointer to an uploaded document; storage itself is owned elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub name: String,
    pub storage_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityProof {
    pub amount: f64,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlcDetails {
    pub name: String,
    #[serde(default)]
    pub ein: Option<String>,
    #[serde(default)]
    pub state_of_formation: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralContact {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PastProject {
    pub address: String,
    pub purchase_price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub completed_on: Option<NaiveDate>,
}

/// Another mortgage the borrower is currently carrying.
///
/// `monthly_carrying_cost` covers taxes, insurance and dues on the collateral and feeds the
/// other-mortgage exposure term of the liquidity requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherMortgage {
    pub lender: String,
    pub monthly_payment: f64,
    #[serde(default)]
    pub monthly_carrying_cost: f64,
}

/// Borrower-level facts collected on the intake form. Each fact keeps its own timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BorrowerIntake {
    #[serde(default)]
    pub credit_score: Option<Submitted<u16>>,
    #[serde(default)]
    pub liquidity: Option<Submitted<LiquidityProof>>,
    #[serde(default)]
    pub llc: Option<Submitted<LlcDetails>>,
    #[serde(default)]
    pub referral: Option<Submitted<ReferralContact>>,
    #[serde(default)]
    pub past_projects: Option<Submitted<Vec<PastProject>>>,
    #[serde(default)]
    pub other_mortgages: Option<Submitted<Vec<OtherMortgage>>>,
}

/// Roles that submit or review underwriting data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    LoanOfficer,
    Evaluator,
    Borrower,
    TitleAgent,
    Lender,
    Admin,
}

impl UserRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::LoanOfficer => "Loan Officer",
            Self::Evaluator => "Evaluator",
            Self::Borrower => "Borrower",
            Self::TitleAgent => "Title Agent",
            Self::Lender => "Lender",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who performed a write, kept alongside every saved form for provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: UserRole,
    pub user_id: String,
}

/// Inbound loan application as submitted by the borrower intake form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub borrower_id: BorrowerId,
    pub loan_type: LoanType,
    pub amount: f64,
    pub purchase_details: PurchaseDetails,
    #[serde(default)]
    pub intake: BorrowerIntake,
}
