use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::FieldSpec;
use crate::underwriting::domain::UserRole;
use crate::underwriting::errors::ValidationError;

/// The four role-scoped forms that attach to a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Valuation,
    Evaluator,
    Conditions,
    TitleAgent,
}

impl FormKind {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Valuation,
            Self::Evaluator,
            Self::Conditions,
            Self::TitleAgent,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Valuation => "valuation",
            Self::Evaluator => "evaluator",
            Self::Conditions => "conditions",
            Self::TitleAgent => "title_agent",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Valuation => "Valuation",
            Self::Evaluator => "Evaluator",
            Self::Conditions => "Conditions",
            Self::TitleAgent => "Title Agent",
        }
    }

    pub fn schema(self) -> Vec<FieldSpec<'static>> {
        match self {
            Self::Valuation => schema_of::<ValuationField>(),
            Self::Evaluator => schema_of::<EvaluatorField>(),
            Self::Conditions => schema_of::<ConditionsField>(),
            Self::TitleAgent => schema_of::<TitleAgentField>(),
        }
    }

    /// Roles allowed to save this form. Admins may save any form.
    pub const fn editors(self) -> &'static [UserRole] {
        match self {
            Self::Valuation => &[UserRole::LoanOfficer, UserRole::Lender, UserRole::Admin],
            Self::Evaluator => &[UserRole::Evaluator, UserRole::Admin],
            Self::Conditions => &[UserRole::Borrower, UserRole::LoanOfficer, UserRole::Admin],
            Self::TitleAgent => &[UserRole::TitleAgent, UserRole::LoanOfficer, UserRole::Admin],
        }
    }

    pub fn can_edit(self, role: UserRole) -> bool {
        self.editors().contains(&role)
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FormKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ordered()
            .into_iter()
            .find(|kind| kind.key() == normalized)
            .ok_or_else(|| ValidationError::UnknownForm(value.to_string()))
    }
}

/// A field of one specific form. Each form has its own key enum so values can only be stored
/// under keys its schema declares.
pub trait FormField: Copy + Ord + fmt::Debug + 'static {
    const KIND: FormKind;
    const ALL: &'static [Self];

    fn spec(self) -> FieldSpec<'static>;

    fn key(self) -> &'static str {
        self.spec().key
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.key() == key)
    }
}

fn schema_of<F: FormField>() -> Vec<FieldSpec<'static>> {
    F::ALL.iter().map(|field| field.spec()).collect()
}

const fn required(key: &'static str, label: &'static str) -> FieldSpec<'static> {
    FieldSpec {
        key,
        label,
        optional: false,
    }
}

const fn optional(key: &'static str, label: &'static str) -> FieldSpec<'static> {
    FieldSpec {
        key,
        label,
        optional: true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValuationField {
    AppraisedValue,
    ArvEstimate,
    ValuationDate,
    ValuationSource,
    ComparableSales,
    Notes,
}

impl FormField for ValuationField {
    const KIND: FormKind = FormKind::Valuation;
    const ALL: &'static [Self] = &[
        Self::AppraisedValue,
        Self::ArvEstimate,
        Self::ValuationDate,
        Self::ValuationSource,
        Self::ComparableSales,
        Self::Notes,
    ];

    fn spec(self) -> FieldSpec<'static> {
        match self {
            Self::AppraisedValue => required("appraised_value", "Appraised value"),
            Self::ArvEstimate => required("arv_estimate", "After-repair value"),
            Self::ValuationDate => required("valuation_date", "Valuation date"),
            Self::ValuationSource => required("valuation_source", "Valuation source"),
            Self::ComparableSales => required("comparable_sales", "Comparable sales"),
            Self::Notes => optional("notes", "Valuation notes"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EvaluatorField {
    PropertyCondition,
    RehabScope,
    BudgetAssessment,
    ExitStrategyAssessment,
    MarketRisk,
    Comments,
}

impl FormField for EvaluatorField {
    const KIND: FormKind = FormKind::Evaluator;
    const ALL: &'static [Self] = &[
        Self::PropertyCondition,
        Self::RehabScope,
        Self::BudgetAssessment,
        Self::ExitStrategyAssessment,
        Self::MarketRisk,
        Self::Comments,
    ];

    fn spec(self) -> FieldSpec<'static> {
        match self {
            Self::PropertyCondition => required("property_condition", "Property condition"),
            Self::RehabScope => required("rehab_scope", "Rehab scope review"),
            Self::BudgetAssessment => required("budget_assessment", "Rehab budget assessment"),
            Self::ExitStrategyAssessment => {
                required("exit_strategy_assessment", "Exit strategy assessment")
            }
            Self::MarketRisk => required("market_risk", "Market risk"),
            Self::Comments => optional("comments", "Evaluator comments"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConditionsField {
    TitleCommitment,
    InsuranceBinder,
    EntityDocuments,
    PurchaseContract,
    AdditionalConditions,
}

impl FormField for ConditionsField {
    const KIND: FormKind = FormKind::Conditions;
    const ALL: &'static [Self] = &[
        Self::TitleCommitment,
        Self::InsuranceBinder,
        Self::EntityDocuments,
        Self::PurchaseContract,
        Self::AdditionalConditions,
    ];

    fn spec(self) -> FieldSpec<'static> {
        match self {
            Self::TitleCommitment => required("title_commitment", "Title commitment"),
            Self::InsuranceBinder => required("insurance_binder", "Insurance binder"),
            Self::EntityDocuments => required("entity_documents", "Entity documents"),
            Self::PurchaseContract => required("purchase_contract", "Purchase contract"),
            Self::AdditionalConditions => {
                optional("additional_conditions", "Additional conditions")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TitleAgentField {
    TitleCompany,
    AgentName,
    AgentEmail,
    AgentPhone,
    FileNumber,
    WireInstructions,
}

impl FormField for TitleAgentField {
    const KIND: FormKind = FormKind::TitleAgent;
    const ALL: &'static [Self] = &[
        Self::TitleCompany,
        Self::AgentName,
        Self::AgentEmail,
        Self::AgentPhone,
        Self::FileNumber,
        Self::WireInstructions,
    ];

    fn spec(self) -> FieldSpec<'static> {
        match self {
            Self::TitleCompany => required("title_company", "Title company"),
            Self::AgentName => required("agent_name", "Agent name"),
            Self::AgentEmail => required("agent_email", "Agent email"),
            Self::AgentPhone => required("agent_phone", "Agent phone"),
            Self::FileNumber => required("file_number", "Title file number"),
            Self::WireInstructions => optional("wire_instructions", "Wire instructions"),
        }
    }
}
