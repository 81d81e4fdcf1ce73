use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::underwriting::errors::ValidationError;

/// Lender pre-approval outcome for a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreApprovalDecision {
    #[default]
    Pending,
    PreApprove,
    Decline,
    RequestInfo,
}

impl PreApprovalDecision {
    pub const fn key(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::PreApprove => "PRE_APPROVE",
            Self::Decline => "DECLINE",
            Self::RequestInfo => "REQUEST_INFO",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending review",
            Self::PreApprove => "Pre-approved",
            Self::Decline => "Declined",
            Self::RequestInfo => "Information requested",
        }
    }

    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Parse a decision a caller asked to apply. `PENDING` is a starting state, not a decision.
    pub fn parse_target(value: &str) -> Result<Self, ValidationError> {
        match value.parse::<Self>()? {
            Self::Pending => Err(ValidationError::InvalidDecision(value.to_string())),
            decision => Ok(decision),
        }
    }
}

impl fmt::Display for PreApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PreApprovalDecision {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase().replace('-', "_");
        [
            Self::Pending,
            Self::PreApprove,
            Self::Decline,
            Self::RequestInfo,
        ]
        .into_iter()
        .find(|decision| decision.key() == normalized)
        .ok_or_else(|| ValidationError::InvalidDecision(value.to_string()))
    }
}

/// Decision fields written back onto the loan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionState {
    pub decision: PreApprovalDecision,
    pub notes: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
}

impl DecisionState {
    /// Validate and build the next decision state. Blank notes are not stored; non-blank notes
    /// are kept verbatim.
    pub fn transition(
        decision: &str,
        notes: Option<&str>,
        decided_by: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let decision = PreApprovalDecision::parse_target(decision)?;
        let notes = notes.filter(|text| !text.trim().is_empty());

        if decision == PreApprovalDecision::Decline && notes.is_none() {
            return Err(ValidationError::MissingDeclineNotes);
        }

        Ok(Self {
            decision,
            notes: notes.map(str::to_string),
            decided_at: Some(at),
            decided_by: decided_by.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 3, 15, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn decline_requires_notes() {
        assert_eq!(
            DecisionState::transition("DECLINE", None, None, now()),
            Err(ValidationError::MissingDeclineNotes)
        );
        assert_eq!(
            DecisionState::transition("DECLINE", Some("   "), None, now()),
            Err(ValidationError::MissingDeclineNotes)
        );
    }

    #[test]
    fn decline_keeps_notes_verbatim() {
        let state = DecisionState::transition(
            "DECLINE",
            Some("  LTV above policy  "),
            Some("lender-1"),
            now(),
        )
        .expect("decline applies");

        assert_eq!(state.decision, PreApprovalDecision::Decline);
        assert_eq!(state.notes.as_deref(), Some("  LTV above policy  "));
        assert_eq!(state.decided_by.as_deref(), Some("lender-1"));
        assert_eq!(state.decided_at, Some(now()));
    }

    #[test]
    fn pre_approve_and_request_info_allow_missing_notes() {
        for raw in ["PRE_APPROVE", "request_info", "Request-Info"] {
            let state = DecisionState::transition(raw, None, None, now()).expect("applies");
            assert!(!state.decision.is_pending());
            assert!(state.notes.is_none());
        }
    }

    #[test]
    fn unknown_and_pending_targets_are_invalid() {
        assert_eq!(
            DecisionState::transition("APPROVE_NOW", None, None, now()),
            Err(ValidationError::InvalidDecision("APPROVE_NOW".to_string()))
        );
        assert_eq!(
            DecisionState::transition("PENDING", None, None, now()),
            Err(ValidationError::InvalidDecision("PENDING".to_string()))
        );
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&PreApprovalDecision::RequestInfo).expect("serialize");
        assert_eq!(json, "\"REQUEST_INFO\"");
    }
}
