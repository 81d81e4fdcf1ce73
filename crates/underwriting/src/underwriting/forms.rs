//! Role-scoped value bags attached to a loan.
//!
//! Saves replace the whole bag for a form: the last full save wins and no field-level merge is
//! attempted. Downstream consumers rely on reading exactly what the last writer submitted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::completeness::{
    evaluate_completeness, normalize_value, CompletenessReport, ConditionsField, EvaluatorField,
    FormField, FormKind, TitleAgentField, ValuationField,
};
use super::domain::Actor;
use super::errors::ValidationError;

/// Values for a single form, keyed by that form's field enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<String, String>",
    try_from = "BTreeMap<String, String>",
    bound(serialize = "F: FormField", deserialize = "F: FormField")
)]
pub struct FormValues<F: FormField> {
    values: BTreeMap<F, String>,
}

impl<F: FormField> Default for FormValues<F> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<F: FormField> FormValues<F> {
    /// Build typed values from a loosely typed payload. Keys outside the schema are dropped and
    /// returned so the caller can report them.
    pub fn normalize(raw: &serde_json::Map<String, Value>) -> (Self, Vec<String>) {
        let mut values = BTreeMap::new();
        let mut ignored = Vec::new();

        for (key, value) in raw {
            match F::from_key(key) {
                Some(field) => {
                    values.insert(field, normalize_value(value));
                }
                None => ignored.push(key.clone()),
            }
        }

        (Self { values }, ignored)
    }

    pub fn with(mut self, field: F, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    pub fn get(&self, field: F) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Parse a currency-style entry such as `"$410,000"`.
    pub fn number(&self, field: F) -> Option<f64> {
        let raw = self.get(field)?;
        let cleaned: String = raw
            .chars()
            .filter(|ch| !matches!(ch, '$' | ',' | ' '))
            .collect();
        cleaned
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_key_map(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(field, value)| (field.key().to_string(), value.clone()))
            .collect()
    }

    pub fn completeness(&self) -> CompletenessReport {
        evaluate_completeness(&F::KIND.schema(), &self.to_key_map())
    }
}

impl<F: FormField> From<FormValues<F>> for BTreeMap<String, String> {
    fn from(values: FormValues<F>) -> Self {
        values.to_key_map()
    }
}

impl<F: FormField> TryFrom<BTreeMap<String, String>> for FormValues<F> {
    type Error = ValidationError;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut values = BTreeMap::new();
        for (key, value) in raw {
            let field = F::from_key(&key).ok_or(ValidationError::UnknownField {
                form: F::KIND,
                key,
            })?;
            values.insert(field, value);
        }
        Ok(Self { values })
    }
}

/// Latest saved state of a form plus who saved it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "F: FormField", deserialize = "F: FormField"))]
pub struct FormSnapshot<F: FormField> {
    pub values: FormValues<F>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub last_updated_by: Option<Actor>,
}

impl<F: FormField> Default for FormSnapshot<F> {
    fn default() -> Self {
        Self {
            values: FormValues::default(),
            last_updated_at: None,
            last_updated_by: None,
        }
    }
}

impl<F: FormField> FormSnapshot<F> {
    fn overwrite(&mut self, values: FormValues<F>, actor: Actor, at: DateTime<Utc>) {
        *self = Self {
            values,
            last_updated_at: Some(at),
            last_updated_by: Some(actor),
        };
    }

    fn status(&self) -> FormStatus {
        let report = self.values.completeness();
        FormStatus {
            form: F::KIND,
            label: F::KIND.label(),
            missing: report.missing,
            is_complete: report.is_complete,
            last_updated_at: self.last_updated_at,
            last_updated_by: self.last_updated_by.clone(),
        }
    }
}

/// A full submission for exactly one form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleFormValues {
    Valuation(FormValues<ValuationField>),
    Evaluator(FormValues<EvaluatorField>),
    Conditions(FormValues<ConditionsField>),
    TitleAgent(FormValues<TitleAgentField>),
}

/// Normalized submission together with the keys that were not part of the form's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedForm {
    pub values: RoleFormValues,
    pub ignored_keys: Vec<String>,
}

impl RoleFormValues {
    pub fn normalize(kind: FormKind, raw: &serde_json::Map<String, Value>) -> NormalizedForm {
        let (values, ignored_keys) = match kind {
            FormKind::Valuation => {
                let (values, ignored) = FormValues::normalize(raw);
                (Self::Valuation(values), ignored)
            }
            FormKind::Evaluator => {
                let (values, ignored) = FormValues::normalize(raw);
                (Self::Evaluator(values), ignored)
            }
            FormKind::Conditions => {
                let (values, ignored) = FormValues::normalize(raw);
                (Self::Conditions(values), ignored)
            }
            FormKind::TitleAgent => {
                let (values, ignored) = FormValues::normalize(raw);
                (Self::TitleAgent(values), ignored)
            }
        };

        NormalizedForm {
            values,
            ignored_keys,
        }
    }

    pub fn kind(&self) -> FormKind {
        match self {
            Self::Valuation(_) => FormKind::Valuation,
            Self::Evaluator(_) => FormKind::Evaluator,
            Self::Conditions(_) => FormKind::Conditions,
            Self::TitleAgent(_) => FormKind::TitleAgent,
        }
    }

    pub fn completeness(&self) -> CompletenessReport {
        match self {
            Self::Valuation(values) => values.completeness(),
            Self::Evaluator(values) => values.completeness(),
            Self::Conditions(values) => values.completeness(),
            Self::TitleAgent(values) => values.completeness(),
        }
    }
}

/// Completeness and provenance of one form, as shown on the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormStatus {
    pub form: FormKind,
    pub label: &'static str,
    pub missing: Vec<String>,
    pub is_complete: bool,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub last_updated_by: Option<Actor>,
}

/// Every role form of a loan. Forms start empty and are created on first access.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleForms {
    #[serde(default)]
    pub valuation: FormSnapshot<ValuationField>,
    #[serde(default)]
    pub evaluator: FormSnapshot<EvaluatorField>,
    #[serde(default)]
    pub conditions: FormSnapshot<ConditionsField>,
    #[serde(default)]
    pub title_agent: FormSnapshot<TitleAgentField>,
}

impl RoleForms {
    /// Replace the stored bag for the submitted form. Nothing changes when the actor's role may
    /// not edit that form.
    pub fn replace(
        &mut self,
        values: RoleFormValues,
        actor: Actor,
        at: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let form = values.kind();
        if !form.can_edit(actor.role) {
            return Err(ValidationError::RoleNotPermitted {
                role: actor.role,
                form,
            });
        }

        match values {
            RoleFormValues::Valuation(values) => self.valuation.overwrite(values, actor, at),
            RoleFormValues::Evaluator(values) => self.evaluator.overwrite(values, actor, at),
            RoleFormValues::Conditions(values) => self.conditions.overwrite(values, actor, at),
            RoleFormValues::TitleAgent(values) => self.title_agent.overwrite(values, actor, at),
        }

        Ok(())
    }

    pub fn status(&self, form: FormKind) -> FormStatus {
        match form {
            FormKind::Valuation => self.valuation.status(),
            FormKind::Evaluator => self.evaluator.status(),
            FormKind::Conditions => self.conditions.status(),
            FormKind::TitleAgent => self.title_agent.status(),
        }
    }

    pub fn statuses(&self) -> Vec<FormStatus> {
        FormKind::ordered()
            .into_iter()
            .map(|form| self.status(form))
            .collect()
    }

    pub fn all_complete(&self) -> bool {
        FormKind::ordered()
            .into_iter()
            .all(|form| self.status(form).is_complete)
    }

    pub fn values(&self, form: FormKind) -> BTreeMap<String, String> {
        match form {
            FormKind::Valuation => self.valuation.values.to_key_map(),
            FormKind::Evaluator => self.evaluator.values.to_key_map(),
            FormKind::Conditions => self.conditions.values.to_key_map(),
            FormKind::TitleAgent => self.title_agent.values.to_key_map(),
        }
    }
}
