//! Required-field tracking shared by every role-specific form.

mod schemas;

pub use schemas::{
    ConditionsField, EvaluatorField, FormField, FormKind, TitleAgentField, ValuationField,
};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of a form schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec<'a> {
    pub key: &'a str,
    pub label: &'a str,
    pub optional: bool,
}

/// Outcome of a completeness check. `missing` follows schema order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub missing: Vec<String>,
    pub is_complete: bool,
}

/// Report the label of every required field whose trimmed value is empty.
pub fn evaluate_completeness(
    schema: &[FieldSpec<'_>],
    values: &BTreeMap<String, String>,
) -> CompletenessReport {
    let missing: Vec<String> = schema
        .iter()
        .filter(|field| !field.optional)
        .filter(|field| {
            values
                .get(field.key)
                .map(|value| value.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|field| field.label.to_string())
        .collect();

    CompletenessReport {
        is_complete: missing.is_empty(),
        missing,
    }
}

/// Same as [`evaluate_completeness`] for values that have not been normalized yet.
pub fn evaluate_raw(
    schema: &[FieldSpec<'_>],
    values: &serde_json::Map<String, Value>,
) -> CompletenessReport {
    evaluate_completeness(schema, &normalize_values(values))
}

/// Coerce a loosely typed value to the string the forms store. Strings pass through, finite
/// numbers are stringified, and everything else becomes the empty string.
pub fn normalize_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(parsed) if parsed.is_finite() => number.to_string(),
            _ => String::new(),
        },
        _ => String::new(),
    }
}

pub fn normalize_values(values: &serde_json::Map<String, Value>) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(key, value)| (key.clone(), normalize_value(value)))
        .collect()
}
