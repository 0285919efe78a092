//! Request payload ingestion.
//!
//! Callers send PDDL text in several shapes: a plain string, an editor
//! wrapper object carrying the text under `value`, a list of lines, or
//! something else entirely. [`PddlSource`] models the recognised shapes and
//! [`PddlSource::normalize`] turns any of them into a single string. No
//! shape is ever rejected.

use serde::Deserialize;
use serde_json::Value;

/// One PDDL field as it arrived on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PddlSource {
    /// A plain string, used as-is.
    Text(String),
    // `Lines` precedes `Wrapped`: derived structs also accept sequences.
    /// A sequence of lines, joined with `\n`.
    Lines(Vec<Value>),
    /// An object with a string `value` key. Other keys are ignored.
    Wrapped { value: String },
    /// Any other JSON value, serialized back to JSON text.
    Raw(Value),
}

impl PddlSource {
    /// Collapse this source into canonical text. Never fails.
    pub fn normalize(&self) -> String {
        match self {
            Self::Text(text) | Self::Wrapped { value: text } => text.clone(),
            Self::Lines(lines) => lines.iter().map(line_text).collect::<Vec<_>>().join("\n"),
            Self::Raw(value) => value.to_string(),
        }
    }
}

impl From<Value> for PddlSource {
    fn from(value: Value) -> Self {
        // Deserializing from an owned `Value` cannot fail: `Raw` accepts anything.
        serde_json::from_value(value.clone()).unwrap_or(Self::Raw(value))
    }
}

/// Strings contribute their contents; everything else its JSON text.
fn line_text(line: &Value) -> String {
    match line {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Normalize an arbitrary JSON value into PDDL text.
pub fn normalize(value: Value) -> String {
    PddlSource::from(value).normalize()
}

/// Body of a `POST /plan` request.
///
/// Both fields are optional; a missing (or `null`) field normalizes to the
/// empty string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub domain_pddl: Option<PddlSource>,
    #[serde(default)]
    pub problem_pddl: Option<PddlSource>,
}

impl PlanRequest {
    /// Normalized domain text.
    pub fn domain_text(&self) -> String {
        self.domain_pddl
            .as_ref()
            .map(PddlSource::normalize)
            .unwrap_or_default()
    }

    /// Normalized problem text.
    pub fn problem_text(&self) -> String {
        self.problem_pddl
            .as_ref()
            .map(PddlSource::normalize)
            .unwrap_or_default()
    }
}
