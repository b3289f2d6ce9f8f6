//! Observed values and the per-entity source set.
//!
//! Values are resolved once at the feed boundary into [`Value`]; the
//! reconcilers never sniff types at runtime beyond matching on the enum.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single reported value. Serialized untagged: number, string or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Coerce a raw string cell (CSV, scraped text) into a value.
    ///
    /// Empty -> Missing, finite number -> Number, anything else -> Text.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    /// Coerce a JSON value. Arrays and objects have no scalar reading and
    /// become Missing.
    pub fn from_json(field: &str, value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Missing,
            serde_json::Value::Bool(b) => Value::Text(b.to_string()),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() => Value::Number(f),
                _ => Value::Missing,
            },
            serde_json::Value::String(s) => Value::from_raw(s),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                warn!(field, "non-scalar value coerced to missing");
                Value::Missing
            }
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Missing
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Missing => write!(f, "null"),
        }
    }
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// One source's value for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub source: String,
    pub value: Value,
}

impl Observation {
    pub fn new(source: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            source: source.into(),
            value: value.into(),
        }
    }
}

/// Everything one source reported for an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceReport {
    pub source: String,
    pub fields: BTreeMap<String, Value>,
}

/// All source reports for one entity, in the order sources were supplied.
///
/// Order matters: categorical ties go to the first-seen source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSet {
    reports: Vec<SourceReport>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one field for a source. A source seen before keeps its position.
    pub fn insert(&mut self, source: &str, field: &str, value: Value) {
        let report = match self.reports.iter().position(|r| r.source == source) {
            Some(idx) => &mut self.reports[idx],
            None => {
                self.reports.push(SourceReport {
                    source: source.to_string(),
                    fields: BTreeMap::new(),
                });
                let last = self.reports.len() - 1;
                &mut self.reports[last]
            }
        };
        report.fields.insert(field.to_string(), value);
    }

    /// Builder form of [`insert`](Self::insert) for a whole field map.
    pub fn with_source<I, K, V>(mut self, source: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (field, value) in fields {
            self.insert(source, field.as_ref(), value.into());
        }
        self
    }

    pub fn reports(&self) -> &[SourceReport] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Observations for a field in source order. Sources that did not report
    /// the field, or reported it as Missing, are absent.
    pub fn observations_for(&self, field: &str) -> Vec<Observation> {
        self.reports
            .iter()
            .filter_map(|r| match r.fields.get(field) {
                Some(v) if !v.is_missing() => Some(Observation {
                    source: r.source.clone(),
                    value: v.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}
