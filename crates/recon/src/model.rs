use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::Value;

// ---------------------------------------------------------------------------
// Discrepancy
// ---------------------------------------------------------------------------

/// Severity of disagreement among sources for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discrepancy {
    None,
    Minor,
    Moderate,
    Critical,
    Missing,
    SingleSource,
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Minor => write!(f, "minor"),
            Self::Moderate => write!(f, "moderate"),
            Self::Critical => write!(f, "critical"),
            Self::Missing => write!(f, "missing"),
            Self::SingleSource => write!(f, "single_source"),
        }
    }
}

// ---------------------------------------------------------------------------
// Field result
// ---------------------------------------------------------------------------

/// Result of reconciling one field across sources.
///
/// `consensus` is `Missing` when no source reported the field. The numeric
/// statistics are only set when the numeric reconciler ran; `agreement_rate`
/// only when the categorical one did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    pub field: String,
    pub confidence: f64,
    pub discrepancy: Discrepancy,
    pub consensus: Value,
    pub source_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_deviation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coefficient_of_variation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_rate: Option<f64>,
}

impl FieldValidation {
    pub(crate) fn new(field: &str, confidence: f64, discrepancy: Discrepancy, consensus: Value, source_count: usize) -> Self {
        Self {
            field: field.to_string(),
            confidence,
            discrepancy,
            consensus,
            source_count,
            std_deviation: None,
            coefficient_of_variation: None,
            agreement_rate: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Record result
// ---------------------------------------------------------------------------

/// Aggregate validation for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordValidation {
    pub entity_id: String,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    pub fields: BTreeMap<String, FieldValidation>,
    pub overall_confidence: f64,
    pub warnings: Vec<String>,
    pub critical_errors: Vec<String>,
    pub consensus: BTreeMap<String, Value>,
    #[serde(default)]
    pub anomalies: Vec<String>,
}

impl RecordValidation {
    /// True when nothing needs human review: no critical errors, no anomalies.
    pub fn is_clean(&self) -> bool {
        self.critical_errors.is_empty() && self.anomalies.is_empty()
    }

    /// True when every field cleared the acceptance threshold.
    pub fn is_accepted(&self) -> bool {
        self.warnings.is_empty() && self.is_clean()
    }
}
