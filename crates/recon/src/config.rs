use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::ReconError;
use crate::registry::{ReliabilityRegistry, DEFAULT_WEIGHT};

/// Fields below this confidence produce a warning unless overridden.
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f64 = 0.7;

/// Multiplier applied to baseline limits before a value counts as anomalous.
pub const DEFAULT_OUTLIER_FACTOR: f64 = 1.5;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default = "default_threshold")]
    pub acceptance_threshold: f64,
    #[serde(default = "default_weight")]
    pub default_weight: f64,
    /// Reliability weight per source name.
    #[serde(default)]
    pub sources: HashMap<String, f64>,
    pub domains: BTreeMap<String, DomainConfig>,
}

fn default_threshold() -> f64 {
    DEFAULT_ACCEPTANCE_THRESHOLD
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// Per-domain required fields, importance weights and baseline.
///
/// Identity fields (date, team names) usually carry a higher importance than
/// statistics: an error there invalidates the whole record.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    pub required_fields: Vec<String>,
    #[serde(default = "default_importance")]
    pub default_importance: f64,
    #[serde(default)]
    pub importance: HashMap<String, f64>,
    #[serde(default)]
    pub baseline: Option<Baseline>,
}

fn default_importance() -> f64 {
    1.0
}

impl DomainConfig {
    pub fn new(required_fields: &[&str]) -> Self {
        Self {
            required_fields: required_fields.iter().map(|f| f.to_string()).collect(),
            default_importance: default_importance(),
            importance: HashMap::new(),
            baseline: None,
        }
    }

    pub fn with_importance(mut self, field: &str, importance: f64) -> Self {
        self.importance.insert(field.to_string(), importance);
        self
    }

    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.baseline = Some(baseline);
        self
    }

    pub fn importance_of(&self, field: &str) -> f64 {
        self.importance.get(field).copied().unwrap_or(self.default_importance)
    }
}

// ---------------------------------------------------------------------------
// Baseline
// ---------------------------------------------------------------------------

/// Expected ranges for a domain, used only by the anomaly detector.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Baseline {
    #[serde(default)]
    pub max_total: Option<f64>,
    #[serde(default)]
    pub max_spread: Option<f64>,
    #[serde(default = "default_outlier_factor")]
    pub outlier_factor: f64,
    #[serde(default = "default_home_field")]
    pub home_field: String,
    #[serde(default = "default_away_field")]
    pub away_field: String,
    /// Fields that can never be negative.
    #[serde(default)]
    pub non_negative: Vec<String>,
    /// Hard per-field ceilings, not scaled by `outlier_factor`.
    #[serde(default)]
    pub ceilings: BTreeMap<String, f64>,
}

fn default_outlier_factor() -> f64 {
    DEFAULT_OUTLIER_FACTOR
}

fn default_home_field() -> String {
    "home_score".into()
}

fn default_away_field() -> String {
    "away_score".into()
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            max_total: None,
            max_spread: None,
            outlier_factor: DEFAULT_OUTLIER_FACTOR,
            home_field: default_home_field(),
            away_field: default_away_field(),
            non_negative: Vec::new(),
            ceilings: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ReconError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml(&input)
    }

    pub fn domain(&self, name: &str) -> Result<&DomainConfig, ReconError> {
        self.domains
            .get(name)
            .ok_or_else(|| ReconError::UnknownDomain(name.to_string()))
    }

    /// Build the reliability registry described by `[sources]`.
    pub fn registry(&self) -> ReliabilityRegistry {
        ReliabilityRegistry::new(self.sources.clone()).with_default_weight(self.default_weight)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        check_unit("acceptance_threshold", self.acceptance_threshold)?;
        check_unit("default_weight", self.default_weight)?;

        for (source, weight) in &self.sources {
            check_unit(&format!("source '{source}' weight"), *weight)?;
        }

        if self.domains.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one domain is required".into(),
            ));
        }

        for (name, domain) in &self.domains {
            validate_domain(name, domain)?;
        }

        Ok(())
    }
}

fn validate_domain(name: &str, domain: &DomainConfig) -> Result<(), ReconError> {
    if domain.required_fields.is_empty() {
        return Err(ReconError::ConfigValidation(format!(
            "domain '{name}': required_fields is empty"
        )));
    }

    let mut seen = HashSet::new();
    for field in &domain.required_fields {
        if !seen.insert(field.as_str()) {
            return Err(ReconError::ConfigValidation(format!(
                "domain '{name}': duplicate required field '{field}'"
            )));
        }
    }

    check_importance(name, "default_importance", domain.default_importance)?;
    for (field, importance) in &domain.importance {
        check_importance(name, field, *importance)?;
    }

    if let Some(ref baseline) = domain.baseline {
        for (label, limit) in [("max_total", baseline.max_total), ("max_spread", baseline.max_spread)] {
            if let Some(limit) = limit {
                check_positive(name, label, limit)?;
            }
        }
        for (field, ceiling) in &baseline.ceilings {
            check_positive(name, &format!("ceiling '{field}'"), *ceiling)?;
        }
        if !baseline.outlier_factor.is_finite() || baseline.outlier_factor < 1.0 {
            return Err(ReconError::ConfigValidation(format!(
                "domain '{name}': outlier_factor must be >= 1, got {}",
                baseline.outlier_factor
            )));
        }
    }

    Ok(())
}

fn check_unit(label: &str, value: f64) -> Result<(), ReconError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ReconError::ConfigValidation(format!(
            "{label} must be within [0, 1], got {value}"
        )))
    }
}

fn check_importance(domain: &str, field: &str, value: f64) -> Result<(), ReconError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ReconError::ConfigValidation(format!(
            "domain '{domain}': importance for '{field}' must be >= 0, got {value}"
        )))
    }
}

fn check_positive(domain: &str, label: &str, value: f64) -> Result<(), ReconError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ReconError::ConfigValidation(format!(
            "domain '{domain}': {label} must be > 0, got {value}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
