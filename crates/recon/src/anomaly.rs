//! Anomaly detection against domain baselines.
//!
//! Independent of source agreement: every source can agree on an impossible
//! value, and only a baseline check catches that.

use std::collections::BTreeMap;

use crate::config::Baseline;
use crate::value::Value;

/// Check a record's consensus values against `baseline`. Returns one
/// human-readable line per finding; empty means nothing unusual.
pub fn detect(consensus: &BTreeMap<String, Value>, baseline: &Baseline) -> Vec<String> {
    let mut anomalies = Vec::new();
    let number = |field: &str| consensus.get(field).and_then(Value::as_number);

    if let (Some(home), Some(away)) = (number(&baseline.home_field), number(&baseline.away_field)) {
        if let Some(max_total) = baseline.max_total {
            let limit = max_total * baseline.outlier_factor;
            let total = home + away;
            if total > limit {
                anomalies.push(format!(
                    "unusual total: {} + {} = {total} exceeds {limit} ({}x baseline {max_total})",
                    baseline.home_field, baseline.away_field, baseline.outlier_factor
                ));
            }
        }
        if let Some(max_spread) = baseline.max_spread {
            let limit = max_spread * baseline.outlier_factor;
            let spread = (home - away).abs();
            if spread > limit {
                anomalies.push(format!(
                    "unusual spread: |{} - {}| = {spread} exceeds {limit} ({}x baseline {max_spread})",
                    baseline.home_field, baseline.away_field, baseline.outlier_factor
                ));
            }
        }
    }

    for field in &baseline.non_negative {
        if let Some(v) = number(field) {
            if v < 0.0 {
                anomalies.push(format!("negative value on {field}: {v}"));
            }
        }
    }

    for (field, ceiling) in &baseline.ceilings {
        if let Some(v) = number(field) {
            if v > *ceiling {
                anomalies.push(format!("{field} = {v} exceeds ceiling {ceiling}"));
            }
        }
    }

    anomalies
}
