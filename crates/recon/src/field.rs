//! Field validator: reconcile one field across sources.
//!
//! Zero sources -> Missing, one -> SingleSource, all equal -> None (0.98),
//! otherwise dispatch on value type. Disagreement is data, not an error; the
//! only error is a field whose values cannot be read as a single type.

use tracing::trace;

use crate::categorical;
use crate::error::ReconError;
use crate::model::{Discrepancy, FieldValidation};
use crate::numeric;
use crate::registry::ReliabilityRegistry;
use crate::value::{Observation, Value};

pub const MISSING_CONFIDENCE: f64 = 0.0;
pub const SINGLE_SOURCE_CONFIDENCE: f64 = 0.5;
pub const UNANIMOUS_CONFIDENCE: f64 = 0.98;

enum Kind<'a> {
    Numeric(Vec<(f64, f64)>),
    Text(Vec<(&'a str, f64)>),
}

/// Reconcile `observations` (one per reporting source, in source order).
pub fn validate_field(
    field: &str,
    observations: &[Observation],
    registry: &ReliabilityRegistry,
) -> Result<FieldValidation, ReconError> {
    let present: Vec<&Observation> = observations.iter().filter(|o| !o.value.is_missing()).collect();

    match present.len() {
        0 => {
            return Ok(FieldValidation::new(
                field,
                MISSING_CONFIDENCE,
                Discrepancy::Missing,
                Value::Missing,
                0,
            ))
        }
        1 => {
            check_finite(field, &present[0].value)?;
            return Ok(FieldValidation::new(
                field,
                SINGLE_SOURCE_CONFIDENCE,
                Discrepancy::SingleSource,
                present[0].value.clone(),
                1,
            ));
        }
        _ => {}
    }

    let kind = classify(field, &present, registry)?;
    let source_count = present.len();

    if all_equal(&kind) {
        trace!(field, source_count, "unanimous");
        return Ok(FieldValidation::new(
            field,
            UNANIMOUS_CONFIDENCE,
            Discrepancy::None,
            present[0].value.clone(),
            source_count,
        ));
    }

    let result = match kind {
        Kind::Numeric(samples) => {
            let out = numeric::reconcile(&samples);
            let mut fv = FieldValidation::new(
                field,
                out.confidence,
                out.discrepancy,
                Value::Number(out.consensus),
                source_count,
            );
            fv.std_deviation = Some(out.std_deviation);
            fv.coefficient_of_variation = Some(out.coefficient_of_variation);
            fv
        }
        Kind::Text(samples) => {
            let out = categorical::reconcile(&samples);
            let mut fv = FieldValidation::new(
                field,
                out.confidence,
                out.discrepancy,
                Value::Text(out.consensus),
                source_count,
            );
            fv.agreement_rate = Some(out.agreement_rate);
            fv
        }
    };

    trace!(
        field,
        source_count,
        confidence = result.confidence,
        discrepancy = %result.discrepancy,
        "reconciled"
    );
    Ok(result)
}

/// Resolve the field's type from its first value and attach weights. Every
/// other value must have the same type.
fn classify<'a>(
    field: &str,
    present: &[&'a Observation],
    registry: &ReliabilityRegistry,
) -> Result<Kind<'a>, ReconError> {
    match &present[0].value {
        Value::Number(_) => {
            let mut samples = Vec::with_capacity(present.len());
            for obs in present {
                match &obs.value {
                    Value::Number(n) if n.is_finite() => {
                        samples.push((*n, registry.weight_of(&obs.source)))
                    }
                    Value::Number(n) => return Err(non_finite(field, &obs.source, *n)),
                    other => return Err(mixed(field, &obs.source, "number", other)),
                }
            }
            Ok(Kind::Numeric(samples))
        }
        Value::Text(_) => {
            let mut samples = Vec::with_capacity(present.len());
            for obs in present {
                match &obs.value {
                    Value::Text(s) => samples.push((s.as_str(), registry.weight_of(&obs.source))),
                    other => return Err(mixed(field, &obs.source, "text", other)),
                }
            }
            Ok(Kind::Text(samples))
        }
        // Filtered out by the caller.
        Value::Missing => Err(ReconError::MalformedValue {
            field: field.to_string(),
            detail: "missing value in observation set".into(),
        }),
    }
}

fn all_equal(kind: &Kind<'_>) -> bool {
    match kind {
        Kind::Numeric(samples) => samples.windows(2).all(|w| w[0].0 == w[1].0),
        Kind::Text(samples) => {
            let first = samples[0].0.to_lowercase();
            samples.iter().all(|(s, _)| s.to_lowercase() == first)
        }
    }
}

fn check_finite(field: &str, value: &Value) -> Result<(), ReconError> {
    match value {
        Value::Number(n) if !n.is_finite() => Err(non_finite(field, "single source", *n)),
        _ => Ok(()),
    }
}

fn non_finite(field: &str, source: &str, n: f64) -> ReconError {
    ReconError::MalformedValue {
        field: field.to_string(),
        detail: format!("source '{source}' reported non-finite number {n}"),
    }
}

fn mixed(field: &str, source: &str, expected: &str, got: &Value) -> ReconError {
    ReconError::MalformedValue {
        field: field.to_string(),
        detail: format!("source '{source}' reported '{got}' where a {expected} was expected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ReliabilityRegistry {
        [("a", 0.95), ("b", 0.9), ("c", 0.5)].into_iter().collect()
    }

    #[test]
    fn zero_sources_is_missing() {
        let fv = validate_field("home_score", &[], &registry()).unwrap();
        assert_eq!(fv.discrepancy, Discrepancy::Missing);
        assert_eq!(fv.confidence, 0.0);
        assert_eq!(fv.consensus, Value::Missing);
        assert_eq!(fv.source_count, 0);
    }

    #[test]
    fn missing_values_count_as_absent() {
        let obs = vec![Observation::new("a", Value::Missing), Observation::new("b", 21.0)];
        let fv = validate_field("home_score", &obs, &registry()).unwrap();
        assert_eq!(fv.discrepancy, Discrepancy::SingleSource);
        assert_eq!(fv.consensus, Value::Number(21.0));
    }

    #[test]
    fn single_source() {
        let obs = vec![Observation::new("c", "Lakers")];
        let fv = validate_field("winner", &obs, &registry()).unwrap();
        assert_eq!(fv.discrepancy, Discrepancy::SingleSource);
        assert_eq!(fv.confidence, 0.5);
        assert_eq!(fv.consensus, Value::Text("Lakers".into()));
    }

    #[test]
    fn unanimous_numeric() {
        let obs = vec![
            Observation::new("a", 24.0),
            Observation::new("b", 24.0),
            Observation::new("c", 24.0),
        ];
        let fv = validate_field("home_score", &obs, &registry()).unwrap();
        assert_eq!(fv.discrepancy, Discrepancy::None);
        assert_eq!(fv.confidence, 0.98);
        assert_eq!(fv.consensus, Value::Number(24.0));
        assert!(fv.std_deviation.is_none());
    }

    #[test]
    fn unanimous_text_ignores_case() {
        let obs = vec![Observation::new("b", "Lakers"), Observation::new("a", "LAKERS")];
        let fv = validate_field("winner", &obs, &registry()).unwrap();
        assert_eq!(fv.discrepancy, Discrepancy::None);
        assert_eq!(fv.consensus, Value::Text("Lakers".into()));
    }

    #[test]
    fn numeric_dispatch() {
        let obs = vec![
            Observation::new("a", 24.0),
            Observation::new("b", 24.0),
            Observation::new("c", 21.0),
        ];
        let fv = validate_field("home_score", &obs, &registry()).unwrap();
        assert_eq!(fv.discrepancy, Discrepancy::Moderate);
        assert_eq!(fv.confidence, 0.70);
        assert_eq!(fv.consensus, Value::Number(23.36));
        assert!(fv.coefficient_of_variation.unwrap() > 0.05);
        assert!(fv.agreement_rate.is_none());
    }

    #[test]
    fn text_dispatch() {
        let reg: ReliabilityRegistry = [("a", 0.9), ("b", 0.9), ("c", 0.6)].into_iter().collect();
        let obs = vec![
            Observation::new("a", "Lakers"),
            Observation::new("b", "lakers"),
            Observation::new("c", "Celtics"),
        ];
        let fv = validate_field("winner", &obs, &reg).unwrap();
        assert_eq!(fv.consensus, Value::Text("Lakers".into()));
        assert_eq!(fv.discrepancy, Discrepancy::Minor);
        assert!((fv.confidence - 0.75).abs() < 1e-12);
        assert!(fv.agreement_rate.is_some());
    }

    #[test]
    fn mixed_types_are_malformed() {
        let obs = vec![Observation::new("a", 24.0), Observation::new("b", "twenty-four")];
        let err = validate_field("home_score", &obs, &registry()).unwrap_err();
        match err {
            ReconError::MalformedValue { field, detail } => {
                assert_eq!(field, "home_score");
                assert!(detail.contains("'b'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_is_malformed() {
        let obs = vec![Observation::new("a", 24.0), Observation::new("b", f64::INFINITY)];
        assert!(validate_field("home_score", &obs, &registry()).is_err());
        let obs = vec![Observation::new("a", f64::NAN)];
        assert!(validate_field("home_score", &obs, &registry()).is_err());
    }

    #[test]
    fn huge_numbers_keep_a_serializable_consensus() {
        let obs = vec![Observation::new("a", 1e307), Observation::new("b", 2e307)];
        let fv = validate_field("attendance", &obs, &registry()).unwrap();
        match fv.consensus {
            Value::Number(n) => assert!(n.is_finite(), "consensus overflowed: {n}"),
            ref other => panic!("expected a number, got {other:?}"),
        }

        let json = serde_json::to_string(&fv).unwrap();
        let back: FieldValidation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fv);
    }
}
