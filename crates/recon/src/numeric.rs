//! Statistical agreement check for numeric fields.
//!
//! The spread across sources is measured as the coefficient of variation
//! (population standard deviation over |mean|) and mapped onto four tiers:
//!
//! | cv            | confidence | discrepancy |
//! |---------------|------------|-------------|
//! | < 0.01        | 0.95       | Minor       |
//! | [0.01, 0.05)  | 0.85       | Minor       |
//! | [0.05, 0.15)  | 0.70       | Moderate    |
//! | >= 0.15       | 0.50       | Critical    |
//!
//! The Critical tier caps confidence no matter how many sources sit in the
//! outlier cluster.

use crate::model::Discrepancy;

/// Numeric reconciliation output for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericOutcome {
    pub mean: f64,
    pub std_deviation: f64,
    pub coefficient_of_variation: f64,
    /// Reliability-weighted average, rounded to 2 decimal places.
    pub consensus: f64,
    pub confidence: f64,
    pub discrepancy: Discrepancy,
}

/// Reconcile `(value, weight)` pairs. Expects at least one pair; callers
/// route the 0/1-source cases elsewhere.
///
/// Pairs are summed in (value, weight) order, so the result does not depend
/// on the order sources were supplied in.
pub fn reconcile(samples: &[(f64, f64)]) -> NumericOutcome {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let (mean, std_deviation) = spread(&sorted);

    let coefficient_of_variation = if mean == 0.0 {
        0.0
    } else {
        (std_deviation / mean.abs()).min(f64::MAX)
    };

    let (confidence, discrepancy) = tier(coefficient_of_variation);

    NumericOutcome {
        mean,
        std_deviation,
        coefficient_of_variation,
        consensus: round2(weighted_mean(&sorted, mean)),
        confidence,
        discrepancy,
    }
}

/// Population mean and standard deviation. Values near `f64::MAX` are
/// rescaled by the largest magnitude so neither overflows.
fn spread(samples: &[(f64, f64)]) -> (f64, f64) {
    let n = samples.len().max(1) as f64;
    let mean = samples.iter().map(|(v, _)| v).sum::<f64>() / n;
    let variance = samples.iter().map(|(v, _)| (v - mean).powi(2)).sum::<f64>() / n;
    if mean.is_finite() && variance.is_finite() {
        return (mean, variance.sqrt());
    }

    let scale = samples.iter().map(|(v, _)| v.abs()).fold(0.0, f64::max);
    if scale == 0.0 || !scale.is_finite() {
        return (0.0, 0.0);
    }
    let scaled_mean = samples.iter().map(|(v, _)| v / scale).sum::<f64>() / n;
    let scaled_variance = samples
        .iter()
        .map(|(v, _)| (v / scale - scaled_mean).powi(2))
        .sum::<f64>()
        / n;
    (scaled_mean * scale, scaled_variance.sqrt() * scale)
}

/// Map a coefficient of variation onto (confidence, discrepancy).
/// Lower bounds are inclusive.
pub fn tier(cv: f64) -> (f64, Discrepancy) {
    if cv < 0.01 {
        (0.95, Discrepancy::Minor)
    } else if cv < 0.05 {
        (0.85, Discrepancy::Minor)
    } else if cv < 0.15 {
        (0.70, Discrepancy::Moderate)
    } else {
        (0.50, Discrepancy::Critical)
    }
}

/// Σ(value·weight) / Σ(weight). Falls back to `mean` when every weight is
/// zero, and to Σ(weight/Σweight·value) when the plain sum overflows.
fn weighted_mean(samples: &[(f64, f64)], mean: f64) -> f64 {
    let total_weight: f64 = samples.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return mean;
    }
    let plain = samples.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight;
    if plain.is_finite() {
        return plain;
    }
    samples.iter().map(|(v, w)| (w / total_weight) * v).sum()
}

/// Round to 2 dp. Magnitudes too large to scale are already whole numbers.
fn round2(x: f64) -> f64 {
    let scaled = x * 100.0;
    if !scaled.is_finite() {
        return x;
    }
    scaled.round() / 100.0
}
