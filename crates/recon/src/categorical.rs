//! Reliability-weighted plurality vote for text fields.

use crate::model::Discrepancy;

/// Categorical reconciliation output for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalOutcome {
    /// Winning value in the casing of the first source that reported it.
    pub consensus: String,
    /// Winner's share of total weight.
    pub confidence: f64,
    /// Share of sources (unweighted) agreeing with the winner.
    pub agreement_rate: f64,
    pub discrepancy: Discrepancy,
}

struct Bucket<'a> {
    normalized: String,
    original: &'a str,
    weight: f64,
    count: usize,
}

/// Vote over `(value, weight)` pairs given in source order.
///
/// Comparison is case-insensitive. Ties on weighted votes go to the bucket
/// whose first voter came earliest.
pub fn reconcile<'a>(samples: &[(&'a str, f64)]) -> CategoricalOutcome {
    // Zero total weight would make every share 0/0; vote unweighted instead.
    let uniform = samples.iter().map(|(_, w)| w).sum::<f64>() <= 0.0;

    let mut buckets: Vec<Bucket<'a>> = Vec::new();
    for &(value, weight) in samples {
        let weight = if uniform { 1.0 } else { weight };
        let normalized = value.to_lowercase();
        match buckets.iter_mut().find(|b| b.normalized == normalized) {
            Some(b) => {
                b.weight += weight;
                b.count += 1;
            }
            None => buckets.push(Bucket {
                normalized,
                original: value,
                weight,
                count: 1,
            }),
        }
    }

    let total_weight: f64 = buckets.iter().map(|b| b.weight).sum();
    let total_count: usize = buckets.iter().map(|b| b.count).sum();

    // Strict comparison keeps the earliest bucket on ties.
    let mut winner: Option<&Bucket<'a>> = None;
    for b in &buckets {
        if winner.map_or(true, |w| b.weight > w.weight) {
            winner = Some(b);
        }
    }

    let (consensus, confidence, agreement_rate) = match winner {
        Some(w) => (
            w.original.to_string(),
            ratio(w.weight, total_weight),
            ratio(w.count as f64, total_count as f64),
        ),
        None => (String::new(), 0.0, 0.0),
    };

    CategoricalOutcome {
        consensus,
        confidence,
        agreement_rate,
        discrepancy: classify(confidence),
    }
}

/// Text disagreements never reach Critical.
pub fn classify(confidence: f64) -> Discrepancy {
    if confidence > 0.8 {
        Discrepancy::None
    } else if confidence > 0.6 {
        Discrepancy::Minor
    } else {
        Discrepancy::Moderate
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}
