use serde::{Deserialize, Serialize};

use crate::model::RecordValidation;

/// Records at or above this overall confidence count as high confidence.
pub const HIGH_CONFIDENCE: f64 = 0.9;

/// Aggregate reporting stats over a set of validations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStats {
    pub count: usize,
    pub avg_confidence: f64,
    pub high_confidence_rate: f64,
    /// Number of records with at least one critical error.
    pub critical_error_count: usize,
}

/// Compute stats from in-memory validations.
pub fn summarize<'a, I>(records: I) -> RecordStats
where
    I: IntoIterator<Item = &'a RecordValidation>,
{
    let mut count = 0;
    let mut confidence_sum = 0.0;
    let mut high = 0;
    let mut critical_error_count = 0;

    for r in records {
        count += 1;
        confidence_sum += r.overall_confidence;
        if r.overall_confidence >= HIGH_CONFIDENCE {
            high += 1;
        }
        if !r.critical_errors.is_empty() {
            critical_error_count += 1;
        }
    }

    if count == 0 {
        return RecordStats::default();
    }

    RecordStats {
        count,
        avg_confidence: confidence_sum / count as f64,
        high_confidence_rate: high as f64 / count as f64,
        critical_error_count,
    }
}
