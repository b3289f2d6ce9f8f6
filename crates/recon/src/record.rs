//! Record validator: reconcile every required field of one entity and
//! aggregate into a [`RecordValidation`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::DomainConfig;
use crate::error::ReconError;
use crate::field::validate_field;
use crate::model::{Discrepancy, RecordValidation};
use crate::registry::ReliabilityRegistry;
use crate::value::SourceSet;

/// Everything needed to validate records of one domain. Borrowed, so it is
/// free to build one per call.
pub struct RecordValidator<'a> {
    pub domain_name: &'a str,
    pub domain: &'a DomainConfig,
    pub registry: &'a ReliabilityRegistry,
    pub acceptance_threshold: f64,
}

impl<'a> RecordValidator<'a> {
    /// Pure: the same inputs always give the same result.
    pub fn validate(&self, entity_id: &str, sources: &SourceSet, timestamp: DateTime<Utc>) -> RecordValidation {
        let mut fields = BTreeMap::new();
        let mut warnings = Vec::new();
        let mut critical_errors = Vec::new();

        let mut weighted_sum = 0.0;
        let mut importance_sum = 0.0;

        for field in &self.domain.required_fields {
            let importance = self.domain.importance_of(field);
            importance_sum += importance;

            let observations = sources.observations_for(field);
            let fv = match validate_field(field, &observations, self.registry) {
                Ok(fv) => fv,
                Err(ReconError::MalformedValue { field, detail }) => {
                    // Counts as zero confidence; the rest of the record continues.
                    warn!(entity_id, field = %field, %detail, "malformed field");
                    critical_errors.push(format!("malformed value on {field}: {detail}"));
                    continue;
                }
                Err(e) => {
                    warn!(entity_id, field = %field, error = %e, "field validation failed");
                    critical_errors.push(format!("validation failed on {field}: {e}"));
                    continue;
                }
            };

            weighted_sum += fv.confidence * importance;

            if fv.confidence < self.acceptance_threshold {
                warnings.push(format!("low confidence on {field}: {:.2}", fv.confidence));
            }
            if fv.discrepancy == Discrepancy::Critical {
                critical_errors.push(format!("critical mismatch on {field}"));
            }

            fields.insert(field.clone(), fv);
        }

        let overall_confidence = if fields.is_empty() || importance_sum <= 0.0 {
            0.0
        } else {
            weighted_sum / importance_sum
        };

        let consensus = fields
            .iter()
            .map(|(name, fv)| (name.clone(), fv.consensus.clone()))
            .collect();

        debug!(
            entity_id,
            domain = self.domain_name,
            sources = sources.len(),
            overall_confidence,
            warnings = warnings.len(),
            critical = critical_errors.len(),
            "record validated"
        );

        RecordValidation {
            entity_id: entity_id.to_string(),
            domain: self.domain_name.to_string(),
            timestamp,
            fields,
            overall_confidence,
            warnings,
            critical_errors,
            consensus,
            anomalies: Vec::new(),
        }
    }
}
