use std::path::Path;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::anomaly;
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::feed::SourceFeed;
use crate::model::RecordValidation;
use crate::record::RecordValidator;
use crate::registry::SharedRegistry;
use crate::value::SourceSet;

/// Reconciliation entry point: config, domains and the live reliability
/// registry. Shareable across threads; every call is independent.
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: ReconConfig,
    registry: SharedRegistry,
}

impl Reconciler {
    pub fn new(config: ReconConfig) -> Self {
        let registry = SharedRegistry::new(config.registry());
        Self { config, registry }
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        Ok(Self::new(ReconConfig::from_toml(input)?))
    }

    pub fn from_file(path: &Path) -> Result<Self, ReconError> {
        Ok(Self::new(ReconConfig::from_file(path)?))
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// Handle to the live registry; replacing through it is seen by every
    /// clone of this reconciler.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Swap in the reliability weights of a freshly loaded config. Domains
    /// stay as they were at construction.
    pub fn reload(&self, config: &ReconConfig) {
        info!(sources = config.sources.len(), "reloading reliability weights");
        self.registry.replace(config.registry());
    }

    /// Validate one entity, stamped with the current time.
    pub fn validate(&self, entity_id: &str, domain: &str, sources: &SourceSet) -> Result<RecordValidation, ReconError> {
        self.validate_at(entity_id, domain, sources, Utc::now())
    }

    /// Validate one entity with an explicit timestamp. Deterministic.
    pub fn validate_at(
        &self,
        entity_id: &str,
        domain: &str,
        sources: &SourceSet,
        timestamp: DateTime<Utc>,
    ) -> Result<RecordValidation, ReconError> {
        let domain_config = self.config.domain(domain)?;
        let registry = self.registry.snapshot();

        let validator = RecordValidator {
            domain_name: domain,
            domain: domain_config,
            registry: &registry,
            acceptance_threshold: self.config.acceptance_threshold,
        };
        let mut record = validator.validate(entity_id, sources, timestamp);

        if let Some(ref baseline) = domain_config.baseline {
            record.anomalies = anomaly::detect(&record.consensus, baseline);
            if !record.anomalies.is_empty() {
                debug!(entity_id, domain, anomalies = record.anomalies.len(), "anomalies detected");
            }
        }

        Ok(record)
    }

    /// Fetch through `feed`, then validate.
    pub fn validate_feed<F: SourceFeed + ?Sized>(
        &self,
        feed: &F,
        entity_id: &str,
        domain: &str,
    ) -> Result<RecordValidation, ReconError> {
        // Unknown domain is a config error; report it before touching the feed.
        self.config.domain(domain)?;
        let sources = feed.fetch_observations(entity_id, domain)?;
        self.validate(entity_id, domain, &sources)
    }

    /// Validate many entities of one domain in parallel. Output order
    /// matches input order.
    pub fn validate_batch(
        &self,
        domain: &str,
        entities: &[(String, SourceSet)],
    ) -> Result<Vec<RecordValidation>, ReconError> {
        self.config.domain(domain)?;
        let timestamp = Utc::now();

        let records = entities
            .par_iter()
            .map(|(entity_id, sources)| self.validate_at(entity_id, domain, sources, timestamp))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(domain, records = records.len(), "batch validated");
        Ok(records)
    }
}
