//! Source feed boundary.
//!
//! A feed turns whatever the outside world produced into a [`SourceSet`] of
//! typed values. The two feeds here read pre-fetched observation documents
//! (long-format CSV, nested JSON); network feeds implement the same trait.

use tracing::debug;

use crate::error::ReconError;
use crate::value::{SourceSet, Value};

/// Supplies observations for one logical entity.
pub trait SourceFeed {
    fn fetch_observations(&self, entity_id: &str, domain: &str) -> Result<SourceSet, ReconError>;

    /// Entities this feed can answer for in `domain`, in document order.
    fn entity_ids(&self, domain: &str) -> Vec<String>;
}

#[derive(Debug, Clone)]
struct FeedEntity {
    entity_id: String,
    /// None when the document carries no domain column.
    domain: Option<String>,
    sources: SourceSet,
}

impl FeedEntity {
    fn serves(&self, domain: &str) -> bool {
        self.domain.as_deref().map_or(true, |d| d == domain)
    }
}

fn fetch<'a>(entities: &'a [FeedEntity], entity_id: &str, domain: &str) -> Result<&'a SourceSet, ReconError> {
    entities
        .iter()
        .find(|e| e.entity_id == entity_id && e.serves(domain))
        .map(|e| &e.sources)
        .ok_or_else(|| ReconError::Feed(format!("no observations for entity '{entity_id}' in domain '{domain}'")))
}

fn ids(entities: &[FeedEntity], domain: &str) -> Vec<String> {
    entities
        .iter()
        .filter(|e| e.serves(domain))
        .map(|e| e.entity_id.clone())
        .collect()
}

/// Entity for one CSV row. A blank domain cell means "every domain", so an
/// entity id may not mix blank and set domains: that would split its sources
/// across two entities that both answer for the same domain.
fn entity_mut<'a>(
    entities: &'a mut Vec<FeedEntity>,
    entity_id: &str,
    domain: Option<&str>,
    row: usize,
) -> Result<&'a mut FeedEntity, ReconError> {
    let mixed = entities
        .iter()
        .any(|e| e.entity_id == entity_id && e.domain.is_some() != domain.is_some());
    if mixed {
        return Err(ReconError::Feed(format!(
            "row {row}: entity '{entity_id}' mixes blank and set domain cells"
        )));
    }

    let pos = entities
        .iter()
        .position(|e| e.entity_id == entity_id && e.domain.as_deref() == domain);
    let idx = match pos {
        Some(idx) => idx,
        None => {
            entities.push(FeedEntity {
                entity_id: entity_id.to_string(),
                domain: domain.map(str::to_string),
                sources: SourceSet::new(),
            });
            entities.len() - 1
        }
    };
    Ok(&mut entities[idx])
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Long-format CSV: one row per (entity, source, field).
///
/// Required columns: `entity_id`, `source`, `field`, `value`. An optional
/// `domain` column scopes rows to one domain.
#[derive(Debug, Clone, Default)]
pub struct CsvFeed {
    entities: Vec<FeedEntity>,
}

impl CsvFeed {
    pub fn from_csv(csv_data: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ReconError::Feed(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let idx = |name: &str| -> Result<usize, ReconError> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ReconError::Feed(format!("missing column '{name}'")))
        };

        let entity_idx = idx("entity_id")?;
        let source_idx = idx("source")?;
        let field_idx = idx("field")?;
        let value_idx = idx("value")?;
        let domain_idx = headers.iter().position(|h| h == "domain");

        let mut entities = Vec::new();
        let mut rows = 0usize;

        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ReconError::Feed(e.to_string()))?;
            let get = |i: usize| record.get(i).unwrap_or("").trim();

            let entity_id = get(entity_idx);
            let source = get(source_idx);
            let field = get(field_idx);
            if entity_id.is_empty() || source.is_empty() || field.is_empty() {
                // +2: header row and 1-based numbering
                return Err(ReconError::Feed(format!(
                    "row {}: entity_id, source and field must be non-empty",
                    line + 2
                )));
            }

            let domain = domain_idx.map(get).filter(|d| !d.is_empty());
            entity_mut(&mut entities, entity_id, domain, line + 2)?
                .sources
                .insert(source, field, Value::from_raw(get(value_idx)));
            rows += 1;
        }

        debug!(rows, entities = entities.len(), "loaded csv feed");
        Ok(Self { entities })
    }
}

impl SourceFeed for CsvFeed {
    fn fetch_observations(&self, entity_id: &str, domain: &str) -> Result<SourceSet, ReconError> {
        fetch(&self.entities, entity_id, domain).cloned()
    }

    fn entity_ids(&self, domain: &str) -> Vec<String> {
        ids(&self.entities, domain)
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Nested JSON: `{ "<entity>": { "<source>": { "<field>": value } } }`.
///
/// Source order follows document order.
#[derive(Debug, Clone, Default)]
pub struct JsonFeed {
    entities: Vec<FeedEntity>,
}

impl JsonFeed {
    pub fn from_json(json: &str) -> Result<Self, ReconError> {
        let doc: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ReconError::Feed(e.to_string()))?;

        let root = doc
            .as_object()
            .ok_or_else(|| ReconError::Feed("top level must be an object keyed by entity id".into()))?;

        let mut entities = Vec::new();
        for (entity_id, by_source) in root {
            let by_source = by_source.as_object().ok_or_else(|| {
                ReconError::Feed(format!("entity '{entity_id}': expected an object keyed by source"))
            })?;

            let mut sources = SourceSet::new();
            for (source, fields) in by_source {
                let fields = fields.as_object().ok_or_else(|| {
                    ReconError::Feed(format!(
                        "entity '{entity_id}', source '{source}': expected an object keyed by field"
                    ))
                })?;
                for (field, value) in fields {
                    sources.insert(source, field, Value::from_json(field, value));
                }
            }

            entities.push(FeedEntity {
                entity_id: entity_id.clone(),
                domain: None,
                sources,
            });
        }

        debug!(entities = entities.len(), "loaded json feed");
        Ok(Self { entities })
    }
}

impl SourceFeed for JsonFeed {
    fn fetch_observations(&self, entity_id: &str, domain: &str) -> Result<SourceSet, ReconError> {
        fetch(&self.entities, entity_id, domain).cloned()
    }

    fn entity_ids(&self, domain: &str) -> Vec<String> {
        ids(&self.entities, domain)
    }
}
