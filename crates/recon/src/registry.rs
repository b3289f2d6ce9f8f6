//! Source reliability weights.
//!
//! [`ReliabilityRegistry`] is an immutable value. [`SharedRegistry`] holds the
//! current one behind a lock that is only ever used to swap whole `Arc`s, so a
//! reader sees either the old table or the new one, never a mix.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Weight used for sources that have no configured entry.
pub const DEFAULT_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ReliabilityRegistry {
    weights: HashMap<String, f64>,
    default_weight: f64,
}

impl Default for ReliabilityRegistry {
    fn default() -> Self {
        Self {
            weights: HashMap::new(),
            default_weight: DEFAULT_WEIGHT,
        }
    }
}

impl ReliabilityRegistry {
    pub fn new(weights: HashMap<String, f64>) -> Self {
        Self {
            weights,
            default_weight: DEFAULT_WEIGHT,
        }
    }

    pub fn with_default_weight(mut self, weight: f64) -> Self {
        self.default_weight = weight;
        self
    }

    /// Configured weight for `source`, or the default weight if unseen.
    pub fn weight_of(&self, source: &str) -> f64 {
        self.weights.get(source).copied().unwrap_or(self.default_weight)
    }

    pub fn default_weight(&self) -> f64 {
        self.default_weight
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ReliabilityRegistry {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Hot-reloadable handle to the current registry. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Arc<ReliabilityRegistry>>>,
}

impl SharedRegistry {
    pub fn new(registry: ReliabilityRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    /// The registry in effect right now. Hold on to it for the whole
    /// reconciliation call.
    pub fn snapshot(&self) -> Arc<ReliabilityRegistry> {
        self.inner.read().clone()
    }

    /// Replace the whole table.
    pub fn replace(&self, registry: ReliabilityRegistry) {
        *self.inner.write() = Arc::new(registry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_source_gets_default() {
        let reg: ReliabilityRegistry = [("espn", 0.95)].into_iter().collect();
        assert_eq!(reg.weight_of("espn"), 0.95);
        assert_eq!(reg.weight_of("blog"), 0.5);

        let reg = reg.with_default_weight(0.2);
        assert_eq!(reg.weight_of("blog"), 0.2);
    }

    #[test]
    fn snapshot_survives_replace() {
        let shared = SharedRegistry::new([("a", 0.9)].into_iter().collect());
        let before = shared.snapshot();

        shared.replace([("a", 0.1)].into_iter().collect());

        assert_eq!(before.weight_of("a"), 0.9);
        assert_eq!(shared.snapshot().weight_of("a"), 0.1);
    }

    #[test]
    fn concurrent_readers_see_whole_tables() {
        let shared = SharedRegistry::new([("a", 0.9), ("b", 0.9)].into_iter().collect());

        std::thread::scope(|s| {
            for _ in 0..4 {
                let shared = shared.clone();
                s.spawn(move || {
                    for _ in 0..1000 {
                        let reg = shared.snapshot();
                        // Both weights always come from the same table.
                        assert_eq!(reg.weight_of("a"), reg.weight_of("b"));
                    }
                });
            }
            for i in 0..100 {
                let w = if i % 2 == 0 { 0.1 } else { 0.9 };
                shared.replace([("a", w), ("b", w)].into_iter().collect());
            }
        });
    }
}
