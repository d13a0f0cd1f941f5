//! Producer trait — the abstraction over specialist workers.
//!
//! A producer does its specialist work for a query (search, analysis,
//! anything) and exports one [`Snapshot`]. Producers never see each other's
//! output and never generate conversational hand-off text — the merge
//! engine combines their snapshots directly.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProducerError;
use crate::snapshot::Snapshot;

/// The core Producer trait.
///
/// Each specialist worker implements this trait. Producers are registered
/// in the [`ProducerRegistry`] and fanned out in parallel by the
/// coordinator, which treats any returned error as a total failure of that
/// producer for the run.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Stable identifier, unique within a registry (e.g. "web_search").
    fn producer_id(&self) -> &str;

    /// Human-readable description of what this producer specializes in.
    fn description(&self) -> &str {
        ""
    }

    /// Do specialist work and return structured state for the query.
    async fn produce(&self, query: &str) -> std::result::Result<Snapshot, ProducerError>;
}

/// A registry of available producers.
///
/// Registration order is significant: it is the deterministic tie-break key
/// the merge engine uses when two producers share a priority, so the
/// registry stores producers in a `Vec` rather than a map.
#[derive(Default)]
pub struct ProducerRegistry {
    producers: Vec<Arc<dyn Producer>>,
}

impl ProducerRegistry {
    pub fn new() -> Self {
        Self {
            producers: Vec::new(),
        }
    }

    /// Register a producer. Fails if a producer with the same id is already
    /// registered.
    pub fn register(&mut self, producer: Arc<dyn Producer>) -> Result<(), ProducerError> {
        let id = producer.producer_id().to_string();
        if self.contains(&id) {
            return Err(ProducerError::Failed {
                producer_id: id,
                reason: "already registered".into(),
            });
        }
        self.producers.push(producer);
        Ok(())
    }

    /// Get a producer by id, or None.
    pub fn get(&self, producer_id: &str) -> Option<&Arc<dyn Producer>> {
        self.producers
            .iter()
            .find(|p| p.producer_id() == producer_id)
    }

    /// Select specific producers by id, in the order given.
    ///
    /// Fails on the first unknown id.
    pub fn select(&self, ids: &[&str]) -> Result<Vec<Arc<dyn Producer>>, ProducerError> {
        ids.iter()
            .map(|id| {
                self.get(id).cloned().ok_or_else(|| ProducerError::Failed {
                    producer_id: (*id).to_string(),
                    reason: format!("not found; available: {}", self.ids().join(", ")),
                })
            })
            .collect()
    }

    /// All registered producer ids, in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.producers
            .iter()
            .map(|p| p.producer_id().to_string())
            .collect()
    }

    /// Iterate producers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Producer>> {
        self.producers.iter()
    }

    pub fn contains(&self, producer_id: &str) -> bool {
        self.get(producer_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}
