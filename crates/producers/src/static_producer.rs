//! Static producer — fixed summary and facts declared in config.
//!
//! Useful for injecting known organizational context (pricing sheets,
//! policy notes) into every fusion run without writing code.

use async_trait::async_trait;
use contextfuse_config::StaticProducerConfig;
use contextfuse_core::error::ProducerError;
use contextfuse_core::{Fact, Producer, Snapshot};

/// A producer whose snapshot is fixed at construction time.
pub struct StaticProducer {
    id: String,
    description: String,
    summary: String,
    facts: Vec<(String, String)>,
}

impl StaticProducer {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            id: id.into(),
            summary: description.clone(),
            description,
            facts: Vec::new(),
        }
    }

    /// Override the summary (defaults to the description).
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts.push((key.into(), value.into()));
        self
    }

    /// Build a static producer from a config entry.
    pub fn from_config(entry: &StaticProducerConfig) -> Self {
        let mut producer = Self::new(&entry.id, &entry.description);
        if !entry.summary.is_empty() {
            producer = producer.with_summary(&entry.summary);
        }
        for fact in &entry.facts {
            producer = producer.with_fact(&fact.key, &fact.value);
        }
        producer
    }
}

#[async_trait]
impl Producer for StaticProducer {
    fn producer_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn produce(&self, _query: &str) -> Result<Snapshot, ProducerError> {
        let facts = self
            .facts
            .iter()
            .map(|(key, value)| Fact::new(key, value))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ProducerError::InvalidSnapshot {
                producer_id: self.id.clone(),
                reason: e.to_string(),
            })?;

        Snapshot::new(&self.id, &self.summary)
            .map(|s| s.with_facts(facts))
            .map_err(|e| ProducerError::InvalidSnapshot {
                producer_id: self.id.clone(),
                reason: e.to_string(),
            })
    }
}
