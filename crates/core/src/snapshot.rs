//! Snapshot and Fact — the structured unit a producer exports.
//!
//! Instead of conversational hand-off between agents, each producer returns
//! a `Snapshot`: a short summary, atomic key facts, and optional full-text
//! raw context with a declared size. The merge engine consumes snapshots
//! as read-only values; tier decisions are recorded separately.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An atomic key/value claim extracted by a producer.
///
/// Immutable once created and owned by exactly one [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    key: String,
    value: String,
    /// Producer's confidence in this claim, in `[0.0, 1.0]`.
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl Fact {
    /// Create a fact with full confidence.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ValidationError::EmptyFactKey);
        }
        Ok(Self {
            key,
            value: value.into(),
            confidence: 1.0,
        })
    }

    /// Create a fact with an explicit confidence in `[0.0, 1.0]`.
    pub fn with_confidence(
        key: impl Into<String>,
        value: impl Into<String>,
        confidence: f32,
    ) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(confidence));
        }
        let mut fact = Self::new(key, value)?;
        fact.confidence = confidence;
        Ok(fact)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// The structured output of one producer for one query.
///
/// Created once by a producer and immutable thereafter: the merge engine
/// never mutates a snapshot in place. `token_count` is the declared cost of
/// including `raw_context` at full fidelity, in the same unit as the merge
/// budget; it is trusted, not re-derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    producer_id: String,
    summary: String,
    key_facts: Vec<Fact>,
    raw_context: String,
    token_count: usize,
}

impl Snapshot {
    /// Create a snapshot with a summary and no facts or raw context.
    ///
    /// Fails if `producer_id` is empty. (`token_count` is non-negative by
    /// construction — it is a `usize`.)
    pub fn new(
        producer_id: impl Into<String>,
        summary: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let producer_id = producer_id.into();
        if producer_id.is_empty() {
            return Err(ValidationError::EmptyProducerId);
        }
        Ok(Self {
            producer_id,
            summary: summary.into(),
            key_facts: Vec::new(),
            raw_context: String::new(),
            token_count: 0,
        })
    }

    /// Attach key facts, preserving the producer's emission order.
    pub fn with_facts(mut self, facts: Vec<Fact>) -> Self {
        self.key_facts = facts;
        self
    }

    /// Attach full-fidelity raw context with its declared token cost.
    pub fn with_raw_context(mut self, raw_context: impl Into<String>, token_count: usize) -> Self {
        self.raw_context = raw_context.into();
        self.token_count = token_count;
        self
    }

    pub fn producer_id(&self) -> &str {
        &self.producer_id
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn key_facts(&self) -> &[Fact] {
        &self.key_facts
    }

    pub fn raw_context(&self) -> &str {
        &self.raw_context
    }

    /// Declared cost of `raw_context` at full fidelity, in budget units.
    pub fn token_count(&self) -> usize {
        self.token_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_requires_nonempty_key() {
        let err = Fact::new("", "value").unwrap_err();
        assert_eq!(err, ValidationError::EmptyFactKey);
    }

    #[test]
    fn fact_confidence_range_enforced() {
        assert!(Fact::with_confidence("k", "v", 0.5).is_ok());
        assert!(Fact::with_confidence("k", "v", 1.0).is_ok());
        let err = Fact::with_confidence("k", "v", 1.5).unwrap_err();
        assert!(matches!(err, ValidationError::ConfidenceOutOfRange(_)));
    }

    #[test]
    fn snapshot_requires_nonempty_producer_id() {
        let err = Snapshot::new("", "summary").unwrap_err();
        assert_eq!(err, ValidationError::EmptyProducerId);
    }

    #[test]
    fn snapshot_builder_preserves_fact_order() {
        let snap = Snapshot::new("p1", "did things")
            .unwrap()
            .with_facts(vec![
                Fact::new("first", "1").unwrap(),
                Fact::new("second", "2").unwrap(),
            ])
            .with_raw_context("full detail", 120);

        assert_eq!(snap.producer_id(), "p1");
        assert_eq!(snap.key_facts()[0].key(), "first");
        assert_eq!(snap.key_facts()[1].key(), "second");
        assert_eq!(snap.token_count(), 120);
    }

    #[test]
    fn snapshot_serializes_round_trip() {
        let snap = Snapshot::new("p1", "summary")
            .unwrap()
            .with_facts(vec![Fact::new("k", "v").unwrap()])
            .with_raw_context("ctx", 3);
        let json = serde_json::to_string(&snap).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.producer_id(), "p1");
        assert_eq!(back.key_facts().len(), 1);
        assert_eq!(back.token_count(), 3);
    }
}
