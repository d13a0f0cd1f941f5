//! The tier cost model.
//!
//! Every tier's cost must be deterministic and cheap to compute, because
//! tier boundaries fall directly out of these numbers and repeated merges
//! of the same inputs must be byte-identical. Costs for the sub-Full tiers
//! never look at `raw_context`; the Full tier trusts the snapshot's
//! declared `token_count` rather than re-measuring the raw text.
//!
//! Formulas (budget units = estimated tokens, ~4 chars each):
//!
//! - facts:      `BLOCK_OVERHEAD + Σ (tokens(key) + tokens(value) + FACT_OVERHEAD)`
//! - compressed: `facts + tokens(summary)`
//! - full:       `compressed + token_count`
//!
//! Monotone per snapshot: `full >= compressed >= facts`, which keeps the
//! three-sweep allocator total.

use contextfuse_core::token::estimate_tokens;
use contextfuse_core::Snapshot;

use crate::engine::Tier;

/// Fixed framing cost per rendered block (tags, headers, separators).
pub const BLOCK_OVERHEAD: usize = 8;

/// Fixed cost per rendered fact (bullet, key/value separator, newline).
pub const FACT_OVERHEAD: usize = 2;

/// Cost of rendering only the snapshot's key facts.
pub fn facts_cost(snapshot: &Snapshot) -> usize {
    let facts: usize = snapshot
        .key_facts()
        .iter()
        .map(|f| estimate_tokens(f.key()) + estimate_tokens(f.value()) + FACT_OVERHEAD)
        .sum();
    BLOCK_OVERHEAD + facts
}

/// Cost of rendering summary + key facts (no raw context).
pub fn compressed_cost(snapshot: &Snapshot) -> usize {
    facts_cost(snapshot) + estimate_tokens(snapshot.summary())
}

/// Cost of rendering the snapshot at full fidelity.
pub fn full_cost(snapshot: &Snapshot) -> usize {
    compressed_cost(snapshot) + snapshot.token_count()
}

/// Cost of a snapshot at a given tier. `Dropped` contributes nothing.
pub fn tier_cost(snapshot: &Snapshot, tier: Tier) -> usize {
    match tier {
        Tier::Full => full_cost(snapshot),
        Tier::Compressed => compressed_cost(snapshot),
        Tier::FactsOnly => facts_cost(snapshot),
        Tier::Dropped => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contextfuse_core::Fact;

    fn snapshot_with(facts: usize, raw_tokens: usize) -> Snapshot {
        let facts = (0..facts)
            .map(|i| Fact::new(format!("key_{i}"), "some value").unwrap())
            .collect();
        Snapshot::new("p", "a short summary of findings")
            .unwrap()
            .with_facts(facts)
            .with_raw_context("x", raw_tokens)
    }

    #[test]
    fn costs_are_monotone_per_snapshot() {
        let snap = snapshot_with(3, 500);
        assert!(full_cost(&snap) >= compressed_cost(&snap));
        assert!(compressed_cost(&snap) >= facts_cost(&snap));
    }

    #[test]
    fn full_cost_adds_declared_raw_tokens() {
        let snap = snapshot_with(2, 900);
        assert_eq!(full_cost(&snap), compressed_cost(&snap) + 900);
    }

    #[test]
    fn facts_cost_ignores_summary_and_raw() {
        let a = Snapshot::new("p", "short").unwrap().with_raw_context("x", 10_000);
        let b = Snapshot::new("p", "a much longer summary with many words").unwrap();
        assert_eq!(facts_cost(&a), facts_cost(&b));
    }

    #[test]
    fn empty_snapshot_still_costs_framing() {
        let snap = Snapshot::new("p", "").unwrap();
        assert_eq!(facts_cost(&snap), BLOCK_OVERHEAD);
        assert_eq!(compressed_cost(&snap), BLOCK_OVERHEAD);
    }

    #[test]
    fn dropped_tier_is_free() {
        let snap = snapshot_with(5, 1000);
        assert_eq!(tier_cost(&snap, Tier::Dropped), 0);
    }
}
