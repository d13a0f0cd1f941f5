//! Merge engine — deterministic tiered budget allocation.
//!
//! Takes N snapshots, a priority map, and a hard size budget, and decides
//! one fidelity tier per snapshot:
//!
//! 1. Order by priority descending, registration order ascending on ties.
//! 2. **Full sweep**: assign `Full` down the order until the next snapshot
//!    would overshoot the budget.
//! 3. **Compressed sweep**: continue from there with summary+facts costs.
//! 4. **FactsOnly sweep**: continue with facts-only costs.
//! 5. Anything left is `Dropped` (cost 0, excluded from rendering).
//!
//! Each sweep stops at the first candidate that would overshoot; that
//! candidate falls through to the next, cheaper tier. Allocation is a pure
//! function of its inputs: identical inputs produce byte-identical output,
//! and a higher-priority snapshot never ends up at a worse tier than a
//! lower-priority one.
//!
//! The single exception to budget conservation is the best-effort floor:
//! the top-ranked snapshot is always included at least at `FactsOnly`, even
//! when that alone overshoots the budget. The result's `overshoot` flag
//! makes that case explicit.

use std::collections::{BTreeMap, HashMap, HashSet};

use contextfuse_core::error::FuseError;
use contextfuse_core::Snapshot;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cost;

/// Default weight for producers absent from a [`PriorityMap`].
pub const DEFAULT_PRIORITY: u32 = 1;

/// Default fused-context budget, in token-equivalent units.
pub const DEFAULT_TOKEN_BUDGET: usize = 120_000;

/// The fidelity level assigned to a snapshot's contribution.
///
/// Ordered worst-to-best so that `Full > Compressed > FactsOnly > Dropped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Dropped,
    FactsOnly,
    Compressed,
    Full,
}

impl Tier {
    /// The fidelity label rendered into the synthesis prompt.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Full => "FULL",
            Tier::Compressed => "COMPRESSED",
            Tier::FactsOnly => "FACTS_ONLY",
            Tier::Dropped => "DROPPED",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-producer integer weights. Higher = kept at higher fidelity longer.
///
/// Kept separate from [`Snapshot`] so the same snapshot set can be re-merged
/// under different priorities without re-running producers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityMap {
    weights: HashMap<String, u32>,
    default_weight: u32,
}

impl Default for PriorityMap {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY)
    }
}

impl PriorityMap {
    /// Create an empty map where every producer gets `default_weight`.
    pub fn new(default_weight: u32) -> Self {
        Self {
            weights: HashMap::new(),
            default_weight,
        }
    }

    /// Builder-style weight assignment.
    pub fn with_weight(mut self, producer_id: impl Into<String>, weight: u32) -> Self {
        self.set(producer_id, weight);
        self
    }

    pub fn set(&mut self, producer_id: impl Into<String>, weight: u32) {
        self.weights.insert(producer_id.into(), weight);
    }

    /// The weight for a producer, falling back to the default.
    pub fn weight_of(&self, producer_id: &str) -> u32 {
        self.weights
            .get(producer_id)
            .copied()
            .unwrap_or(self.default_weight)
    }

    pub fn default_weight(&self) -> u32 {
        self.default_weight
    }
}

/// The rendered contribution of one producer inside the fused artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionBlock {
    /// Which producer this block came from.
    pub producer_id: String,
    /// Fidelity tier the allocator assigned.
    pub tier: Tier,
    /// The rendered text for this tier.
    pub rendered_text: String,
    /// Budget units this block consumed.
    pub rendered_cost: usize,
}

/// The final fused artifact, consumed exactly once by the synthesis call.
///
/// `blocks` holds non-dropped snapshots in allocation order; `tiers` records
/// the decision for every input snapshot, dropped ones included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedContext {
    /// Rendered blocks, highest-priority first.
    pub blocks: Vec<FusionBlock>,
    /// Tier decision per producer, covering the whole input set.
    pub tiers: BTreeMap<String, Tier>,
    /// Total budget units consumed across all blocks.
    pub total_cost: usize,
    /// The budget this context was built under.
    pub budget: usize,
    /// Set when the best-effort floor forced `total_cost` past `budget`.
    pub overshoot: bool,
}

impl FusedContext {
    /// Whether any snapshot lost fidelity (anything below `Full`).
    pub fn compression_applied(&self) -> bool {
        self.tiers.values().any(|t| *t != Tier::Full)
    }
}

/// The deterministic allocator. Stateless — create one and reuse it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeEngine;

impl MergeEngine {
    pub fn new() -> Self {
        Self
    }

    /// Fuse snapshots into a single bounded context.
    ///
    /// Slice order of `snapshots` is registration order and is the
    /// tie-break key for equal priorities. Pure computation: no I/O, no
    /// suspension, no mutation of the inputs.
    pub fn fuse(
        &self,
        snapshots: &[Snapshot],
        priorities: &PriorityMap,
        budget: usize,
    ) -> Result<FusedContext, FuseError> {
        if snapshots.is_empty() {
            return Err(FuseError::EmptySnapshotSet);
        }
        let mut seen = HashSet::new();
        for snapshot in snapshots {
            if !seen.insert(snapshot.producer_id()) {
                return Err(FuseError::DuplicateProducer(
                    snapshot.producer_id().to_string(),
                ));
            }
        }

        // Allocation order: priority descending; stable sort keeps
        // registration order for ties.
        let mut order: Vec<usize> = (0..snapshots.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(priorities.weight_of(snapshots[i].producer_id())));

        let mut tiers = vec![Tier::Dropped; snapshots.len()];
        let mut used = 0usize;
        let mut pos = 0usize;

        for (sweep_tier, cost_of) in [
            (Tier::Full, cost::full_cost as fn(&Snapshot) -> usize),
            (Tier::Compressed, cost::compressed_cost),
            (Tier::FactsOnly, cost::facts_cost),
        ] {
            while pos < order.len() {
                let snapshot = &snapshots[order[pos]];
                let tier_cost = cost_of(snapshot);
                if used + tier_cost > budget {
                    break;
                }
                tiers[order[pos]] = sweep_tier;
                used += tier_cost;
                debug!(
                    producer_id = snapshot.producer_id(),
                    tier = %sweep_tier,
                    cost = tier_cost,
                    running_total = used,
                    "Tier assigned"
                );
                pos += 1;
            }
        }

        // Best-effort floor: the top-ranked snapshot is always included at
        // its cheapest renderable tier, even past the budget.
        let mut overshoot = false;
        let first = order[0];
        if tiers[first] == Tier::Dropped {
            tiers[first] = Tier::FactsOnly;
            used += cost::facts_cost(&snapshots[first]);
            overshoot = true;
            debug!(
                producer_id = snapshots[first].producer_id(),
                total_cost = used,
                budget,
                "Best-effort floor applied, budget overshot"
            );
        }

        let blocks = order
            .iter()
            .filter(|&&i| tiers[i] != Tier::Dropped)
            .map(|&i| {
                let snapshot = &snapshots[i];
                FusionBlock {
                    producer_id: snapshot.producer_id().to_string(),
                    tier: tiers[i],
                    rendered_text: render_block(snapshot, tiers[i]),
                    rendered_cost: cost::tier_cost(snapshot, tiers[i]),
                }
            })
            .collect();

        let tier_map = snapshots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.producer_id().to_string(), tiers[i]))
            .collect();

        Ok(FusedContext {
            blocks,
            tiers: tier_map,
            total_cost: used,
            budget,
            overshoot,
        })
    }

    /// Build the synthesis prompt from a fused context and the user query.
    ///
    /// Blocks are tagged with their fidelity so the synthesis call can
    /// distinguish full-detail content from compressed content.
    pub fn build_prompt(&self, fused: &FusedContext, query: &str) -> String {
        let mut parts = vec!["<FUSED_CONTEXT>".to_string()];
        for block in &fused.blocks {
            parts.push(format!(
                "<CONTEXT_BLOCK source=\"{}\" fidelity=\"{}\">",
                block.producer_id,
                block.tier.label()
            ));
            parts.push(block.rendered_text.clone());
            parts.push("</CONTEXT_BLOCK>".into());
        }
        parts.push("</FUSED_CONTEXT>".into());
        parts.push(String::new());
        parts.push(format!("<USER_QUERY>{query}</USER_QUERY>"));
        parts.join("\n")
    }
}

// ── Tier renderers ────────────────────────────────────────────────────────

fn render_block(snapshot: &Snapshot, tier: Tier) -> String {
    match tier {
        Tier::Full => {
            let mut out = render_compressed(snapshot);
            if !snapshot.raw_context().is_empty() {
                out.push_str("\nFull Context:\n");
                out.push_str(snapshot.raw_context());
            }
            out
        }
        Tier::Compressed => render_compressed(snapshot),
        Tier::FactsOnly => render_facts_only(snapshot),
        Tier::Dropped => String::new(),
    }
}

fn render_compressed(snapshot: &Snapshot) -> String {
    let mut lines = vec![format!("Summary: {}", snapshot.summary())];
    push_fact_lines(&mut lines, snapshot, true);
    lines.join("\n")
}

fn render_facts_only(snapshot: &Snapshot) -> String {
    if snapshot.key_facts().is_empty() {
        return format!("[{}: no facts available]", snapshot.producer_id());
    }
    let mut lines = Vec::new();
    push_fact_lines(&mut lines, snapshot, false);
    lines.join("\n")
}

fn push_fact_lines(lines: &mut Vec<String>, snapshot: &Snapshot, with_confidence: bool) {
    if snapshot.key_facts().is_empty() {
        return;
    }
    lines.push("Key Facts:".into());
    for fact in snapshot.key_facts() {
        let conf = if with_confidence && fact.confidence() < 1.0 {
            format!(" (confidence: {})", fact.confidence())
        } else {
            String::new()
        };
        lines.push(format!("  - {}: {}{}", fact.key(), fact.value(), conf));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
