//! The contextfuse runtime core — fan-out, fuse, synthesize.
//!
//! The pipeline replaces sequential agent-to-agent chat with three phases:
//!
//! 1. **Fan-out**: every registered producer runs concurrently against the
//!    same query and exports one structured snapshot (or fails, isolated).
//! 2. **Fuse**: the merge engine deterministically assigns each snapshot a
//!    fidelity tier under a hard token budget and renders one artifact.
//! 3. **Synthesize**: exactly one downstream call turns the fused artifact
//!    into the final answer.

pub mod coordinator;
pub mod cost;
pub mod engine;

pub use coordinator::{
    Coordinator, CoordinatorConfig, GatherOutcome, ProducerFailure, RunResult,
};
pub use engine::{
    FusedContext, FusionBlock, MergeEngine, PriorityMap, Tier, DEFAULT_PRIORITY,
    DEFAULT_TOKEN_BUDGET,
};

#[cfg(test)]
pub(crate) mod test_helpers;
