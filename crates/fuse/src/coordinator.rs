//! Execution coordinator — parallel fan-out, merge barrier, single call.
//!
//! # Architecture
//!
//! ```text
//! Query
//!   │
//!   ▼
//! ┌─────────────┐   spawn    ┌──────┐ ┌──────┐ ┌──────┐
//! │ Coordinator  │──────────▶│ P-1  │ │ P-2  │ │ P-3  │  (parallel, isolated)
//! └──────┬───────┘           └──┬───┘ └──┬───┘ └──┬───┘
//!        │      join barrier    ▼        ▼        ▼
//!        │◀─────────────── snapshots / failure markers
//!        ▼
//!   MergeEngine (pure, deterministic)
//!        ▼
//!   SynthesisBackend (exactly one call)
//! ```
//!
//! Producers run with no shared mutable state and no visibility into each
//! other; a failing or hanging producer is recorded and excluded without
//! aborting its siblings. Snapshots are re-sorted into registration order
//! before the merge so block ordering never depends on completion timing.

use std::sync::Arc;
use std::time::Duration;

use contextfuse_config::AppConfig;
use contextfuse_core::error::{Error, ProducerError};
use contextfuse_core::{
    ProducerRegistry, Snapshot, SynthesisBackend, SynthesisRequest, Usage,
};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::engine::{FusedContext, MergeEngine, PriorityMap, DEFAULT_TOKEN_BUDGET};

/// System instructions for the downstream synthesis call.
const SYNTHESIS_SYSTEM_PROMPT: &str = "\
You are a synthesis engine. You receive a fused context window containing \
structured knowledge from multiple specialist producers.

Your job:
1. Analyze ALL context blocks, whatever their fidelity tag.
2. Synthesize a coherent, specific answer to the user's query.
3. Cite facts from the context. Do not invent information.
4. If blocks are marked COMPRESSED or FACTS_ONLY, note that some detail may be missing.

Be direct. No filler.";

/// Everything the coordinator needs, passed explicitly at construction.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Hard size budget for the fused context.
    pub token_budget: usize,
    /// Weight for producers without an explicit priority entry.
    pub default_priority: u32,
    /// Per-producer execution bound.
    pub producer_timeout: Duration,
    /// Model for the synthesis call.
    pub model: String,
    /// Temperature for the synthesis call.
    pub temperature: f32,
    /// Max tokens the synthesis call may generate.
    pub max_tokens: Option<u32>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            token_budget: DEFAULT_TOKEN_BUDGET,
            default_priority: 1,
            producer_timeout: Duration::from_secs(30),
            model: "gpt-4o".into(),
            temperature: 0.3,
            max_tokens: Some(4096),
        }
    }
}

impl From<&AppConfig> for CoordinatorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            token_budget: config.fusion.token_budget,
            default_priority: config.fusion.default_priority,
            producer_timeout: Duration::from_secs(config.fusion.producer_timeout_secs),
            model: config.synthesis.model.clone(),
            temperature: config.synthesis.temperature,
            max_tokens: Some(config.synthesis.max_tokens),
        }
    }
}

/// One producer's recorded failure, surfaced alongside the answer.
#[derive(Debug, Clone)]
pub struct ProducerFailure {
    pub producer_id: String,
    pub reason: String,
}

/// Snapshots and failures collected at the join barrier.
///
/// `snapshots` is in registration order, ready for [`MergeEngine::fuse`];
/// callers can hold onto it and re-merge under different priorities or
/// budgets without re-running producers.
#[derive(Debug)]
pub struct GatherOutcome {
    pub snapshots: Vec<Snapshot>,
    pub failures: Vec<ProducerFailure>,
}

/// The overall result of one coordinated run.
#[derive(Debug)]
pub struct RunResult {
    /// The synthesized answer.
    pub answer: String,
    /// The fused artifact the answer was derived from.
    pub fused_context: FusedContext,
    /// Producers that failed this run, in registration order.
    pub producer_failures: Vec<ProducerFailure>,
    /// Which model produced the answer.
    pub model: String,
    /// Token usage reported by the backend.
    pub usage: Option<Usage>,
}

/// Runs registered producers in parallel against a query, fuses their
/// snapshots once, and issues a single synthesis call.
///
/// Owns no state across calls: each `run` is independent and side-effect
/// free apart from invoking producers and the backend.
pub struct Coordinator {
    registry: Arc<ProducerRegistry>,
    backend: Arc<dyn SynthesisBackend>,
    config: CoordinatorConfig,
    engine: MergeEngine,
}

impl Coordinator {
    pub fn new(
        registry: Arc<ProducerRegistry>,
        backend: Arc<dyn SynthesisBackend>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            registry,
            backend,
            config,
            engine: MergeEngine::new(),
        }
    }

    /// Run the full pipeline with default priorities.
    pub async fn run(&self, query: &str) -> Result<RunResult, Error> {
        let priorities = PriorityMap::new(self.config.default_priority);
        self.run_with_priorities(query, &priorities).await
    }

    /// Run the full pipeline with an explicit priority map.
    pub async fn run_with_priorities(
        &self,
        query: &str,
        priorities: &PriorityMap,
    ) -> Result<RunResult, Error> {
        let GatherOutcome {
            snapshots,
            failures,
        } = self.gather(query).await;

        if snapshots.is_empty() {
            warn!(
                failed = failures.len(),
                "All producers failed, skipping merge and synthesis"
            );
            return Err(Error::NoUsableContext {
                failures: failures
                    .into_iter()
                    .map(|f| (f.producer_id, f.reason))
                    .collect(),
            });
        }

        let fused = self
            .engine
            .fuse(&snapshots, priorities, self.config.token_budget)?;

        info!(
            blocks = fused.blocks.len(),
            total_cost = fused.total_cost,
            budget = fused.budget,
            overshoot = fused.overshoot,
            "Merge complete, issuing synthesis call"
        );

        let prompt = self.engine.build_prompt(&fused, query);
        let request = SynthesisRequest {
            model: self.config.model.clone(),
            system_prompt: SYNTHESIS_SYSTEM_PROMPT.into(),
            prompt,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = match self.backend.synthesize(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Synthesis call failed");
                debug!(
                    tiers = ?fused.tiers,
                    total_cost = fused.total_cost,
                    "Fused context at time of synthesis failure"
                );
                return Err(Error::Synthesis(e));
            }
        };

        Ok(RunResult {
            answer: response.answer,
            fused_context: fused,
            producer_failures: failures,
            model: response.model,
            usage: response.usage,
        })
    }

    /// Fan out to every registered producer and wait for all of them to
    /// reach a terminal state. Never fails: producer problems become
    /// failure records, not errors.
    pub async fn gather(&self, query: &str) -> GatherOutcome {
        let total = self.registry.len();
        info!(producers = total, "Fan-out: launching producers");

        let timeout = self.config.producer_timeout;
        let mut join_set = JoinSet::new();
        for (index, producer) in self.registry.iter().cloned().enumerate() {
            let query = query.to_string();
            join_set.spawn(async move {
                let result = tokio::time::timeout(timeout, producer.produce(&query)).await;
                (index, producer, result)
            });
        }

        // Join barrier: results keyed by registration index so ordering is
        // independent of completion timing. A slot left empty means the
        // producer's task terminated abnormally.
        let mut slots: Vec<Option<Result<Snapshot, ProducerError>>> =
            (0..total).map(|_| None).collect();

        while let Some(joined) = join_set.join_next().await {
            let Ok((index, producer, result)) = joined else {
                // Task panicked; the owning slot stays empty and is
                // attributed below.
                continue;
            };
            let producer_id = producer.producer_id().to_string();
            let outcome = match result {
                Ok(Ok(snapshot)) => {
                    if snapshot.producer_id() == producer_id {
                        debug!(producer_id = %producer_id, "Producer completed");
                        Ok(snapshot)
                    } else {
                        Err(ProducerError::InvalidSnapshot {
                            producer_id: producer_id.clone(),
                            reason: format!(
                                "snapshot claims producer_id '{}'",
                                snapshot.producer_id()
                            ),
                        })
                    }
                }
                Ok(Err(e)) => Err(e),
                Err(_elapsed) => Err(ProducerError::Timeout {
                    producer_id: producer_id.clone(),
                    timeout_secs: timeout.as_secs(),
                }),
            };
            if let Err(e) = &outcome {
                warn!(producer_id = %producer_id, error = %e, "Producer failed, isolating");
            }
            slots[index] = Some(outcome);
        }

        let ids = self.registry.ids();
        let mut snapshots = Vec::new();
        let mut failures = Vec::new();
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(snapshot)) => snapshots.push(snapshot),
                Some(Err(e)) => failures.push(ProducerFailure {
                    producer_id: ids[index].clone(),
                    reason: e.to_string(),
                }),
                None => failures.push(ProducerFailure {
                    producer_id: ids[index].clone(),
                    reason: "producer task terminated abnormally".into(),
                }),
            }
        }

        info!(
            succeeded = snapshots.len(),
            failed = failures.len(),
            "Fan-out complete"
        );
        GatherOutcome {
            snapshots,
            failures,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
