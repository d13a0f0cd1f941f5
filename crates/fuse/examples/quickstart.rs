//! Minimal end-to-end run: two static producers, an OpenAI-compatible
//! backend, one coordinated fusion + synthesis call.
//!
//! ```sh
//! OPENAI_API_KEY=sk-... cargo run -p contextfuse-fuse --example quickstart
//! ```

use std::sync::Arc;

use contextfuse_core::ProducerRegistry;
use contextfuse_fuse::{Coordinator, CoordinatorConfig};
use contextfuse_producers::StaticProducer;
use contextfuse_providers::OpenAiCompatBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("set OPENAI_API_KEY to run this example"))?;

    let mut registry = ProducerRegistry::new();
    registry.register(Arc::new(
        StaticProducer::new("pricing", "Competitor pricing data")
            .with_fact("acme_price", "$99/mo")
            .with_fact("globex_price", "$120/mo"),
    ))?;
    registry.register(Arc::new(
        StaticProducer::new("policy", "Internal discount policy")
            .with_fact("max_discount", "20% with VP approval"),
    ))?;

    let backend = Arc::new(OpenAiCompatBackend::openai(api_key)?);
    let coordinator = Coordinator::new(
        Arc::new(registry),
        backend,
        CoordinatorConfig::default(),
    );

    let result = coordinator
        .run("How does our pricing compare to competitors, and how far can sales discount?")
        .await?;

    println!("answer ({}):\n{}\n", result.model, result.answer);
    println!("fidelity tiers:");
    for (producer_id, tier) in &result.fused_context.tiers {
        println!("  {producer_id}: {tier}");
    }
    if !result.producer_failures.is_empty() {
        println!("failures:");
        for failure in &result.producer_failures {
            println!("  {}: {}", failure.producer_id, failure.reason);
        }
    }
    Ok(())
}
