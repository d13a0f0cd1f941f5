//! SynthesisBackend trait — the abstraction over the downstream LLM call.
//!
//! A backend receives the fused context (already rendered into a prompt)
//! plus the original query and returns the final answer. The coordinator
//! issues exactly one synthesis call per run, after the merge completes.
//!
//! Implementations: OpenAI-compatible endpoints, scripted mocks for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;

/// A single non-streaming synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// The model to use (e.g. "gpt-4o", "anthropic/claude-sonnet-4").
    pub model: String,

    /// System instructions for the synthesis engine.
    pub system_prompt: String,

    /// The rendered fused context plus the user query.
    pub prompt: String,

    /// Temperature (synthesis runs cool by default).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.3
}

/// The backend's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisResponse {
    /// The generated answer text.
    pub answer: String,

    /// Which model actually responded (may differ from requested).
    pub model: String,

    /// Token usage statistics, when the backend reports them.
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core synthesis trait.
///
/// The coordinator calls `synthesize` without knowing which backend is
/// configured — pure polymorphism, mirroring the producer side.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// A human-readable name for this backend (e.g. "openai", "openrouter").
    fn name(&self) -> &str;

    /// Issue the single downstream call and return the final answer.
    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> std::result::Result<SynthesisResponse, SynthesisError>;

    /// Health check — can we reach the backend?
    async fn health_check(&self) -> std::result::Result<bool, SynthesisError> {
        Ok(true)
    }
}
