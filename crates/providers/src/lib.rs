//! Synthesis backend implementations for contextfuse.
//!
//! All backends implement the `contextfuse_core::SynthesisBackend` trait;
//! the coordinator issues exactly one call per run without knowing which
//! backend is configured.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatBackend;
