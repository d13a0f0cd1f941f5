//! # Contextfuse Core
//!
//! Domain types, traits, and error definitions for the contextfuse runtime.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Producers and synthesis backends are defined as traits here; concrete
//! implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod producer;
pub mod snapshot;
pub mod synthesis;
pub mod token;

// Re-export key types at crate root for ergonomics
pub use error::{Error, FuseError, ProducerError, Result, SynthesisError, ValidationError};
pub use producer::{Producer, ProducerRegistry};
pub use snapshot::{Fact, Snapshot};
pub use synthesis::{SynthesisBackend, SynthesisRequest, SynthesisResponse, Usage};
pub use token::estimate_tokens;
