//! Built-in snapshot producers for contextfuse.
//!
//! All producers implement the `contextfuse_core::Producer` trait and are
//! registered in a `ProducerRegistry` for the coordinator to fan out to.

pub mod source_analyzer;
pub mod static_producer;
pub mod web_search;

pub use source_analyzer::SourceAnalyzerProducer;
pub use static_producer::StaticProducer;
pub use web_search::WebSearchProducer;
