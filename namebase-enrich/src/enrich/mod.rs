//! Enrichment orchestration
//!
//! Drives batched calls to the external enrichment oracle for records still
//! missing meaning/origin data, with bounded concurrency, cooperative rate
//! limiting, retry with backoff, and a resumable checkpoint sidecar.

pub mod checkpoint;
pub mod oracle;
pub mod orchestrator;

pub use checkpoint::{ErrorLog, RunState, RunStatus};
pub use oracle::{
    EnrichmentOracle, OpenAiOracle, OracleEnrichment, OracleError, OracleRequest, QualityTier,
};
pub use orchestrator::{EnrichOptions, EnrichmentOrchestrator};
