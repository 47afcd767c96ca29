//! namebase-enrich library interface
//!
//! Consolidation and enrichment pipeline for the sharded name store:
//! load shards, normalize record shapes, deduplicate and merge, classify
//! origins into UI filter groups, and drive batched oracle enrichment with
//! resumable checkpoints.

pub mod config;
pub mod consolidate;
pub mod enrich;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod store;

pub use crate::models::{NameRecord, OriginValue};
pub use crate::store::{ChunkStore, Shard, ShardShape};
