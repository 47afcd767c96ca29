//! Origin consolidation engine
//!
//! Turns a record's raw, free-text origin claim into a single canonical
//! origin group plus extracted modifier tags. The passes run in a fixed
//! order per record:
//!
//! 1. Modifier extraction — "Biblical"/"Modern" tokens split out of the
//!    origin into `tags` ([`tags`])
//! 2. Variant resolution — "variant of X" inherits X's origin from the
//!    cross-shard index ([`variants`])
//! 3. Bucket classification — ordered rule table, first match wins
//!    ([`rules`])
//! 4. Unknown-origin inference — only for records still classified
//!    "Unknown" ([`infer`])
//!
//! Every pass is idempotent; re-running consolidation over an already
//! consolidated store is a no-op.

pub mod infer;
pub mod rules;
pub mod tags;
pub mod variants;

use crate::models::NameRecord;
use std::collections::HashMap;

pub use rules::UNKNOWN_GROUP;

/// What changed while consolidating one record
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolidationOutcome {
    pub tags_split: bool,
    pub variant_resolved: bool,
    pub group_changed: bool,
    pub origin_inferred: bool,
}

impl ConsolidationOutcome {
    pub fn changed(&self) -> bool {
        self.tags_split || self.variant_resolved || self.group_changed || self.origin_inferred
    }
}

/// Consolidation engine holding the cross-shard name→origin index used by
/// variant resolution.
pub struct ConsolidationEngine {
    name_index: variants::NameIndex,
}

impl ConsolidationEngine {
    /// Build the engine from the full record set (all shards).
    pub fn new<'a>(records: impl Iterator<Item = &'a NameRecord>) -> Self {
        Self {
            name_index: variants::build_name_index(records),
        }
    }

    /// Engine with an empty index; variant resolution finds nothing.
    pub fn without_index() -> Self {
        Self {
            name_index: HashMap::new(),
        }
    }

    /// Run all consolidation passes over one record.
    pub fn consolidate_record(&self, record: &mut NameRecord) -> ConsolidationOutcome {
        let mut outcome = ConsolidationOutcome::default();

        outcome.tags_split = tags::apply_tag_splits(record);
        outcome.variant_resolved = variants::resolve_variant(record, &self.name_index);

        let previous_group = record.origin_group.clone();
        let mut group = rules::classify_record(record);

        if group == UNKNOWN_GROUP {
            if let Some(inferred) = infer::infer_origin(record) {
                tracing::debug!(
                    name = %record.name,
                    inferred = %inferred,
                    "Inferred origin for Unknown record"
                );
                record.origin = Some(inferred.into());
                record.origin_source = Some("inferred".to_string());
                group = rules::classify_record(record);
                outcome.origin_inferred = true;
            }
        }

        if previous_group.as_deref() != Some(group.as_str()) {
            record.origin_group = Some(group);
            outcome.group_changed = true;
        }

        outcome
    }
}
