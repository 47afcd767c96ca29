//! Deduplication and record merging
//!
//! The same name frequently appears in multiple shards and in multiple
//! enrichment passes. Merging is field-wise: a field is taken from the
//! incoming record only when the incumbent's value is missing or a
//! placeholder; a placeholder never overwrites real data; and when both
//! sides hold real but different values, the earlier-seen record wins.
//! Exceptions: `tags` always takes the set union, and `blogEnrichment`
//! accumulates as an array rather than being overwritten.

use crate::models::{self, NameRecord, OriginValue};
use serde_json::Value;

/// How many per-item examples the merge keeps for report previews
const EXAMPLE_LIMIT: usize = 15;

/// Classification of a single merge application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// New name, appended to the store
    Added,
    /// Existing record amended with data from the incoming one
    Updated,
    /// Incoming record carried nothing the incumbent lacked
    Unchanged,
}

/// One bounded-preview example for tooling output
#[derive(Debug, Clone)]
pub struct MergeExample {
    pub name: String,
    pub kind: MergeKind,
}

/// Merge bookkeeping: counts for the summary, a bounded example preview
#[derive(Debug, Clone, Default)]
pub struct MergeStats {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub examples: Vec<MergeExample>,
}

impl MergeStats {
    pub fn record(&mut self, name: &str, kind: MergeKind) {
        match kind {
            MergeKind::Added => self.added += 1,
            MergeKind::Updated => self.updated += 1,
            MergeKind::Unchanged => self.unchanged += 1,
        }
        if kind != MergeKind::Unchanged && self.examples.len() < EXAMPLE_LIMIT {
            self.examples.push(MergeExample {
                name: name.to_string(),
                kind,
            });
        }
    }

    pub fn duplicates_resolved(&self) -> usize {
        self.updated + self.unchanged
    }
}

/// Fill `slot` from `incoming` when the incumbent value is missing or a
/// placeholder and the incoming one is real. Returns true on change.
fn prefer_real(slot: &mut Option<String>, incoming: &Option<String>) -> bool {
    if models::has_real_value(slot) {
        return false;
    }
    if models::has_real_value(incoming) {
        *slot = incoming.clone();
        return true;
    }
    false
}

fn prefer_real_origin(slot: &mut Option<OriginValue>, incoming: &Option<OriginValue>) -> bool {
    let incumbent_real = slot.as_ref().map(|o| !o.is_placeholder()).unwrap_or(false);
    if incumbent_real {
        return false;
    }
    let incoming_real = incoming
        .as_ref()
        .map(|o| !o.is_placeholder())
        .unwrap_or(false);
    if incoming_real {
        *slot = incoming.clone();
        return true;
    }
    false
}

/// Union incoming tags into the incumbent's, preserving order of first
/// appearance. Returns true on change.
fn union_tags(slot: &mut Vec<String>, incoming: &[String]) -> bool {
    let mut changed = false;
    for tag in incoming {
        if !slot.iter().any(|t| t == tag) {
            slot.push(tag.clone());
            changed = true;
        }
    }
    changed
}

/// Append an incoming blog enrichment payload. An incumbent scalar is
/// promoted to a two-element array; an incumbent array grows by one.
fn append_blog_enrichment(slot: &mut Option<Value>, incoming: &Option<Value>) -> bool {
    let Some(incoming) = incoming else {
        return false;
    };
    match slot.take() {
        None => {
            *slot = Some(incoming.clone());
            true
        }
        Some(Value::Array(mut items)) => {
            items.push(incoming.clone());
            *slot = Some(Value::Array(items));
            true
        }
        Some(existing) => {
            *slot = Some(Value::Array(vec![existing, incoming.clone()]));
            true
        }
    }
}

/// `meanings[0]` mirrors `meaningFull` when both are present; the merge
/// step enforces what the oracle does not guarantee.
fn enforce_meaning_invariant(record: &mut NameRecord) -> bool {
    let Some(full) = record.meaning_full.clone() else {
        return false;
    };
    if record.meanings.first() == Some(&full) {
        return false;
    }
    record.meanings.retain(|m| m != &full);
    record.meanings.insert(0, full);
    true
}

/// Merge `incoming` into the surviving `incumbent` record.
///
/// Returns `Updated` when any field changed, `Unchanged` otherwise. Never
/// regresses data: a real incumbent value survives every merge.
pub fn merge_into(incumbent: &mut NameRecord, incoming: &NameRecord) -> MergeKind {
    let mut changed = false;

    changed |= prefer_real_origin(&mut incumbent.origin, &incoming.origin);
    if incumbent.origins.is_empty() && !incoming.origins.is_empty() {
        incumbent.origins = incoming.origins.clone();
        changed = true;
    }
    changed |= prefer_real(&mut incumbent.origin_group, &incoming.origin_group);
    changed |= prefer_real(&mut incumbent.meaning, &incoming.meaning);
    changed |= prefer_real(&mut incumbent.meaning_short, &incoming.meaning_short);
    changed |= prefer_real(&mut incumbent.meaning_full, &incoming.meaning_full);
    changed |= prefer_real(&mut incumbent.meaning_etymology, &incoming.meaning_etymology);
    changed |= prefer_real(&mut incumbent.primary_country, &incoming.primary_country);
    changed |= prefer_real(&mut incumbent.original_name, &incoming.original_name);

    if incumbent.meanings.is_empty() && !incoming.meanings.is_empty() {
        incumbent.meanings = incoming.meanings.clone();
        changed = true;
    }
    if incumbent.gender.is_none() && incoming.gender.is_some() {
        incumbent.gender = incoming.gender;
        changed = true;
    }
    if incumbent.countries.is_none() && incoming.countries.is_some() {
        incumbent.countries = incoming.countries.clone();
        changed = true;
    }

    changed |= union_tags(&mut incumbent.tags, &incoming.tags);
    changed |= append_blog_enrichment(&mut incumbent.blog_enrichment, &incoming.blog_enrichment);

    // Processed flags only ever move false→true through a merge
    for (slot, value) in [
        (&mut incumbent.meaning_processed, incoming.meaning_processed),
        (&mut incumbent.origin_processed, incoming.origin_processed),
    ] {
        if value == Some(true) && *slot != Some(true) {
            *slot = value;
            changed = true;
        }
    }

    // Provenance rides along when absent; it never drives a decision
    changed |= prefer_real(&mut incumbent.enriched_with, &incoming.enriched_with);
    changed |= prefer_real(&mut incumbent.origin_source, &incoming.origin_source);
    changed |= prefer_real(&mut incumbent.meaning_source, &incoming.meaning_source);
    if incumbent.last_enriched.is_none() && incoming.last_enriched.is_some() {
        incumbent.last_enriched = incoming.last_enriched;
        changed = true;
    }

    // Pass-through fields: fill gaps, keep incumbent values on conflict
    for (key, value) in &incoming.extra {
        if !incumbent.extra.contains_key(key) {
            incumbent.extra.insert(key.clone(), value.clone());
            changed = true;
        }
    }

    changed |= enforce_meaning_invariant(incumbent);

    if changed {
        MergeKind::Updated
    } else {
        MergeKind::Unchanged
    }
}
