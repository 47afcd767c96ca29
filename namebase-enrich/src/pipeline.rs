//! End-to-end passes over the chunked store
//!
//! Each pass follows the same discipline: load shards in index order
//! (skipping missing files with a warning), operate in memory, and write
//! back only the shards that changed, backup first.

use crate::consolidate::{rules, ConsolidationEngine};
use crate::enrich::orchestrator::fold_enrichment;
use crate::enrich::oracle::{self, EnrichmentOracle, OracleRequest, QualityTier};
use crate::merge::{self, MergeKind, MergeStats};
use crate::models::NameRecord;
use crate::normalize::DecodedShard;
use crate::report::{AnalyzeReport, ConsolidateSummary};
use crate::store::{ChunkStore, Shard, ShardShape};
use namebase_common::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Full consolidation pass: dedup/merge across shards, then tag-splitting,
/// variant resolution, classification, and unknown-origin inference over
/// every surviving record.
pub fn consolidate_store(store: &ChunkStore) -> Result<ConsolidateSummary> {
    let mut summary = ConsolidateSummary::default();

    let mut shards: Vec<Shard> = Vec::new();
    for key in store.shard_keys() {
        match store.load_shard(&key)? {
            Some(shard) => shards.push(shard),
            None => summary.shards_skipped += 1,
        }
    }
    summary.shards_processed = shards.len();

    let mut changed = vec![false; shards.len()];

    // Cross-shard dedup. First-seen (earliest shard, earliest position)
    // survives; duplicates merge into it and are dropped from their shard.
    let mut seen: HashMap<String, (usize, usize)> = HashMap::new();
    let mut removals: Vec<HashSet<usize>> = vec![HashSet::new(); shards.len()];

    for s_idx in 0..shards.len() {
        for r_idx in 0..shards[s_idx].records().len() {
            summary.records_seen += 1;
            let key = shards[s_idx].records()[r_idx].key();
            match seen.get(&key) {
                None => {
                    seen.insert(key, (s_idx, r_idx));
                }
                Some(&(first_shard, first_idx)) => {
                    let incoming = shards[s_idx].records()[r_idx].clone();
                    let incumbent = &mut shards[first_shard].records_mut()[first_idx];
                    let kind = merge::merge_into(incumbent, &incoming);
                    summary.merge.record(&incoming.name, kind);
                    summary.duplicates_removed += 1;
                    removals[s_idx].insert(r_idx);
                    changed[s_idx] = true;
                    if kind == MergeKind::Updated {
                        changed[first_shard] = true;
                    }
                }
            }
        }
    }

    for (shard, remove) in shards.iter_mut().zip(&removals) {
        if remove.is_empty() {
            continue;
        }
        let mut idx = 0;
        shard.records_mut().retain(|_| {
            let keep = !remove.contains(&idx);
            idx += 1;
            keep
        });
    }

    // Consolidation proper, with the variant index built over the full
    // deduplicated record set.
    let engine = ConsolidationEngine::new(shards.iter().flat_map(|s| s.records().iter()));
    for (s_idx, shard) in shards.iter_mut().enumerate() {
        let mut shard_changes = 0usize;
        for record in shard.records_mut() {
            let outcome = engine.consolidate_record(record);
            if outcome.tags_split {
                summary.tags_split += 1;
            }
            if outcome.variant_resolved {
                summary.variants_resolved += 1;
            }
            if outcome.origin_inferred {
                summary.origins_inferred += 1;
            }
            if outcome.group_changed {
                summary.groups_changed += 1;
            }
            if outcome.changed() {
                shard_changes += 1;
            }
        }
        if shard_changes > 0 {
            changed[s_idx] = true;
        }
        tracing::info!(chunk = %shard.key, changes = shard_changes, "Consolidated shard");
    }

    for (shard, was_changed) in shards.iter().zip(&changed) {
        if *was_changed {
            store.save_shard(shard, "consolidation")?;
        } else {
            tracing::info!(chunk = %shard.key, "No changes, shard left untouched");
        }
    }

    Ok(summary)
}

/// Read-only coverage report: origin-group population counts, descending.
pub fn analyze_store(store: &ChunkStore) -> Result<AnalyzeReport> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut total = 0usize;

    for key in store.shard_keys() {
        let Some(shard) = store.load_shard(&key)? else {
            continue;
        };
        for record in shard.records() {
            total += 1;
            let group = record
                .origin_group
                .clone()
                .unwrap_or_else(|| rules::classify_record(record));
            *counts.entry(group).or_insert(0) += 1;
        }
    }

    let mut groups: Vec<(String, usize)> = counts.into_iter().collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(AnalyzeReport {
        total_records: total,
        groups,
    })
}

/// Enrich a list of new names via the oracle and append them to the target
/// chunk, skipping names the chunk already holds (case-insensitive).
pub async fn add_names<O: EnrichmentOracle>(
    store: &ChunkStore,
    oracle_client: &O,
    names: &[String],
    chunk_key: &str,
) -> Result<MergeStats> {
    let mut shard = match store.load_shard(chunk_key)? {
        Some(shard) => shard,
        // Referenced by the index but not on disk yet: start a fresh shard
        None => Shard {
            key: chunk_key.to_string(),
            path: store.shard_path(chunk_key)?,
            decoded: DecodedShard {
                shape: ShardShape::BareArray,
                records: Vec::new(),
                wrapper_extra: serde_json::Map::new(),
            },
        },
    };

    let existing: HashSet<String> = shard.records().iter().map(|r| r.key()).collect();
    let mut stats = MergeStats::default();

    let fresh: Vec<String> = names
        .iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .filter(|n| {
            if existing.contains(&n.to_lowercase()) {
                tracing::info!(name = %n, "Skipping duplicate");
                stats.record(n, MergeKind::Unchanged);
                false
            } else {
                true
            }
        })
        .collect();

    if fresh.is_empty() {
        tracing::warn!("No new names to add (all duplicates or empty)");
        return Ok(stats);
    }

    let requests: Vec<OracleRequest> = fresh.iter().map(OracleRequest::new).collect();
    let enrichments = oracle_client
        .enrich_batch(&requests, QualityTier::Standard)
        .await
        .map_err(|e| Error::Internal(format!("oracle call failed: {}", e)))?;
    let aligned = oracle::align_responses(&requests, enrichments);

    let engine = ConsolidationEngine::new(shard.records().iter());
    for (request, slot) in requests.iter().zip(aligned) {
        let Some(enrichment) = slot else {
            tracing::warn!(name = %request.name, "Oracle returned nothing, name not added");
            continue;
        };
        let mut record = NameRecord::new(request.name.clone());
        record.original_name = Some(request.name.clone());
        fold_enrichment(&mut record, &enrichment, oracle_client.label());
        engine.consolidate_record(&mut record);
        shard.records_mut().push(record);
        stats.record(&request.name, MergeKind::Added);
    }

    if stats.added > 0 {
        store.save_shard(&shard, "add")?;
        tracing::info!(
            added = stats.added,
            total = shard.records().len(),
            chunk = chunk_key,
            "Names added"
        );
    }

    Ok(stats)
}
