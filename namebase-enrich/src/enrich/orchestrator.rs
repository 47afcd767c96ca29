//! Batched enrichment orchestration
//!
//! Single-threaded control flow coordinating a small number of concurrent
//! oracle calls. Records missing processed flags are batched, dispatched
//! with a bounded number of in-flight calls and a minimum delay between
//! dispatch groups, retried with exponential backoff on failure, and folded
//! back into the store through the same merge/consolidate path as any other
//! data source. The checkpoint is written after every batch group; an
//! interrupted run loses at most the in-flight group, which is redone
//! idempotently on resume.

use crate::consolidate::ConsolidationEngine;
use crate::enrich::checkpoint::{ErrorLog, ErrorLogEntry, RunState, RunStatus};
use crate::enrich::oracle::{
    self, EnrichmentOracle, OracleEnrichment, OracleError, OracleRequest, QualityTier,
};
use crate::models::NameRecord;
use crate::report::SessionStats;
use crate::store::ChunkStore;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use namebase_common::Result;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Display length cap for the short `meaning` field
const MEANING_SHORT_LIMIT: usize = 50;

/// Orchestrator tuning; defaults match the store's historical operating
/// point against the oracle's rate limits.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Names per oracle call
    pub batch_size: usize,
    /// Concurrent in-flight oracle calls
    pub concurrency: usize,
    /// Minimum delay between dispatch groups
    pub dispatch_delay: Duration,
    /// Attempts per batch before its records are left unprocessed
    pub max_attempts: u32,
    /// First retry backoff; doubles per attempt
    pub initial_backoff: Duration,
    /// Optional wall-clock budget; exceeded → checkpoint and pause
    pub max_duration: Option<Duration>,
    /// Re-ask a higher-quality model for low-information results
    pub quality_gate: bool,
    /// Interval between progress reports
    pub report_interval: Duration,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            concurrency: 3,
            dispatch_delay: Duration::from_millis(300),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_duration: None,
            quality_gate: true,
            report_interval: Duration::from_secs(300),
        }
    }
}

/// Outcome of one batch after retries and the optional quality pass
struct BatchResult {
    aligned: Vec<Option<OracleEnrichment>>,
    retries: u32,
    escalated: usize,
}

/// Enrichment orchestrator over a chunked store
pub struct EnrichmentOrchestrator<O: EnrichmentOracle> {
    oracle: O,
    options: EnrichOptions,
}

impl<O: EnrichmentOracle> EnrichmentOrchestrator<O> {
    pub fn new(oracle: O, options: EnrichOptions) -> Self {
        Self { oracle, options }
    }

    /// Enrich every record in the store still missing processed flags.
    ///
    /// `state` is read for resume context, updated after every batch group,
    /// and persisted to `checkpoint_path`. Failed batches land in
    /// `error_log` and the run continues; partial success is a normal
    /// outcome.
    pub async fn enrich_store(
        &self,
        store: &ChunkStore,
        state: &mut RunState,
        checkpoint_path: &Path,
        error_log: &ErrorLog,
    ) -> Result<SessionStats> {
        let mut stats = SessionStats::new();
        let deadline = self.options.max_duration.map(|d| Instant::now() + d);

        if state.session_id.is_none() {
            state.session_id = Some(Uuid::new_v4());
        }
        state.status = RunStatus::Running;

        // Names from previously failed batches get queued first
        let retry_first: HashSet<String> = error_log
            .failed_names()?
            .into_iter()
            .map(|n| n.trim().to_lowercase())
            .collect();
        if !retry_first.is_empty() {
            tracing::info!(count = retry_first.len(), "Queueing error-log names first");
        }

        let mut shards = store.load_all_shards()?;
        let mut remaining: usize = shards
            .iter()
            .map(|s| s.records().iter().filter(|r| r.needs_enrichment()).count())
            .sum();

        tracing::info!(pending = remaining, shards = shards.len(), "Starting enrichment");

        let mut last_report = Instant::now();
        let mut paused = false;

        'shards: for shard in &mut shards {
            let mut pending: Vec<usize> = shard
                .records()
                .iter()
                .enumerate()
                .filter(|(_, r)| r.needs_enrichment())
                .map(|(i, _)| i)
                .collect();
            if pending.is_empty() {
                continue;
            }
            // stable: retry-first names float up, record order otherwise kept
            pending.sort_by_key(|&i| !retry_first.contains(&shard.records()[i].key()));

            state.current_chunk = Some(shard.key.clone());
            let engine = ConsolidationEngine::new(shard.records().iter());

            let batches: Vec<Vec<usize>> = pending
                .chunks(self.options.batch_size)
                .map(|c| c.to_vec())
                .collect();

            let mut shard_backed_up = false;

            for group in batches.chunks(self.options.concurrency) {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        tracing::warn!("Time budget reached, pausing after checkpoint");
                        paused = true;
                        break 'shards;
                    }
                }

                // Build requests up front; futures only borrow the oracle
                let request_sets: Vec<(Vec<usize>, Vec<OracleRequest>)> = group
                    .iter()
                    .map(|batch| {
                        let requests = batch
                            .iter()
                            .map(|&i| request_for(&shard.records()[i]))
                            .collect();
                        (batch.clone(), requests)
                    })
                    .collect();

                let mut in_flight = FuturesUnordered::new();
                for (slot, (indices, requests)) in request_sets.iter().enumerate() {
                    in_flight.push(async move {
                        let outcome = self.process_batch(requests).await;
                        (slot, indices, outcome)
                    });
                }

                let mut outcomes = Vec::new();
                while let Some(result) = in_flight.next().await {
                    outcomes.push(result);
                }
                drop(in_flight);

                for (_, indices, outcome) in outcomes {
                    match outcome {
                        Ok(batch_result) => {
                            stats.retries += batch_result.retries as usize;
                            stats.quality_escalations += batch_result.escalated;

                            let mut folded = 0usize;
                            for (&record_idx, enrichment) in
                                indices.iter().zip(batch_result.aligned.iter())
                            {
                                let Some(enrichment) = enrichment else {
                                    continue;
                                };
                                let record = &mut shard.records_mut()[record_idx];
                                fold_enrichment(record, enrichment, self.oracle.label());
                                engine.consolidate_record(record);
                                folded += 1;
                            }

                            let cost = folded as f64
                                * self.oracle.cost_per_name(QualityTier::Standard)
                                + batch_result.escalated as f64
                                    * self.oracle.cost_per_name(QualityTier::Thorough);
                            stats.processed += folded;
                            stats.estimated_cost += cost;
                            state.total_processed += folded as u64;
                            state.estimated_cost += cost;
                            remaining = remaining.saturating_sub(indices.len());
                        }
                        Err(error) => {
                            let names: Vec<String> = indices
                                .iter()
                                .map(|&i| shard.records()[i].name.clone())
                                .collect();
                            tracing::error!(
                                chunk = %shard.key,
                                batch = names.len(),
                                %error,
                                "Batch failed after retries; records left unprocessed"
                            );
                            stats.errors += names.len();
                            state.total_errors += names.len() as u64;
                            remaining = remaining.saturating_sub(names.len());
                            error_log.append(ErrorLogEntry {
                                timestamp: Utc::now(),
                                chunk: Some(shard.key.clone()),
                                batch: names,
                                error: error.to_string(),
                            })?;
                        }
                    }
                    state.last_batch_index += 1;
                }

                // Persist: one backup per shard per run, then in-place
                // continuation writes; checkpoint after every group.
                if shard_backed_up {
                    store.overwrite_shard(shard)?;
                } else {
                    store.save_shard(shard, "enrichment")?;
                    shard_backed_up = true;
                }
                state.save(checkpoint_path)?;

                if last_report.elapsed() >= self.options.report_interval {
                    tracing::info!("\n{}", stats.progress_report(state, remaining));
                    last_report = Instant::now();
                }

                tokio::time::sleep(self.options.dispatch_delay).await;
            }
        }

        state.status = if paused {
            RunStatus::Paused
        } else {
            RunStatus::Completed
        };
        state.current_chunk = None;
        state.save(checkpoint_path)?;

        tracing::info!(status = ?state.status, "{}", stats.display_string());
        Ok(stats)
    }

    /// One batch: retry with exponential backoff, then the optional
    /// higher-quality second pass for low-information results.
    async fn process_batch(
        &self,
        requests: &[OracleRequest],
    ) -> std::result::Result<BatchResult, OracleError> {
        let mut attempt = 0;
        let mut backoff = self.options.initial_backoff;
        let mut retries = 0;

        let enrichments = loop {
            attempt += 1;
            match self
                .oracle
                .enrich_batch(requests, QualityTier::Standard)
                .await
            {
                Ok(enrichments) => break enrichments,
                Err(error) if attempt < self.options.max_attempts && error.is_retryable() => {
                    tracing::warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        %error,
                        "Oracle call failed, will retry after backoff"
                    );
                    retries += 1;
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(error) => return Err(error),
            }
        };

        let mut aligned = oracle::align_responses(requests, enrichments);
        let mut escalated = 0;

        if self.options.quality_gate {
            let weak: Vec<usize> = aligned
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.as_ref().map(|e| e.is_low_quality()).unwrap_or(true))
                .map(|(i, _)| i)
                .collect();

            if !weak.is_empty() {
                let subset: Vec<OracleRequest> =
                    weak.iter().map(|&i| requests[i].clone()).collect();
                tracing::debug!(count = subset.len(), "Escalating low-quality results");

                // Best effort: a failed escalation keeps the originals
                match self.oracle.enrich_batch(&subset, QualityTier::Thorough).await {
                    Ok(better) => {
                        let better_aligned = oracle::align_responses(&subset, better);
                        for (&slot_idx, replacement) in weak.iter().zip(better_aligned) {
                            if replacement.is_some() {
                                aligned[slot_idx] = replacement;
                                escalated += 1;
                            }
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "Quality escalation failed, keeping first-pass results");
                    }
                }
            }
        }

        Ok(BatchResult {
            aligned,
            retries,
            escalated,
        })
    }
}

fn request_for(record: &NameRecord) -> OracleRequest {
    let gender_hint = record.gender.map(|g| {
        if g.male > 0.7 {
            "male".to_string()
        } else if g.female > 0.7 {
            "female".to_string()
        } else {
            "unisex".to_string()
        }
    });
    OracleRequest {
        name: record.name.clone(),
        gender_hint,
        origin_group: record.origin_group.clone(),
    }
}

/// Fold a returned enrichment into a record through the merge policy, then
/// flip the processed flags. Re-enriching an already-good record can only
/// fill gaps, never clobber real values.
pub(crate) fn fold_enrichment(
    record: &mut NameRecord,
    enrichment: &OracleEnrichment,
    oracle_label: &str,
) {
    let mut incoming = NameRecord::new(record.name.clone());

    let mut meanings = enrichment.meanings.clone();
    if meanings.is_empty() {
        if let Some(meaning) = &enrichment.meaning {
            meanings.push(meaning.clone());
        }
    }
    incoming.meaning_full = meanings.first().cloned();
    incoming.meaning = meanings.first().map(|m| truncate_chars(m, MEANING_SHORT_LIMIT));
    incoming.meanings = meanings;
    incoming.origin = enrichment.origin.clone();
    incoming.enriched_with = Some(oracle_label.to_string());
    incoming.last_enriched = Some(Utc::now());
    incoming.origin_source = enrichment.origin.as_ref().map(|_| "oracle".to_string());
    incoming.meaning_source = incoming.meaning.as_ref().map(|_| "oracle".to_string());

    crate::merge::merge_into(record, &incoming);

    record.meaning_processed = Some(true);
    record.origin_processed = Some(true);
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OriginValue;

    #[test]
    fn fold_fills_all_meaning_granularities() {
        let mut record = NameRecord::new("Luna");
        let enrichment = OracleEnrichment {
            name: "Luna".into(),
            meaning: Some("moon".into()),
            meanings: vec!["the moon".into(), "moonlight".into()],
            origin: Some(OriginValue::Many(vec!["Latin".into()])),
            confidence: Some(0.95),
            reasoning: None,
        };

        fold_enrichment(&mut record, &enrichment, "test-oracle");

        assert_eq!(record.meaning_full.as_deref(), Some("the moon"));
        assert_eq!(record.meaning.as_deref(), Some("the moon"));
        assert_eq!(record.meanings, vec!["the moon", "moonlight"]);
        assert_eq!(record.meaning_processed, Some(true));
        assert_eq!(record.origin_processed, Some(true));
        assert_eq!(record.enriched_with.as_deref(), Some("test-oracle"));
    }

    #[test]
    fn fold_never_downgrades_existing_data() {
        let mut record = NameRecord::new("Luna");
        record.meaning = Some("moon".into());
        record.origin = Some("Latin".into());

        let enrichment = OracleEnrichment {
            name: "Luna".into(),
            meaning: Some("Unknown".into()),
            meanings: vec![],
            origin: Some("Unknown".into()),
            confidence: None,
            reasoning: None,
        };

        fold_enrichment(&mut record, &enrichment, "test-oracle");

        assert_eq!(record.meaning.as_deref(), Some("moon"));
        assert_eq!(record.origin, Some(OriginValue::One("Latin".into())));
        // flags flip regardless: the pass did run
        assert_eq!(record.meaning_processed, Some(true));
    }

    #[test]
    fn short_meaning_is_truncated() {
        let long = "a".repeat(80);
        let mut record = NameRecord::new("Test");
        let enrichment = OracleEnrichment {
            name: "Test".into(),
            meaning: Some(long.clone()),
            meanings: vec![],
            origin: Some("Latin".into()),
            confidence: None,
            reasoning: None,
        };
        fold_enrichment(&mut record, &enrichment, "oracle");
        assert_eq!(record.meaning.as_ref().unwrap().len(), MEANING_SHORT_LIMIT);
        assert_eq!(record.meaning_full.as_deref(), Some(long.as_str()));
    }

    #[test]
    fn gender_hint_from_weights() {
        let mut record = NameRecord::new("Rowan");
        record.gender = Some(crate::models::GenderWeights {
            male: 0.55,
            female: 0.45,
        });
        assert_eq!(request_for(&record).gender_hint.as_deref(), Some("unisex"));

        record.gender = Some(crate::models::GenderWeights {
            male: 0.9,
            female: 0.1,
        });
        assert_eq!(request_for(&record).gender_hint.as_deref(), Some("male"));
    }
}
