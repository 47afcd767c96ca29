//! Enrichment orchestrator integration tests
//!
//! Uses a scripted in-memory oracle so retry, checkpoint, error-log, and
//! quality-gate behavior can be exercised without a network.

use async_trait::async_trait;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use namebase_enrich::enrich::{
    EnrichOptions, EnrichmentOracle, EnrichmentOrchestrator, ErrorLog, OracleEnrichment,
    OracleError, OracleRequest, QualityTier, RunState, RunStatus,
};
use namebase_enrich::ChunkStore;

/// Scripted oracle: fails the first `fail_first` standard calls with a
/// network error, then answers every request with a fixed payload.
struct ScriptedOracle {
    fail_first: usize,
    standard_calls: AtomicUsize,
    /// Origin returned by standard-tier calls
    standard_origin: &'static str,
    standard_meaning: &'static str,
}

impl ScriptedOracle {
    fn reliable() -> Self {
        Self::failing(0)
    }

    fn failing(fail_first: usize) -> Self {
        Self {
            fail_first,
            standard_calls: AtomicUsize::new(0),
            standard_origin: "Latin",
            standard_meaning: "light of the moon",
        }
    }

    fn weak_then_strong() -> Self {
        Self {
            fail_first: 0,
            standard_calls: AtomicUsize::new(0),
            standard_origin: "Unknown",
            standard_meaning: "Unknown",
        }
    }

    fn answer(&self, batch: &[OracleRequest], origin: &str, meaning: &str) -> Vec<OracleEnrichment> {
        batch
            .iter()
            .map(|r| OracleEnrichment {
                name: r.name.clone(),
                meaning: Some(meaning.to_string()),
                meanings: vec![meaning.to_string()],
                origin: Some(origin.into()),
                confidence: Some(0.9),
                reasoning: None,
            })
            .collect()
    }
}

#[async_trait]
impl EnrichmentOracle for ScriptedOracle {
    async fn enrich_batch(
        &self,
        batch: &[OracleRequest],
        tier: QualityTier,
    ) -> Result<Vec<OracleEnrichment>, OracleError> {
        match tier {
            QualityTier::Standard => {
                let call = self.standard_calls.fetch_add(1, Ordering::SeqCst);
                if call < self.fail_first {
                    return Err(OracleError::Network("connection reset".into()));
                }
                Ok(self.answer(batch, self.standard_origin, self.standard_meaning))
            }
            QualityTier::Thorough => Ok(self.answer(batch, "Hebrew", "gift from god")),
        }
    }

    fn label(&self) -> &str {
        "scripted-oracle"
    }
}

/// Oracle that always fails
struct BrokenOracle;

#[async_trait]
impl EnrichmentOracle for BrokenOracle {
    async fn enrich_batch(
        &self,
        _batch: &[OracleRequest],
        _tier: QualityTier,
    ) -> Result<Vec<OracleEnrichment>, OracleError> {
        Err(OracleError::Network("no route to host".into()))
    }
}

fn write_store_with_names(dir: &Path, names: &[&str]) {
    let records: Vec<serde_json::Value> = names.iter().map(|n| json!({ "name": n })).collect();
    fs::write(
        dir.join("names-index.json"),
        serde_json::to_string_pretty(&json!({
            "totalNames": names.len(),
            "chunks": { "chunk1": { "file": "names-chunk1.json" } }
        }))
        .unwrap(),
    )
    .unwrap();
    fs::write(
        dir.join("names-chunk1.json"),
        serde_json::to_string_pretty(&json!(records)).unwrap(),
    )
    .unwrap();
}

fn fast_options() -> EnrichOptions {
    EnrichOptions {
        batch_size: 10,
        concurrency: 3,
        dispatch_delay: Duration::from_millis(1),
        max_attempts: 3,
        initial_backoff: Duration::from_millis(5),
        max_duration: None,
        quality_gate: false,
        report_interval: Duration::from_secs(300),
    }
}

fn names10() -> Vec<&'static str> {
    vec![
        "Luna", "Kai", "Mia", "Zoe", "Noa", "Ari", "Liam", "Ezra", "Ivy", "Theo",
    ]
}

#[tokio::test]
async fn batch_succeeds_after_two_failures() {
    let dir = TempDir::new().unwrap();
    write_store_with_names(dir.path(), &names10());

    let store = ChunkStore::open(dir.path()).unwrap();
    let oracle = ScriptedOracle::failing(2);
    let orchestrator = EnrichmentOrchestrator::new(oracle, fast_options());

    let checkpoint = dir.path().join("enrichment-progress.json");
    let error_log = ErrorLog::new(dir.path().join("enrichment-errors.json"));
    let mut state = RunState::load(&checkpoint).unwrap();

    let stats = orchestrator
        .enrich_store(&store, &mut state, &checkpoint, &error_log)
        .await
        .unwrap();

    // all 10 records processed, exactly one completed batch, no errors
    assert_eq!(stats.processed, 10);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.retries, 2);
    assert_eq!(state.total_processed, 10);
    assert_eq!(state.total_errors, 0);
    assert_eq!(state.last_batch_index, 1);
    assert_eq!(state.status, RunStatus::Completed);
    assert!(error_log.read_all().unwrap().is_empty());

    // flags persisted to the shard
    let store = ChunkStore::open(dir.path()).unwrap();
    let shard = store.load_shard("chunk1").unwrap().unwrap();
    assert!(shard.records().iter().all(|r| !r.needs_enrichment()));
    assert!(shard
        .records()
        .iter()
        .all(|r| r.enriched_with.as_deref() == Some("scripted-oracle")));
}

#[tokio::test]
async fn exhausted_retries_leave_records_unprocessed_and_logged() {
    let dir = TempDir::new().unwrap();
    write_store_with_names(dir.path(), &["Luna", "Kai"]);

    let store = ChunkStore::open(dir.path()).unwrap();
    let orchestrator = EnrichmentOrchestrator::new(BrokenOracle, fast_options());

    let checkpoint = dir.path().join("enrichment-progress.json");
    let error_log = ErrorLog::new(dir.path().join("enrichment-errors.json"));
    let mut state = RunState::load(&checkpoint).unwrap();

    let stats = orchestrator
        .enrich_store(&store, &mut state, &checkpoint, &error_log)
        .await
        .unwrap();

    // the run completes despite the failure; partial success is normal
    assert_eq!(stats.processed, 0);
    assert_eq!(stats.errors, 2);
    assert_eq!(state.status, RunStatus::Completed);

    let entries = error_log.read_all().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].batch, vec!["Luna", "Kai"]);

    // flags stayed false: the records are still pending
    let store = ChunkStore::open(dir.path()).unwrap();
    let shard = store.load_shard("chunk1").unwrap().unwrap();
    assert!(shard.records().iter().all(|r| r.needs_enrichment()));
}

#[tokio::test]
async fn resume_skips_already_processed_records() {
    let dir = TempDir::new().unwrap();
    write_store_with_names(dir.path(), &["Luna", "Kai"]);

    let checkpoint = dir.path().join("enrichment-progress.json");
    let error_log = ErrorLog::new(dir.path().join("enrichment-errors.json"));

    // first run enriches everything
    {
        let store = ChunkStore::open(dir.path()).unwrap();
        let orchestrator = EnrichmentOrchestrator::new(ScriptedOracle::reliable(), fast_options());
        let mut state = RunState::load(&checkpoint).unwrap();
        orchestrator
            .enrich_store(&store, &mut state, &checkpoint, &error_log)
            .await
            .unwrap();
    }

    // second run finds nothing to do and never calls the oracle
    let store = ChunkStore::open(dir.path()).unwrap();
    let oracle = ScriptedOracle::reliable();
    let orchestrator = EnrichmentOrchestrator::new(oracle, fast_options());
    let mut state = RunState::load(&checkpoint).unwrap();
    let stats = orchestrator
        .enrich_store(&store, &mut state, &checkpoint, &error_log)
        .await
        .unwrap();

    assert_eq!(stats.processed, 0);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn quality_gate_escalates_weak_results() {
    let dir = TempDir::new().unwrap();
    write_store_with_names(dir.path(), &["Eliora"]);

    let store = ChunkStore::open(dir.path()).unwrap();
    let oracle = ScriptedOracle::weak_then_strong();
    let mut options = fast_options();
    options.quality_gate = true;
    let orchestrator = EnrichmentOrchestrator::new(oracle, options);

    let checkpoint = dir.path().join("enrichment-progress.json");
    let error_log = ErrorLog::new(dir.path().join("enrichment-errors.json"));
    let mut state = RunState::load(&checkpoint).unwrap();

    let stats = orchestrator
        .enrich_store(&store, &mut state, &checkpoint, &error_log)
        .await
        .unwrap();

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.quality_escalations, 1);

    // the thorough answer won: real origin, classified group
    let store = ChunkStore::open(dir.path()).unwrap();
    let shard = store.load_shard("chunk1").unwrap().unwrap();
    let record = &shard.records()[0];
    assert_eq!(record.origin_text(), "Hebrew");
    assert_eq!(record.origin_group.as_deref(), Some("Hebrew & Biblical"));
    assert_eq!(record.meaning.as_deref(), Some("gift from god"));
}

#[tokio::test]
async fn checkpoint_written_and_resumable() {
    let dir = TempDir::new().unwrap();
    write_store_with_names(dir.path(), &names10());

    let checkpoint = dir.path().join("enrichment-progress.json");
    let error_log = ErrorLog::new(dir.path().join("enrichment-errors.json"));

    {
        let store = ChunkStore::open(dir.path()).unwrap();
        let orchestrator = EnrichmentOrchestrator::new(ScriptedOracle::reliable(), fast_options());
        let mut state = RunState::load(&checkpoint).unwrap();
        orchestrator
            .enrich_store(&store, &mut state, &checkpoint, &error_log)
            .await
            .unwrap();
    }

    // the sidecar is a complete JSON value with the expected keys
    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&checkpoint).unwrap()).unwrap();
    assert_eq!(raw["totalProcessed"], json!(10));
    assert_eq!(raw["totalErrors"], json!(0));
    assert!(raw["lastUpdate"].is_string());
    assert_eq!(raw["status"], json!("completed"));

    let reloaded = RunState::load(&checkpoint).unwrap();
    assert_eq!(reloaded.total_processed, 10);
}

#[tokio::test]
async fn enrichment_backs_up_shard_once_per_run() {
    let dir = TempDir::new().unwrap();
    write_store_with_names(dir.path(), &names10());

    let store = ChunkStore::open(dir.path()).unwrap();
    let mut options = fast_options();
    options.batch_size = 2; // several batch groups over one shard
    options.concurrency = 1;
    let orchestrator = EnrichmentOrchestrator::new(ScriptedOracle::reliable(), options);

    let checkpoint = dir.path().join("enrichment-progress.json");
    let error_log = ErrorLog::new(dir.path().join("enrichment-errors.json"));
    let mut state = RunState::load(&checkpoint).unwrap();
    orchestrator
        .enrich_store(&store, &mut state, &checkpoint, &error_log)
        .await
        .unwrap();

    let backups: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.starts_with("names-chunk1_backup_enrichment_"))
        .collect();
    assert_eq!(backups.len(), 1);
}
