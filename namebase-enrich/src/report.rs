//! Run statistics and human-readable summaries
//!
//! Every run ends with a summary the operator can read at a glance —
//! partial success included. The enrichment path also emits periodic
//! progress reports with rate, cost, and remaining-time estimates.

use crate::enrich::checkpoint::RunState;
use crate::merge::{MergeKind, MergeStats};
use namebase_common::human_time;
use std::time::Instant;

/// Groups with fewer records than this get flagged in the analyze report
pub const MIN_GROUP_POPULATION: usize = 250;

/// Per-session enrichment counters
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub processed: usize,
    pub errors: usize,
    pub retries: usize,
    pub quality_escalations: usize,
    pub estimated_cost: f64,
    pub started: Instant,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            processed: 0,
            errors: 0,
            retries: 0,
            quality_escalations: 0,
            estimated_cost: 0.0,
            started: Instant::now(),
        }
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processing rate in names per minute
    pub fn rate_per_minute(&self) -> f64 {
        let minutes = self.started.elapsed().as_secs_f64() / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        self.processed as f64 / minutes
    }

    /// Periodic progress report for long enrichment sessions
    pub fn progress_report(&self, state: &RunState, remaining: usize) -> String {
        let elapsed = self.started.elapsed().as_secs() as i64;
        let rate = self.rate_per_minute();
        let eta_secs = if rate > 0.0 {
            remaining as f64 / rate * 60.0
        } else {
            f64::INFINITY
        };

        format!(
            "Session: {} processed, {} errors, {} retries in {} ({:.1} names/min, ${:.3})\n\
             Overall: {} processed, {} errors, ${:.2} total\n\
             Remaining: {} names, about {}",
            self.processed,
            self.errors,
            self.retries,
            human_time::format_duration(elapsed),
            rate,
            self.estimated_cost,
            state.total_processed,
            state.total_errors,
            state.estimated_cost,
            remaining,
            human_time::format_eta(eta_secs),
        )
    }

    /// End-of-run one-liner
    pub fn display_string(&self) -> String {
        format!(
            "{} enriched, {} errors, {} retries, ${:.3} estimated cost, {} elapsed",
            self.processed,
            self.errors,
            self.retries,
            self.estimated_cost,
            human_time::format_duration(self.started.elapsed().as_secs() as i64),
        )
    }
}

/// Summary of a consolidation pass over the whole store
#[derive(Debug, Clone, Default)]
pub struct ConsolidateSummary {
    pub shards_processed: usize,
    pub shards_skipped: usize,
    pub records_seen: usize,
    pub duplicates_removed: usize,
    pub tags_split: usize,
    pub variants_resolved: usize,
    pub origins_inferred: usize,
    pub groups_changed: usize,
    pub merge: MergeStats,
}

impl ConsolidateSummary {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Consolidation complete: {} records across {} shards ({} skipped)\n",
            self.records_seen, self.shards_processed, self.shards_skipped
        ));
        out.push_str(&format!(
            "  duplicates removed:  {}\n  tags split:          {}\n  variants resolved:   {}\n  origins inferred:    {}\n  groups (re)assigned: {}\n",
            self.duplicates_removed,
            self.tags_split,
            self.variants_resolved,
            self.origins_inferred,
            self.groups_changed
        ));
        if !self.merge.examples.is_empty() {
            out.push_str("  examples:\n");
            for example in &self.merge.examples {
                let verb = match example.kind {
                    MergeKind::Added => "added",
                    MergeKind::Updated => "updated",
                    MergeKind::Unchanged => "unchanged",
                };
                out.push_str(&format!("    {} ({})\n", example.name, verb));
            }
        }
        out
    }
}

/// Origin-group coverage counts, sorted by population descending
#[derive(Debug, Clone, Default)]
pub struct AnalyzeReport {
    pub total_records: usize,
    pub groups: Vec<(String, usize)>,
}

impl AnalyzeReport {
    pub fn render(&self) -> String {
        let mut out = format!(
            "Origin groups over {} records ({} distinct groups):\n",
            self.total_records,
            self.groups.len()
        );
        for (idx, (group, count)) in self.groups.iter().enumerate() {
            let flag = if *count < MIN_GROUP_POPULATION {
                "  (below minimum)"
            } else {
                ""
            };
            out.push_str(&format!(
                "{:>3}. {:<30} {:>8}{}\n",
                idx + 1,
                group,
                count,
                flag
            ));
        }
        let thin = self
            .groups
            .iter()
            .filter(|(_, c)| *c < MIN_GROUP_POPULATION)
            .count();
        out.push_str(&format!("Groups under {}: {}\n", MIN_GROUP_POPULATION, thin));
        out
    }
}
