// Cross-job statistics, computed in parallel

use crate::analytics::enrichment::EnrichmentEngine;
use crate::analytics::stats::{MatchesStats, StatsOptions};
use crate::data::PriceReferenceIndex;
use crate::simulation::{JobId, JobResult};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// One row of the aggregated results table
#[derive(Debug, Clone, Serialize)]
pub struct JobStatsRecord {
    pub job_id: JobId,
    pub pair: String,
    pub time_limit: Option<i64>,
    pub batch_duration: i64,
    pub min_delta: Option<f64>,
    #[serde(flatten)]
    pub stats: MatchesStats,
    pub outlier_count: usize,
    /// Trades outside the IQR fence, reported whether or not they were trimmed
    pub outlier_ids: Vec<String>,
}

impl JobStatsRecord {
    pub fn new(job: &JobResult, stats: MatchesStats) -> Self {
        Self {
            job_id: job.job_id,
            pair: job.pair.clone(),
            time_limit: job.options.time_limit,
            batch_duration: job.options.batch_duration,
            min_delta: job.options.min_delta,
            outlier_count: stats.outlier_count(),
            outlier_ids: stats.outlier_ids(),
            stats,
        }
    }
}

fn summarize(
    job: &JobResult,
    enricher: &EnrichmentEngine,
    reference: Option<&PriceReferenceIndex>,
    options: &StatsOptions,
) -> Option<JobStatsRecord> {
    match job.calc_stats(enricher, reference, options) {
        Ok(Some(stats)) => {
            debug!("Job {} done ({} trades)", job.job_id, stats.total_trades);
            Some(JobStatsRecord::new(job, stats))
        }
        Ok(None) => {
            info!("No results for job {} ({})", job.job_id, job.pair);
            None
        }
        Err(e) => {
            warn!(
                job_id = job.job_id,
                category = e.category(),
                "⚠️ Skipping job {} ({}): {}",
                job.job_id,
                job.pair,
                e
            );
            None
        }
    }
}

/// Summarize every job independently; failures are logged and left out
pub(crate) fn collect<F>(
    jobs: &[&JobResult],
    enricher: &EnrichmentEngine,
    reference: Option<&PriceReferenceIndex>,
    options: &StatsOptions,
    hook: F,
) -> Vec<JobStatsRecord>
where
    F: Fn(JobId, bool) + Sync,
{
    let mut rows: Vec<JobStatsRecord> = jobs
        .par_iter()
        .filter_map(|job| {
            let row = summarize(job, enricher, reference, options);
            hook(job.job_id, row.is_some());
            row
        })
        .collect();

    rows.sort_by_key(|r| r.job_id);
    info!("📊 Aggregated {}/{} job(s)", rows.len(), jobs.len());
    rows
}
