// Per-job containers reassembled from engine output

use crate::analytics::aggregate::{self, JobStatsRecord};
use crate::analytics::enrichment::{EnrichedTrade, EnrichmentEngine, EnrichmentInput};
use crate::analytics::stats::{MatchesStats, StatsOptions};
use crate::data::{PriceReferenceIndex, Trade, TradeSide};
use crate::error::{AnalysisError, AnalysisResult};
use crate::simulation::{
    ExpiredOrder, JobId, JobOptions, MatchRecord, MatchingOptions, SimulationOutput,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Scheduler-side bookkeeping for one submitted job id
#[derive(Debug, Clone)]
pub(crate) struct PendingJob {
    pub base: String,
    pub quote: String,
    pub options: JobOptions,
    pub trades: Arc<Vec<Trade>>,
}

/// Engine output for one job together with the trades it ran over
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: JobId,
    /// Display label, `SYM_SYM` with a symbol lookup and `base/quote` without
    pub pair: String,
    pub options: MatchingOptions,
    trades: Arc<Vec<Trade>>,
    pub matches: Vec<MatchRecord>,
    pub expired_orders: Vec<ExpiredOrder>,
    /// Orientation of the attached reference series, when one was attached
    pub inversed_prices: Option<bool>,
}

impl JobResult {
    pub fn new(
        job_id: JobId,
        pair: impl Into<String>,
        options: MatchingOptions,
        trades: Vec<Trade>,
        output: SimulationOutput,
        inversed_prices: Option<bool>,
    ) -> Self {
        Self {
            job_id,
            pair: pair.into(),
            options,
            trades: Arc::new(trades),
            matches: output.matches,
            expired_orders: output.expired_orders,
            inversed_prices,
        }
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Per-trade execution quality, against `reference` when supplied
    pub fn enrich(
        &self,
        enricher: &EnrichmentEngine,
        reference: Option<&PriceReferenceIndex>,
    ) -> AnalysisResult<Vec<EnrichedTrade>> {
        let series =
            reference.map(|index| index.series_for(&self.options.base_asset, &self.options.quote_asset));

        enricher.enrich(&EnrichmentInput {
            trades: &self.trades,
            matches: &self.matches,
            expired_orders: &self.expired_orders,
            options: &self.options,
            reference: series.as_deref(),
            inversed_prices: self.inversed_prices,
        })
    }

    /// Summary statistics; `None` when the engine produced no fills
    pub fn calc_stats(
        &self,
        enricher: &EnrichmentEngine,
        reference: Option<&PriceReferenceIndex>,
        options: &StatsOptions,
    ) -> AnalysisResult<Option<MatchesStats>> {
        if self.matches.is_empty() {
            return Ok(None);
        }
        let enriched = self.enrich(enricher, reference)?;
        MatchesStats::compute(&enriched, options).map(Some)
    }

    /// Enriched trades on the other side of every fill involving `trade_id`
    pub fn counterparties(
        &self,
        enricher: &EnrichmentEngine,
        trade_id: &str,
    ) -> AnalysisResult<Vec<EnrichedTrade>> {
        let trade = self
            .trades
            .iter()
            .find(|t| t.id == trade_id)
            .ok_or_else(|| AnalysisError::UnknownTrade(trade_id.to_string()))?;

        let counter_ids: HashSet<&str> = match trade.side(&self.options.base_asset) {
            TradeSide::Ask => self
                .matches
                .iter()
                .filter(|m| m.ask_id == trade_id)
                .map(|m| m.bid_id.as_str())
                .collect(),
            TradeSide::Bid => self
                .matches
                .iter()
                .filter(|m| m.bid_id == trade_id)
                .map(|m| m.ask_id.as_str())
                .collect(),
        };

        Ok(self
            .enrich(enricher, None)?
            .into_iter()
            .filter(|t| counter_ids.contains(t.id()))
            .collect())
    }
}

/// Completed jobs keyed by engine-assigned id
#[derive(Debug, Clone, Default)]
pub struct JobResults {
    results: BTreeMap<JobId, JobResult>,
}

impl JobResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, result: JobResult) {
        self.results.insert(result.job_id, result);
    }

    pub fn get(&self, job_id: JobId) -> AnalysisResult<&JobResult> {
        self.results
            .get(&job_id)
            .ok_or(AnalysisError::UnknownJob(job_id))
    }

    /// Jobs in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &JobResult> {
        self.results.values()
    }

    pub fn job_ids(&self) -> Vec<JobId> {
        self.results.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// One statistics row per job that could be summarized, sorted by job id
    pub fn aggregated_stats(
        &self,
        enricher: &EnrichmentEngine,
        reference: Option<&PriceReferenceIndex>,
        options: &StatsOptions,
    ) -> Vec<JobStatsRecord> {
        self.aggregated_stats_with(enricher, reference, options, |_, _| {})
    }

    /// As [`aggregated_stats`](Self::aggregated_stats), reporting each finished job to `hook`
    pub fn aggregated_stats_with<F>(
        &self,
        enricher: &EnrichmentEngine,
        reference: Option<&PriceReferenceIndex>,
        options: &StatsOptions,
        hook: F,
    ) -> Vec<JobStatsRecord>
    where
        F: Fn(JobId, bool) + Sync,
    {
        let jobs: Vec<&JobResult> = self.iter().collect();
        aggregate::collect(&jobs, enricher, reference, options, hook)
    }
}

impl FromIterator<JobResult> for JobResults {
    fn from_iter<I: IntoIterator<Item = JobResult>>(iter: I) -> Self {
        let mut results = Self::new();
        for result in iter {
            results.insert(result);
        }
        results
    }
}

fn pair_label(
    base: &str,
    quote: &str,
    symbols: Option<&HashMap<String, String>>,
) -> AnalysisResult<String> {
    let Some(symbols) = symbols else {
        return Ok(format!("{}/{}", base, quote));
    };
    let symbol = |token: &str| {
        symbols
            .get(token)
            .ok_or_else(|| AnalysisError::UnknownToken(token.to_string()))
    };
    Ok(format!("{}_{}", symbol(base)?, symbol(quote)?))
}

/// Pair engine outputs with their submissions, dropping jobs without fills
pub(crate) fn assemble(
    outputs: HashMap<JobId, SimulationOutput>,
    mut pending: HashMap<JobId, PendingJob>,
    prices: Option<&PriceReferenceIndex>,
    symbols: Option<&HashMap<String, String>>,
) -> AnalysisResult<JobResults> {
    let mut results = JobResults::new();
    let mut outputs: Vec<(JobId, SimulationOutput)> = outputs.into_iter().collect();
    outputs.sort_by_key(|(id, _)| *id);

    for (job_id, output) in outputs {
        let job = pending
            .remove(&job_id)
            .ok_or(AnalysisError::UnknownJob(job_id))?;
        let pair = pair_label(&job.base, &job.quote, symbols)?;

        if output.matches.is_empty() {
            info!("No matches for job {} ({}), skipping", job_id, pair);
            continue;
        }

        let inversed_prices = prices
            .map(|index| index.is_inversed(&job.base, &job.quote))
            .transpose()?;

        debug!(
            job_id,
            pair = %pair,
            matches = output.matches.len(),
            expired = output.expired_orders.len(),
            "job assembled"
        );

        results.insert(JobResult {
            job_id,
            pair,
            options: MatchingOptions::new(job.base, job.quote, &job.options),
            trades: job.trades,
            matches: output.matches,
            expired_orders: output.expired_orders,
            inversed_prices,
        });
    }

    Ok(results)
}
