// Job scheduling against a matching engine

use crate::data::{PriceReferenceIndex, ReferenceFeed, Trade, TradeDataset};
use crate::error::{AnalysisError, AnalysisResult};
use crate::simulation::results::{self, PendingJob};
use crate::simulation::{JobOptions, JobResults, MatchingEngine, SimulationPool};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A pair, a trade selection and the configurations to simulate it under
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub base_asset: String,
    pub quote_asset: String,
    pub trades_mask: Vec<bool>,
    pub options: Vec<JobOptions>,
}

impl Job {
    pub fn selected(&self) -> usize {
        self.trades_mask.iter().filter(|&&m| m).count()
    }
}

/// Collects jobs over one trade dataset and runs them in a single engine pass
#[derive(Debug, Clone)]
pub struct JobScheduler {
    dataset: TradeDataset,
    prices: Option<PriceReferenceIndex>,
    jobs: Vec<Job>,
}

impl JobScheduler {
    pub fn new(dataset: TradeDataset, prices: Option<PriceReferenceIndex>) -> Self {
        Self {
            dataset,
            prices,
            jobs: Vec::new(),
        }
    }

    pub fn dataset(&self) -> &TradeDataset {
        &self.dataset
    }

    pub fn prices(&self) -> Option<&PriceReferenceIndex> {
        self.prices.as_ref()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn into_parts(self) -> (TradeDataset, Option<PriceReferenceIndex>) {
        (self.dataset, self.prices)
    }

    /// Queue a job; without a mask every trade between the two tokens is selected.
    ///
    /// An empty `options` list runs a single continuous-matching configuration.
    /// Returns `false` when the selection is empty and the job was skipped.
    pub fn add_job(
        &mut self,
        base: &str,
        quote: &str,
        options: Vec<JobOptions>,
        mask: Option<Vec<bool>>,
    ) -> AnalysisResult<bool> {
        if base == quote {
            return Err(AnalysisError::InvalidPair {
                base: base.to_string(),
                quote: quote.to_string(),
                reason: "base and quote are the same token".to_string(),
            });
        }

        let trades_mask = match mask {
            Some(mask) => {
                self.dataset.check_mask(&mask)?;
                mask
            }
            None => self.dataset.pair_mask(base, quote),
        };

        let options = if options.is_empty() {
            vec![JobOptions::continuous()]
        } else {
            options
        };

        let job = Job {
            base_asset: base.to_string(),
            quote_asset: quote.to_string(),
            trades_mask,
            options,
        };

        if job.selected() == 0 {
            info!("⏭️  No trades selected for {}/{}, skipping job", base, quote);
            return Ok(false);
        }

        debug!(
            "Queued {}/{} with {} trades and {} option set(s)",
            base,
            quote,
            job.selected(),
            job.options.len()
        );
        self.jobs.push(job);
        Ok(true)
    }

    /// Builder form of [`add_job`](Self::add_job) over the pair's own trades
    pub fn with_job(mut self, base: &str, quote: &str, options: Vec<JobOptions>) -> AnalysisResult<Self> {
        self.add_job(base, quote, options, None)?;
        Ok(self)
    }

    fn reference_feed(&self) -> Option<ReferenceFeed> {
        let prices = self.prices.as_ref()?;
        let pairs = self
            .jobs
            .iter()
            .map(|j| (j.base_asset.as_str(), j.quote_asset.as_str()));
        Some(prices.feed_for_pairs(pairs))
    }

    /// Run every queued job and collect the jobs that produced fills.
    ///
    /// `symbols` maps token addresses to display symbols for the pair labels.
    pub fn execute<E: MatchingEngine>(
        &self,
        engine: &E,
        symbols: Option<&HashMap<String, String>>,
    ) -> AnalysisResult<JobResults> {
        info!(
            "🚀 Running {} job(s) over {} trades",
            self.jobs.len(),
            self.dataset.len()
        );

        let mut pool = engine.create_pool(self.dataset.trades(), self.reference_feed())?;
        let mut pending = HashMap::new();

        for job in &self.jobs {
            let ids = pool.add_job(&job.base_asset, &job.quote_asset, &job.trades_mask, &job.options)?;
            if ids.len() != job.options.len() {
                warn!(
                    "Engine returned {} id(s) for {} option set(s) on {}/{}",
                    ids.len(),
                    job.options.len(),
                    job.base_asset,
                    job.quote_asset
                );
            }

            let trades: Arc<Vec<Trade>> = Arc::new(self.dataset.select(&job.trades_mask)?);
            for (job_id, option) in ids.into_iter().zip(&job.options) {
                pending.insert(
                    job_id,
                    PendingJob {
                        base: job.base_asset.clone(),
                        quote: job.quote_asset.clone(),
                        options: option.clone(),
                        trades: Arc::clone(&trades),
                    },
                );
            }
        }

        let outputs = pool.execute()?;
        info!("✅ Engine finished {} job(s)", outputs.len());

        results::assemble(outputs, pending, self.prices.as_ref(), symbols)
    }
}
