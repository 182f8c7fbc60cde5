// Simulation jobs and the matching engine interface
//
// The batch-auction matching itself lives behind `MatchingEngine`; this module
// only schedules jobs, hands them to an engine and reassembles the output.

pub mod engine;
pub mod replay;
pub mod results;
pub mod scheduler;

pub use engine::{MatchingEngine, SimulationPool};
pub use replay::{RecordedJob, ReplayEngine};
pub use results::{JobResult, JobResults};
pub use scheduler::{Job, JobScheduler};

use serde::{Deserialize, Serialize};

/// Engine-assigned job identifier
pub type JobId = u64;

/// One simulation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Matching window in seconds, unbounded when absent
    #[serde(default)]
    pub time_limit: Option<i64>,
    /// Minimum improvement a match must offer
    #[serde(default)]
    pub min_delta: Option<f64>,
    /// Batch auction interval in seconds, 0 for continuous matching
    #[serde(default)]
    pub batch_duration: i64,
}

impl JobOptions {
    pub fn continuous() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, secs: i64) -> Self {
        self.time_limit = Some(secs);
        self
    }

    pub fn with_min_delta(mut self, delta: f64) -> Self {
        self.min_delta = Some(delta);
        self
    }

    pub fn with_batch_duration(mut self, secs: i64) -> Self {
        self.batch_duration = secs;
        self
    }
}

/// Job options bound to the pair they were run for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingOptions {
    pub base_asset: String,
    pub quote_asset: String,
    pub time_limit: Option<i64>,
    pub min_delta: Option<f64>,
    pub batch_duration: i64,
}

impl MatchingOptions {
    pub fn new(base_asset: impl Into<String>, quote_asset: impl Into<String>, options: &JobOptions) -> Self {
        Self {
            base_asset: base_asset.into(),
            quote_asset: quote_asset.into(),
            time_limit: options.time_limit,
            min_delta: options.min_delta,
            batch_duration: options.batch_duration,
        }
    }
}

/// A fill between a bid and an ask; `amount` is in base units, `price` in quote per base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub bid_id: String,
    pub ask_id: String,
    pub amount: f64,
    pub price: f64,
    pub timestamp: i64,
    /// Reference price seen by the engine at match time, in the job's orientation
    #[serde(default)]
    pub ext_ref_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiredOrder {
    pub id: String,
    #[serde(default)]
    pub ext_ref_price: Option<f64>,
}

/// Everything the engine reports for one job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    #[serde(default)]
    pub matches: Vec<MatchRecord>,
    #[serde(default)]
    pub expired_orders: Vec<ExpiredOrder>,
}
