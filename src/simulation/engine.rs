// Port for the external batch-auction matching engine

use crate::data::{ReferenceFeed, Trade};
use crate::error::AnalysisResult;
use crate::simulation::{JobId, JobOptions, SimulationOutput};
use std::collections::HashMap;

/// Matching engine capability.
///
/// Implementations run the order-book / batch-auction simulation; this crate
/// never looks inside. Known implementations:
/// - [`ReplayEngine`](crate::simulation::ReplayEngine): replays recorded output
/// - native engine bindings provided by the embedding application
pub trait MatchingEngine {
    type Pool: SimulationPool;

    /// Load the time-ordered trades and an optional reference price feed
    fn create_pool(&self, trades: &[Trade], feed: Option<ReferenceFeed>) -> AnalysisResult<Self::Pool>;
}

/// A loaded engine instance accepting job submissions
pub trait SimulationPool {
    /// Submit one job per entry of `options`.
    ///
    /// Returns the assigned ids in the same order as `options`.
    fn add_job(
        &mut self,
        base: &str,
        quote: &str,
        trade_mask: &[bool],
        options: &[JobOptions],
    ) -> AnalysisResult<Vec<JobId>>;

    /// Run every submitted job to completion. Blocks until all are done.
    fn execute(self) -> AnalysisResult<HashMap<JobId, SimulationOutput>>;
}
