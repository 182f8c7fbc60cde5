// Execution quality analytics over simulated fills

pub mod aggregate;
pub mod enrichment;
pub mod stats;

pub use aggregate::JobStatsRecord;
pub use enrichment::{CostAdjusted, EnrichedTrade, EnrichmentEngine, EnrichmentInput};
pub use stats::{partition_outliers, MatchesStats, Metric, Stat, StatsOptions, Weight};
