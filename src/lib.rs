// Match Analysis Library
//
// Execution quality analysis of DEX trade intents under simulated batch-auction matching

pub mod analytics;
pub mod config;
pub mod data;
pub mod error;       // Unified error handling
pub mod progress;
pub mod simulation;
pub mod tokens;      // Built-in per-chain token tables

// Re-export input data types
pub use data::{PriceReferenceIndex, ReferencePricePoint, Trade, TradeDataset, TradeSide};

// Re-export error types
pub use error::{AnalysisError, AnalysisResult};

// Re-export configuration
pub use config::{AnalysisConfig, AnalysisSettings, ConfigError, JobSpec, LoggingConfig};

// Re-export simulation components
pub use simulation::{
    ExpiredOrder, Job, JobId, JobOptions, JobResult, JobResults, JobScheduler, MatchRecord,
    MatchingEngine, MatchingOptions, RecordedJob, ReplayEngine, SimulationOutput, SimulationPool,
};

// Re-export analytics components
pub use analytics::{
    CostAdjusted, EnrichedTrade, EnrichmentEngine, EnrichmentInput, JobStatsRecord, MatchesStats,
    Metric, Stat, StatsOptions, Weight,
};

pub use tokens::{Chain, TokenRegistry};
