//! Unified error handling for the match analysis pipeline
//!
//! Every fallible operation in the crate returns [`AnalysisResult`]. Variants are
//! grouped into configuration, validation, lookup and io categories so callers
//! can log or filter failures without matching on every variant.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for the match analysis pipeline
#[derive(Debug, Error)]
pub enum AnalysisError {
    // Configuration errors
    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("Unknown token: {0}")]
    UnknownToken(String),

    #[error("Invalid pair {base}/{quote}: {reason}")]
    InvalidPair {
        base: String,
        quote: String,
        reason: String,
    },

    #[error("Reference price orientation unresolved for {base}/{quote}")]
    UnresolvedOrientation { base: String, quote: String },

    #[error("Reference prices for {base}/{quote} are recorded in both orientations")]
    ConflictingOrientation { base: String, quote: String },

    #[error("Trade mask has {actual} entries, dataset has {expected} trades")]
    MaskLength { expected: usize, actual: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),

    // Validation errors
    #[error("prop_matched outside [0, 1] for {count} trade(s) (first: {first_id} = {value})")]
    MatchedProportionOutOfBounds {
        count: usize,
        first_id: String,
        value: f64,
    },

    #[error("price_improvement < 0 for {count} trade(s) (first: {first_id} = {value})")]
    NegativePriceImprovement {
        count: usize,
        first_id: String,
        value: f64,
    },

    #[error("Reference price unresolved for {count} trade(s) (first: {first_id}): {reason}")]
    ReferencePriceUnresolved {
        count: usize,
        first_id: String,
        reason: String,
    },

    #[error("Exact-out trade {0} cannot be priced: matched proportion for exact-out intents is undefined")]
    UnsupportedExactOut(String),

    #[error("Nothing to aggregate: {0}")]
    EmptySelection(String),

    #[error("Invalid trade {id}: {reason}")]
    InvalidTrade { id: String, reason: String },

    // Lookup errors
    #[error("Unknown job id: {0}")]
    UnknownJob(u64),

    #[error("Unknown trade id: {0}")]
    UnknownTrade(String),

    #[error("No recorded engine output for {base}/{quote} option #{option_index}")]
    MissingRecording {
        base: String,
        quote: String,
        option_index: usize,
    },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AnalysisError::UnknownChain(_)
            | AnalysisError::UnknownToken(_)
            | AnalysisError::InvalidPair { .. }
            | AnalysisError::UnresolvedOrientation { .. }
            | AnalysisError::ConflictingOrientation { .. }
            | AnalysisError::MaskLength { .. }
            | AnalysisError::Config(_) => "configuration",

            AnalysisError::MatchedProportionOutOfBounds { .. }
            | AnalysisError::NegativePriceImprovement { .. }
            | AnalysisError::ReferencePriceUnresolved { .. }
            | AnalysisError::UnsupportedExactOut(_)
            | AnalysisError::EmptySelection(_)
            | AnalysisError::InvalidTrade { .. } => "validation",

            AnalysisError::UnknownJob(_)
            | AnalysisError::UnknownTrade(_)
            | AnalysisError::MissingRecording { .. } => "lookup",

            AnalysisError::Io(_) | AnalysisError::Json(_) => "io",
        }
    }

    /// True for invariant violations that point at a modeling or engine defect
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            AnalysisError::MatchedProportionOutOfBounds { .. }
                | AnalysisError::NegativePriceImprovement { .. }
        )
    }
}

/// Result type alias using AnalysisError
pub type AnalysisResult<T> = Result<T, AnalysisError>;
