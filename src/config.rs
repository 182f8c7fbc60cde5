// Configuration management for match analysis runs

use crate::analytics::enrichment::{DEFAULT_EPSILON, DEFAULT_REFERENCE_TOLERANCE_SECS};
use crate::analytics::stats::DEFAULT_IQR_MULTIPLIER;
use crate::error::AnalysisResult;
use crate::simulation::JobOptions;
use crate::tokens::TokenRegistry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, Level};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Enables symbol job specs and symbol pair labels
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub trim_outliers: bool,
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,
    #[serde(default = "default_reference_tolerance")]
    pub reference_tolerance_secs: i64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

fn default_iqr_multiplier() -> f64 {
    DEFAULT_IQR_MULTIPLIER
}

fn default_reference_tolerance() -> i64 {
    DEFAULT_REFERENCE_TOLERANCE_SECS
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            chain: Some("ethereum".to_string()),
            trim_outliers: false,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            reference_tolerance_secs: DEFAULT_REFERENCE_TOLERANCE_SECS,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A pair to simulate and the configurations to run it under.
///
/// Tokens are addresses, or symbols when a chain is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub base: String,
    pub quote: String,
    pub options: Vec<JobOptions>,
}

impl JobSpec {
    /// (base, quote) as addresses
    pub fn resolve(&self, registry: Option<&TokenRegistry>) -> AnalysisResult<(String, String)> {
        match registry {
            Some(registry) => Ok((registry.resolve(&self.base)?, registry.resolve(&self.quote)?)),
            None => Ok((self.base.clone(), self.quote.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisSettings::default(),
            logging: LoggingConfig::default(),
            jobs: vec![JobSpec {
                base: "weth".to_string(),
                quote: "usdc".to_string(),
                options: vec![
                    JobOptions::continuous().with_time_limit(600),
                    JobOptions::continuous()
                        .with_time_limit(600)
                        .with_batch_duration(12),
                ],
            }],
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;

        let config: AnalysisConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// Load configuration from file, or create default if file doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.to_file(&path)?;
            info!("📁 Created default config file: {}", path.as_ref().display());
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let analysis = &self.analysis;

        if !(analysis.iqr_multiplier > 0.0) {
            return Err(ConfigError::Validation("iqr_multiplier must be positive".to_string()));
        }

        if analysis.reference_tolerance_secs < 0 {
            return Err(ConfigError::Validation(
                "reference_tolerance_secs must be non-negative".to_string(),
            ));
        }

        if !(analysis.epsilon >= 0.0) {
            return Err(ConfigError::Validation("epsilon must be non-negative".to_string()));
        }

        self.log_level()?;

        for job in &self.jobs {
            let pair = format!("{}/{}", job.base, job.quote);

            if job.options.is_empty() {
                return Err(ConfigError::Validation(format!("job {} has no options", pair)));
            }

            for options in &job.options {
                if options.batch_duration < 0 {
                    return Err(ConfigError::Validation(format!(
                        "job {}: batch_duration must be non-negative",
                        pair
                    )));
                }
                if options.time_limit.is_some_and(|t| t <= 0) {
                    return Err(ConfigError::Validation(format!(
                        "job {}: time_limit must be positive",
                        pair
                    )));
                }
                if options.min_delta.is_some_and(|d| !(d >= 0.0)) {
                    return Err(ConfigError::Validation(format!(
                        "job {}: min_delta must be non-negative",
                        pair
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => Err(ConfigError::Validation(format!("unknown log level: {}", other))),
        }
    }

    pub fn registry(&self) -> AnalysisResult<Option<TokenRegistry>> {
        self.analysis
            .chain
            .as_deref()
            .map(TokenRegistry::for_chain)
            .transpose()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(String),

    #[error("Failed to write config file: {0}")]
    FileWrite(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
