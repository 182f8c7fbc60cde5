// Deterministic engine that replays recorded simulation output

use crate::data::{ReferenceFeed, Trade};
use crate::error::{AnalysisError, AnalysisResult};
use crate::simulation::{JobId, JobOptions, MatchingEngine, SimulationOutput, SimulationPool};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Engine output recorded for one (base, quote, option index) submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedJob {
    pub base: String,
    pub quote: String,
    #[serde(default)]
    pub option_index: usize,
    #[serde(flatten)]
    pub output: SimulationOutput,
}

type RecordingKey = (String, String, usize);

/// Matching engine backed by recorded fills and expiries.
///
/// Drives the pipeline from fixtures or from engine output dumped to disk.
#[derive(Debug, Clone, Default)]
pub struct ReplayEngine {
    recordings: HashMap<RecordingKey, SimulationOutput>,
}

impl ReplayEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_recordings(recordings: Vec<RecordedJob>) -> Self {
        recordings
            .into_iter()
            .fold(Self::new(), |engine, r| engine.record(r.base, r.quote, r.option_index, r.output))
    }

    pub fn record(
        mut self,
        base: impl Into<String>,
        quote: impl Into<String>,
        option_index: usize,
        output: SimulationOutput,
    ) -> Self {
        self.recordings
            .insert((base.into(), quote.into(), option_index), output);
        self
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}

impl MatchingEngine for ReplayEngine {
    type Pool = ReplayPool;

    fn create_pool(&self, trades: &[Trade], feed: Option<ReferenceFeed>) -> AnalysisResult<ReplayPool> {
        debug!(
            trades = trades.len(),
            feed_bases = feed.as_ref().map_or(0, |f| f.len()),
            "replay pool loaded"
        );
        Ok(ReplayPool {
            trade_ids: trades.iter().map(|t| t.id.clone()).collect(),
            recordings: self.recordings.clone(),
            submitted: Vec::new(),
        })
    }
}

pub struct ReplayPool {
    trade_ids: Vec<String>,
    recordings: HashMap<RecordingKey, SimulationOutput>,
    submitted: Vec<(JobId, SimulationOutput)>,
}

impl ReplayPool {
    fn check_ids(output: &SimulationOutput, selected: &HashSet<&str>) -> AnalysisResult<()> {
        let referenced = output
            .matches
            .iter()
            .flat_map(|m| [m.bid_id.as_str(), m.ask_id.as_str()])
            .chain(output.expired_orders.iter().map(|e| e.id.as_str()));

        for id in referenced {
            if !selected.contains(id) {
                return Err(AnalysisError::UnknownTrade(id.to_string()));
            }
        }
        Ok(())
    }
}

impl SimulationPool for ReplayPool {
    fn add_job(
        &mut self,
        base: &str,
        quote: &str,
        trade_mask: &[bool],
        options: &[JobOptions],
    ) -> AnalysisResult<Vec<JobId>> {
        if trade_mask.len() != self.trade_ids.len() {
            return Err(AnalysisError::MaskLength {
                expected: self.trade_ids.len(),
                actual: trade_mask.len(),
            });
        }

        let selected: HashSet<&str> = self
            .trade_ids
            .iter()
            .zip(trade_mask)
            .filter(|(_, &m)| m)
            .map(|(id, _)| id.as_str())
            .collect();

        let mut ids = Vec::with_capacity(options.len());
        for option_index in 0..options.len() {
            let key = (base.to_string(), quote.to_string(), option_index);
            let output = self
                .recordings
                .get(&key)
                .cloned()
                .ok_or_else(|| AnalysisError::MissingRecording {
                    base: base.to_string(),
                    quote: quote.to_string(),
                    option_index,
                })?;
            Self::check_ids(&output, &selected)?;

            let job_id = self.submitted.len() as JobId;
            self.submitted.push((job_id, output));
            ids.push(job_id);
        }

        Ok(ids)
    }

    fn execute(self) -> AnalysisResult<HashMap<JobId, SimulationOutput>> {
        Ok(self.submitted.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{ExpiredOrder, MatchRecord};

    fn trades() -> Vec<Trade> {
        vec![
            Trade::new("bid", "ETH", "USDC", 1.0, 1500.0, 0, 1500.0),
            Trade::new("ask", "USDC", "ETH", 1500.0, 1.0, 0, 1500.0),
            Trade::new("btc", "WBTC", "USDC", 1.0, 60000.0, 0, 60000.0),
        ]
    }

    fn output() -> SimulationOutput {
        SimulationOutput {
            matches: vec![MatchRecord {
                bid_id: "bid".to_string(),
                ask_id: "ask".to_string(),
                amount: 1.0,
                price: 1500.0,
                timestamp: 0,
                ext_ref_price: None,
            }],
            expired_orders: vec![],
        }
    }

    #[test]
    fn test_replay_assigns_ids_in_submission_order() {
        let engine = ReplayEngine::new()
            .record("ETH", "USDC", 0, output())
            .record("ETH", "USDC", 1, SimulationOutput::default());
        let mut pool = engine.create_pool(&trades(), None).unwrap();

        let ids = pool
            .add_job(
                "ETH",
                "USDC",
                &[true, true, false],
                &[JobOptions::continuous(), JobOptions::continuous().with_batch_duration(12)],
            )
            .unwrap();
        assert_eq!(ids, vec![0, 1]);

        let results = pool.execute().unwrap();
        assert_eq!(results[&0].matches.len(), 1);
        assert!(results[&1].matches.is_empty());
    }

    #[test]
    fn test_missing_recording() {
        let engine = ReplayEngine::new();
        let mut pool = engine.create_pool(&trades(), None).unwrap();
        let err = pool
            .add_job("ETH", "USDC", &[true, true, false], &[JobOptions::continuous()])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingRecording { option_index: 0, .. }));
    }

    #[test]
    fn test_fill_outside_selection_is_rejected() {
        let mut out = output();
        out.expired_orders.push(ExpiredOrder {
            id: "btc".to_string(),
            ext_ref_price: None,
        });
        let engine = ReplayEngine::new().record("ETH", "USDC", 0, out);
        let mut pool = engine.create_pool(&trades(), None).unwrap();
        let err = pool
            .add_job("ETH", "USDC", &[true, true, false], &[JobOptions::continuous()])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownTrade(id) if id == "btc"));
    }

    #[test]
    fn test_recorded_job_json() {
        let json = r#"{"base":"ETH","quote":"USDC","option_index":1,
            "matches":[{"bid_id":"bid","ask_id":"ask","amount":1.0,"price":1500.0,"timestamp":3}],
            "expired_orders":[{"id":"x","ext_ref_price":1499.0}]}"#;
        let recorded: RecordedJob = serde_json::from_str(json).unwrap();
        assert_eq!(recorded.option_index, 1);
        assert_eq!(recorded.output.matches[0].ext_ref_price, None);
        assert_eq!(recorded.output.expired_orders[0].ext_ref_price, Some(1499.0));

        let engine = ReplayEngine::from_recordings(vec![recorded]);
        assert_eq!(engine.len(), 1);
    }
}
