// Distributional statistics over enriched trades

use crate::analytics::enrichment::EnrichedTrade;
use crate::config::AnalysisSettings;
use crate::error::{AnalysisError, AnalysisResult};
use ndarray::Array1;
use serde::Serialize;
use std::fmt;

/// Basis points per unit
pub const BPS: f64 = 10_000.0;

pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Per-trade quantity a [`Stat`] is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PriceImprovement,
    PriceImprovementWithCost,
    EffectivePriceImprovement,
    WaitCost,
    GrossPriceImprovement,
}

impl Metric {
    pub fn value(self, trade: &EnrichedTrade) -> Option<f64> {
        match self {
            Metric::PriceImprovement => Some(trade.price_improvement),
            Metric::PriceImprovementWithCost => trade.price_improvement_with_cost(),
            Metric::EffectivePriceImprovement => trade.effective_price_improvement(),
            Metric::WaitCost => trade.wait_cost(),
            Metric::GrossPriceImprovement => trade.gross_price_improvement,
        }
    }
}

/// Notional weighting applied to a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Weight {
    Notional,
    MatchedNotional,
    UnmatchedNotional,
}

impl Weight {
    pub fn value(self, trade: &EnrichedTrade) -> f64 {
        let usd = trade.amount_usd();
        match self {
            Weight::Notional => usd,
            Weight::MatchedNotional => usd * trade.prop_matched,
            Weight::UnmatchedNotional => usd * (1.0 - trade.prop_matched),
        }
    }
}

/// Plain and weighted mean / standard deviation of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stat {
    pub mean: f64,
    pub weighted_mean: f64,
    /// Sample standard deviation (ddof = 1), NaN below two values
    pub stddev: f64,
    /// Weighted spread around the unweighted mean
    pub weighted_stddev: f64,
    pub count: usize,
}

impl Stat {
    /// `None` when there are no values; weights must align with values
    pub fn compute(values: &[f64], weights: &[f64]) -> Option<Self> {
        if values.is_empty() || values.len() != weights.len() {
            return None;
        }

        let x = Array1::from(values.to_vec());
        let w = Array1::from(weights.to_vec());

        let mean = x.mean()?;
        let stddev = if x.len() < 2 { f64::NAN } else { x.std(1.0) };

        let weight_sum = w.sum();
        let weighted_mean = (&x * &w).sum() / weight_sum;
        let sq_dev = x.mapv(|v| (v - mean).powi(2));
        let weighted_stddev = ((&sq_dev * &w).sum() / weight_sum).sqrt();

        Some(Self {
            mean,
            weighted_mean,
            stddev,
            weighted_stddev,
            count: x.len(),
        })
    }

    /// Stat of `metric` over the trades where it is available
    pub fn from_trades<'a, I>(trades: I, metric: Metric, weight: Weight) -> Option<Self>
    where
        I: IntoIterator<Item = &'a EnrichedTrade>,
    {
        let (values, weights): (Vec<f64>, Vec<f64>) = trades
            .into_iter()
            .filter_map(|t| metric.value(t).map(|v| (v, weight.value(t))))
            .unzip();
        Self::compute(&values, &weights)
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} ± {:.2} (W = {:.2} ± {:.2}) [BPS]",
            self.mean * BPS,
            self.stddev * BPS,
            self.weighted_mean * BPS,
            self.weighted_stddev * BPS
        )
    }
}

/// Quantile of sorted data, linearly interpolated between order statistics
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Inclusive `[Q1 - k·IQR, Q3 + k·IQR]` fence
pub fn iqr_bounds(values: &[f64], multiplier: f64) -> Option<(f64, f64)> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - multiplier * iqr, q3 + multiplier * iqr))
}

/// Split trades into (inside the fence, outliers) on raw price improvement
pub fn partition_outliers(
    trades: &[EnrichedTrade],
    multiplier: f64,
) -> (Vec<EnrichedTrade>, Vec<EnrichedTrade>) {
    let values: Vec<f64> = trades.iter().map(|t| t.price_improvement).collect();
    match iqr_bounds(&values, multiplier) {
        Some((lower, upper)) => trades
            .iter()
            .cloned()
            .partition(|t| t.price_improvement >= lower && t.price_improvement <= upper),
        None => (Vec::new(), Vec::new()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsOptions {
    pub trim_outliers: bool,
    pub iqr_multiplier: f64,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            trim_outliers: false,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
        }
    }
}

impl StatsOptions {
    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        Self {
            trim_outliers: settings.trim_outliers,
            iqr_multiplier: settings.iqr_multiplier,
        }
    }

    pub fn trimmed(mut self) -> Self {
        self.trim_outliers = true;
        self
    }
}

/// Execution quality summary of one job
#[derive(Debug, Clone, Serialize)]
pub struct MatchesStats {
    /// Unmatched remainder executes at the trade's own price
    pub pi_no_fail_cost: Stat,
    /// Unmatched remainder executes at the reference price
    pub pi_with_mkt_fallback: Option<Stat>,
    /// Improvement over the effective reference price
    pub eff_pi_with_mkt_fallback: Option<Stat>,
    pub pi_matched_only: Option<Stat>,
    pub gross_pi: Option<Stat>,
    pub wait_cost: Option<Stat>,
    pub wait_cost_unmatched: Option<Stat>,
    pub rel_matched_vol: f64,
    pub rel_matches: f64,
    pub total_trades: usize,
    pub total_volume_traded: f64,
    #[serde(skip)]
    pub outliers: Vec<EnrichedTrade>,
}

impl MatchesStats {
    pub fn compute(trades: &[EnrichedTrade], options: &StatsOptions) -> AnalysisResult<Self> {
        if trades.is_empty() {
            return Err(AnalysisError::EmptySelection(
                "no enriched trades to summarize".to_string(),
            ));
        }

        let (kept, outliers) = partition_outliers(trades, options.iqr_multiplier);
        let sample: &[EnrichedTrade] = if options.trim_outliers { &kept } else { trades };

        let pi_no_fail_cost = Stat::from_trades(sample, Metric::PriceImprovement, Weight::Notional)
            .ok_or_else(|| {
                AnalysisError::EmptySelection("every trade was trimmed as an outlier".to_string())
            })?;

        let total_volume_traded: f64 = sample.iter().map(|t| t.amount_usd()).sum();
        let rel_matched_vol = if total_volume_traded == 0.0 {
            0.0
        } else {
            sample.iter().map(|t| Weight::MatchedNotional.value(t)).sum::<f64>() / total_volume_traded
        };
        let rel_matches =
            sample.iter().filter(|t| t.match_fills > 0).count() as f64 / sample.len() as f64;

        Ok(Self {
            pi_no_fail_cost,
            pi_with_mkt_fallback: Stat::from_trades(
                sample,
                Metric::PriceImprovementWithCost,
                Weight::Notional,
            ),
            eff_pi_with_mkt_fallback: Stat::from_trades(
                sample,
                Metric::EffectivePriceImprovement,
                Weight::Notional,
            ),
            pi_matched_only: Stat::from_trades(
                sample.iter().filter(|t| t.prop_matched > 0.0),
                Metric::PriceImprovement,
                Weight::MatchedNotional,
            ),
            gross_pi: Stat::from_trades(sample, Metric::GrossPriceImprovement, Weight::MatchedNotional),
            wait_cost: Stat::from_trades(sample, Metric::WaitCost, Weight::Notional),
            wait_cost_unmatched: Stat::from_trades(
                sample.iter().filter(|t| t.prop_matched < 1.0),
                Metric::WaitCost,
                Weight::UnmatchedNotional,
            ),
            rel_matched_vol,
            rel_matches,
            total_trades: sample.len(),
            total_volume_traded,
            outliers,
        })
    }

    pub fn outlier_count(&self) -> usize {
        self.outliers.len()
    }

    pub fn outlier_ids(&self) -> Vec<String> {
        self.outliers.iter().map(|t| t.id().to_string()).collect()
    }
}

fn fmt_optional(stat: &Option<Stat>) -> String {
    stat.map_or_else(|| "n/a".to_string(), |s| s.to_string())
}

impl fmt::Display for MatchesStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Price Improvement (No fail cost): {}", self.pi_no_fail_cost)?;
        writeln!(
            f,
            "Price Improvement (With Market Fallback): {}",
            fmt_optional(&self.pi_with_mkt_fallback)
        )?;
        writeln!(
            f,
            "Effective Price Improvement (With Market Fallback): {}",
            fmt_optional(&self.eff_pi_with_mkt_fallback)
        )?;
        writeln!(f, "Price Improvement (Only Matched): {}", fmt_optional(&self.pi_matched_only))?;
        writeln!(f, "Wait Cost: {}", fmt_optional(&self.wait_cost))?;
        writeln!(f, "Wait Cost (Unmatched): {}", fmt_optional(&self.wait_cost_unmatched))?;
        writeln!(f, "Relative Matched Volume: {:.2}%", self.rel_matched_vol * 100.0)?;
        writeln!(f, "Relative Matches: {:.2}%", self.rel_matches * 100.0)?;
        writeln!(f, "Total Trades: {}", self.total_trades)?;
        writeln!(f, "Total Volume Traded: {:.0} USD", self.total_volume_traded)
    }
}
