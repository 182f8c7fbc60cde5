// Per-trade execution quality from engine fills and expiries
//
// Trades are joined with their aggregated fills and expiry records, priced
// against their own limit ("no fallback cost") and, when a reference price is
// available, against the external market as the fallback for the unmatched
// remainder.

use crate::config::AnalysisSettings;
use crate::data::{series_orientation, ReferencePricePoint, ReferenceSeries, Trade, TradeSide};
use crate::error::{AnalysisError, AnalysisResult};
use crate::simulation::{ExpiredOrder, MatchRecord, MatchingOptions};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Decimal places kept for proportions and improvements
pub const ROUND_DECIMALS: i32 = 14;

/// Forward-join window for reference prices
pub const DEFAULT_REFERENCE_TOLERANCE_SECS: i64 = 7200;

/// Tolerance for the [0, 1] and non-negative improvement invariants
pub const DEFAULT_EPSILON: f64 = 1e-9;

fn round_dec(value: f64) -> f64 {
    let factor = 10f64.powi(ROUND_DECIMALS);
    (value * factor).round() / factor
}

/// Relative gain of `realized` over `reference` from the trade's point of view
fn relative_gain(side: TradeSide, realized: f64, reference: f64) -> f64 {
    match side {
        TradeSide::Ask => realized / reference - 1.0,
        TradeSide::Bid => 1.0 - realized / reference,
    }
}

/// Cost-adjusted view: the unmatched remainder executes at the reference price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAdjusted {
    /// Time the reference price was resolved at (series lookups only)
    pub resolution_time: Option<i64>,
    /// Reference price at resolution, in the job's orientation
    pub reference_price: f64,
    /// Reference price at creation, in the job's orientation
    pub creation_price: f64,
    pub effective_reference_price: f64,
    pub price_realized_with_cost: f64,
    pub price_improvement_with_cost: f64,
    pub effective_price_improvement: f64,
    pub wait_cost: f64,
}

impl CostAdjusted {
    fn compute(
        trade: &EnrichedTrade,
        resolution_time: Option<i64>,
        reference_price: f64,
        creation_price: f64,
        rel_offset: f64,
    ) -> Self {
        let side = trade.side;
        let prop = trade.prop_matched;
        let effective_reference_price = reference_price * rel_offset;
        let price_realized_with_cost =
            prop * trade.price_matched + (1.0 - prop) * effective_reference_price;

        // Drift of the market while waiting; a falling market favours a stale ask
        let wait_cost = match side {
            TradeSide::Ask => 1.0 - reference_price / creation_price,
            TradeSide::Bid => reference_price / creation_price - 1.0,
        };

        Self {
            resolution_time,
            reference_price,
            creation_price,
            effective_reference_price,
            price_realized_with_cost,
            price_improvement_with_cost: round_dec(relative_gain(
                side,
                price_realized_with_cost,
                trade.price_org,
            )),
            effective_price_improvement: round_dec(relative_gain(
                side,
                price_realized_with_cost,
                effective_reference_price,
            )),
            wait_cost,
        }
    }
}

/// Trade joined with its simulated execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTrade {
    #[serde(flatten)]
    pub trade: Trade,
    pub side: TradeSide,
    pub is_matched: bool,
    pub is_expired: bool,
    pub match_fills: usize,
    pub matched_amount_base: f64,
    pub matched_amount_quote: f64,
    pub match_time_max: Option<i64>,
    pub match_time_wmean: Option<f64>,
    pub match_ext_ref_price_wmean: Option<f64>,
    pub match_ext_ref_price_last: Option<f64>,
    pub expiry_ext_ref_price: Option<f64>,
    pub wait_time: Option<i64>,
    pub wait_time_wmean: Option<f64>,
    pub prop_matched: f64,
    pub price_org: f64,
    pub price_matched: f64,
    pub price_realized: f64,
    pub price_improvement: f64,
    pub gross_price_improvement: Option<f64>,
    /// `None` when no reference price was supplied or reported by the engine
    pub cost: Option<CostAdjusted>,
}

impl EnrichedTrade {
    pub fn id(&self) -> &str {
        &self.trade.id
    }

    pub fn amount_usd(&self) -> f64 {
        self.trade.amount_usd
    }

    pub fn price_improvement_with_cost(&self) -> Option<f64> {
        self.cost.as_ref().map(|c| c.price_improvement_with_cost)
    }

    pub fn effective_price_improvement(&self) -> Option<f64> {
        self.cost.as_ref().map(|c| c.effective_price_improvement)
    }

    pub fn wait_cost(&self) -> Option<f64> {
        self.cost.as_ref().map(|c| c.wait_cost)
    }
}

#[derive(Debug, Default)]
struct FillAggregate {
    amount_base: f64,
    amount_quote: f64,
    fills: usize,
    time_max: Option<i64>,
    time_x_amount: f64,
    ref_x_amount: f64,
    ref_amount: f64,
    ref_last: Option<(i64, f64)>,
}

impl FillAggregate {
    fn add(&mut self, fill: &MatchRecord) {
        self.amount_base += fill.amount;
        self.amount_quote += fill.amount * fill.price;
        self.fills += 1;
        self.time_max = Some(self.time_max.map_or(fill.timestamp, |t| t.max(fill.timestamp)));
        self.time_x_amount += fill.timestamp as f64 * fill.amount;

        if let Some(price) = fill.ext_ref_price {
            self.ref_x_amount += price * fill.amount;
            self.ref_amount += fill.amount;
            match self.ref_last {
                Some((t, _)) if t > fill.timestamp => {}
                _ => self.ref_last = Some((fill.timestamp, price)),
            }
        }
    }

    fn time_wmean(&self) -> Option<f64> {
        (self.amount_base > 0.0).then(|| self.time_x_amount / self.amount_base)
    }

    fn ref_wmean(&self) -> Option<f64> {
        (self.ref_amount > 0.0).then(|| self.ref_x_amount / self.ref_amount)
    }
}

/// Everything one job contributes to enrichment
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentInput<'a> {
    pub trades: &'a [Trade],
    pub matches: &'a [MatchRecord],
    pub expired_orders: &'a [ExpiredOrder],
    pub options: &'a MatchingOptions,
    /// Reference series for this job's pair, in either orientation
    pub reference: Option<&'a [ReferencePricePoint]>,
    /// Whether the stored reference series runs quote→base for this pair
    pub inversed_prices: Option<bool>,
}

/// Collects per-trade failures so one error reports them all
struct Violations {
    count: usize,
    first: Option<(String, f64, String)>,
}

impl Violations {
    fn new() -> Self {
        Self { count: 0, first: None }
    }

    fn push(&mut self, id: &str, value: f64, reason: impl Into<String>) {
        self.count += 1;
        if self.first.is_none() {
            self.first = Some((id.to_string(), value, reason.into()));
        }
    }

    fn into_error<F>(self, make: F) -> AnalysisResult<()>
    where
        F: FnOnce(usize, String, f64, String) -> AnalysisError,
    {
        match self.first {
            Some((id, value, reason)) => Err(make(self.count, id, value, reason)),
            None => Ok(()),
        }
    }
}

/// Computes enriched trades for one job.
///
/// Pure: identical inputs give identical outputs and nothing is cached.
#[derive(Debug, Clone)]
pub struct EnrichmentEngine {
    reference_tolerance_secs: i64,
    epsilon: f64,
}

impl Default for EnrichmentEngine {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_TOLERANCE_SECS, DEFAULT_EPSILON)
    }
}

impl EnrichmentEngine {
    pub fn new(reference_tolerance_secs: i64, epsilon: f64) -> Self {
        Self {
            reference_tolerance_secs,
            epsilon,
        }
    }

    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        Self::new(settings.reference_tolerance_secs, settings.epsilon)
    }

    pub fn reference_tolerance_secs(&self) -> i64 {
        self.reference_tolerance_secs
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn enrich(&self, input: &EnrichmentInput<'_>) -> AnalysisResult<Vec<EnrichedTrade>> {
        Self::check_trades(input.trades)?;

        let known: HashSet<&str> = input.trades.iter().map(|t| t.id.as_str()).collect();
        let fills = Self::aggregate_fills(input.matches, &known)?;
        let expiries = Self::index_expiries(input.expired_orders, &known)?;

        let mut enriched = input
            .trades
            .iter()
            .map(|trade| {
                Self::price_trade(
                    trade,
                    &input.options.base_asset,
                    fills.get(trade.id.as_str()),
                    expiries.get(trade.id.as_str()).copied(),
                )
            })
            .collect::<Vec<_>>();

        self.validate_proportions(&mut enriched)?;
        self.validate_improvements(&enriched)?;

        if let Some(series) = input.reference {
            self.apply_series_reference(&mut enriched, series, input)?;
        } else if enriched.iter().any(|t| t.match_ext_ref_price_wmean.is_some_and(|p| p != 0.0)) {
            self.apply_fill_reference(&mut enriched, input)?;
        }

        debug!(
            pair = %format!("{}/{}", input.options.base_asset, input.options.quote_asset),
            trades = enriched.len(),
            matched = enriched.iter().filter(|t| t.is_matched).count(),
            with_cost = enriched.iter().filter(|t| t.cost.is_some()).count(),
            "trades enriched"
        );

        Ok(enriched)
    }

    fn check_trades(trades: &[Trade]) -> AnalysisResult<()> {
        for trade in trades {
            if trade.is_exact_out() {
                return Err(AnalysisError::UnsupportedExactOut(trade.id.clone()));
            }
            if !(trade.token_sold_amount > 0.0 && trade.token_bought_amount > 0.0) {
                return Err(AnalysisError::InvalidTrade {
                    id: trade.id.clone(),
                    reason: "traded amounts must be positive".to_string(),
                });
            }
        }
        Ok(())
    }

    fn aggregate_fills<'a>(
        matches: &'a [MatchRecord],
        known: &HashSet<&str>,
    ) -> AnalysisResult<HashMap<&'a str, FillAggregate>> {
        let mut fills: HashMap<&str, FillAggregate> = HashMap::new();
        for fill in matches {
            for id in [fill.bid_id.as_str(), fill.ask_id.as_str()] {
                if !known.contains(id) {
                    return Err(AnalysisError::UnknownTrade(id.to_string()));
                }
                fills.entry(id).or_default().add(fill);
            }
        }
        Ok(fills)
    }

    fn index_expiries<'a>(
        expired: &'a [ExpiredOrder],
        known: &HashSet<&str>,
    ) -> AnalysisResult<HashMap<&'a str, Option<f64>>> {
        let mut expiries = HashMap::with_capacity(expired.len());
        for e in expired {
            if !known.contains(e.id.as_str()) {
                return Err(AnalysisError::UnknownTrade(e.id.clone()));
            }
            if expiries.insert(e.id.as_str(), e.ext_ref_price).is_some() {
                return Err(AnalysisError::InvalidTrade {
                    id: e.id.clone(),
                    reason: "expired more than once".to_string(),
                });
            }
        }
        Ok(expiries)
    }

    fn price_trade(
        trade: &Trade,
        base: &str,
        fills: Option<&FillAggregate>,
        expiry: Option<Option<f64>>,
    ) -> EnrichedTrade {
        let side = trade.side(base);
        let (amount_base, amount_quote) = fills.map_or((0.0, 0.0), |f| (f.amount_base, f.amount_quote));

        let filled = match side {
            TradeSide::Ask => amount_base,
            TradeSide::Bid => amount_quote,
        };
        let prop_matched = round_dec(filled / trade.token_sold_amount);

        // Quote per base for both sides
        let price_org = match side {
            TradeSide::Ask => trade.token_bought_amount / trade.token_sold_amount,
            TradeSide::Bid => trade.token_sold_amount / trade.token_bought_amount,
        };
        let price_matched = if amount_base > 0.0 {
            amount_quote / amount_base
        } else {
            0.0
        };

        let match_time_max = fills.and_then(|f| f.time_max);
        let match_time_wmean = fills.and_then(FillAggregate::time_wmean);

        let mut enriched = EnrichedTrade {
            trade: trade.clone(),
            side,
            is_matched: fills.is_some(),
            is_expired: expiry.is_some(),
            match_fills: fills.map_or(0, |f| f.fills),
            matched_amount_base: amount_base,
            matched_amount_quote: amount_quote,
            match_time_max,
            match_time_wmean,
            match_ext_ref_price_wmean: fills.and_then(FillAggregate::ref_wmean),
            match_ext_ref_price_last: fills.and_then(|f| f.ref_last).map(|(_, p)| p),
            expiry_ext_ref_price: expiry.flatten(),
            wait_time: match_time_max.map(|t| t - trade.block_time),
            wait_time_wmean: match_time_wmean.map(|t| t - trade.block_time as f64),
            prop_matched,
            price_org,
            price_matched,
            price_realized: 0.0,
            price_improvement: 0.0,
            gross_price_improvement: (amount_base > 0.0)
                .then(|| relative_gain(side, price_matched, price_org)),
            cost: None,
        };
        Self::realize(&mut enriched);
        enriched
    }

    /// Unmatched remainder executes at `price_org` at no cost
    fn realize(trade: &mut EnrichedTrade) {
        let prop = trade.prop_matched;
        trade.price_realized = prop * trade.price_matched + (1.0 - prop) * trade.price_org;
        trade.price_improvement =
            round_dec(relative_gain(trade.side, trade.price_realized, trade.price_org));
    }

    fn validate_proportions(&self, trades: &mut [EnrichedTrade]) -> AnalysisResult<()> {
        let mut violations = Violations::new();
        for trade in trades.iter_mut() {
            let prop = trade.prop_matched;
            if prop > 1.0 + self.epsilon || prop < -self.epsilon {
                violations.push(trade.id(), prop, "");
            } else if prop > 1.0 {
                trade.prop_matched = 1.0;
                Self::realize(trade);
            }
        }
        violations.into_error(|count, first_id, value, _| {
            AnalysisError::MatchedProportionOutOfBounds {
                count,
                first_id,
                value,
            }
        })
    }

    fn validate_improvements(&self, trades: &[EnrichedTrade]) -> AnalysisResult<()> {
        let mut violations = Violations::new();
        for trade in trades {
            if trade.price_improvement < -self.epsilon {
                violations.push(trade.id(), trade.price_improvement, "");
            }
        }
        violations.into_error(|count, first_id, value, _| AnalysisError::NegativePriceImprovement {
            count,
            first_id,
            value,
        })
    }

    /// Matching window in seconds for an unmatched trade
    fn window(trade: &Trade, options: &MatchingOptions) -> Option<i64> {
        match (options.time_limit, trade.max_match_time) {
            (Some(limit), Some(cap)) => Some(limit.min(cap)),
            (limit, cap) => limit.or(cap),
        }
    }

    fn apply_series_reference(
        &self,
        trades: &mut [EnrichedTrade],
        series: &[ReferencePricePoint],
        input: &EnrichmentInput<'_>,
    ) -> AnalysisResult<()> {
        let options = input.options;
        let inversed = series_orientation(series, &options.base_asset, &options.quote_asset)?;
        if input.inversed_prices.is_some_and(|flag| flag != inversed) {
            return Err(AnalysisError::InvalidPair {
                base: options.base_asset.clone(),
                quote: options.quote_asset.clone(),
                reason: "orientation flag disagrees with the reference series".to_string(),
            });
        }

        let ticks = ReferenceSeries::from_points(series);
        let tolerance = self.reference_tolerance_secs;
        let mut unresolved = Violations::new();
        let mut resolved = Vec::with_capacity(trades.len());

        for trade in trades.iter() {
            let Some(resolution_time) = trade
                .match_time_max
                .or_else(|| Self::window(&trade.trade, options).map(|w| trade.trade.block_time + w))
            else {
                unresolved.push(trade.id(), f64::NAN, "no fill and no matching window");
                continue;
            };

            let Some(reference) = ticks.price_at_or_after(resolution_time, tolerance) else {
                unresolved.push(
                    trade.id(),
                    resolution_time as f64,
                    format!("no reference price within {}s of t={}", tolerance, resolution_time),
                );
                continue;
            };

            let creation = trade
                .trade
                .creation_price
                .or_else(|| ticks.price_at_or_after(trade.trade.block_time, tolerance));
            let Some(creation) = creation else {
                unresolved.push(
                    trade.id(),
                    trade.trade.block_time as f64,
                    format!("no creation price within {}s of t={}", tolerance, trade.trade.block_time),
                );
                continue;
            };

            resolved.push((Some(resolution_time), reference, creation));
        }

        Self::unresolved_error(unresolved)?;

        for (trade, (resolution_time, reference, creation)) in trades.iter_mut().zip(resolved) {
            let offset = trade.trade.market_price_rel_offset.unwrap_or(1.0);
            let (reference, creation, offset) = if inversed {
                (1.0 / reference, 1.0 / creation, 1.0 / offset)
            } else {
                (reference, creation, offset)
            };
            trade.cost = Some(CostAdjusted::compute(trade, resolution_time, reference, creation, offset));
        }
        Ok(())
    }

    fn apply_fill_reference(
        &self,
        trades: &mut [EnrichedTrade],
        input: &EnrichmentInput<'_>,
    ) -> AnalysisResult<()> {
        let inversed = input
            .inversed_prices
            .ok_or_else(|| AnalysisError::UnresolvedOrientation {
                base: input.options.base_asset.clone(),
                quote: input.options.quote_asset.clone(),
            })?;

        let mut unresolved = Violations::new();
        let mut resolved = Vec::with_capacity(trades.len());

        for trade in trades.iter() {
            let prop = trade.prop_matched;
            let matched_part = if prop > 0.0 {
                trade.match_ext_ref_price_wmean.map(|p| prop * p)
            } else {
                Some(0.0)
            };
            let remainder_part = if prop < 1.0 {
                trade
                    .expiry_ext_ref_price
                    .or(trade.match_ext_ref_price_last)
                    .map(|p| (1.0 - prop) * p)
            } else {
                Some(0.0)
            };

            let (Some(matched_part), Some(remainder_part)) = (matched_part, remainder_part) else {
                unresolved.push(trade.id(), prop, "engine reported no reference price");
                continue;
            };
            let Some(creation) = trade.trade.creation_price else {
                unresolved.push(trade.id(), prop, "trade carries no creation price");
                continue;
            };
            resolved.push((matched_part + remainder_part, creation));
        }

        Self::unresolved_error(unresolved)?;

        // Engine prices are already in the job's orientation
        for (trade, (reference, creation)) in trades.iter_mut().zip(resolved) {
            let offset = trade.trade.market_price_rel_offset.unwrap_or(1.0);
            let (creation, offset) = if inversed {
                (1.0 / creation, 1.0 / offset)
            } else {
                (creation, offset)
            };
            trade.cost = Some(CostAdjusted::compute(trade, None, reference, creation, offset));
        }
        Ok(())
    }

    fn unresolved_error(unresolved: Violations) -> AnalysisResult<()> {
        unresolved.into_error(|count, first_id, _, reason| AnalysisError::ReferencePriceUnresolved {
            count,
            first_id,
            reason,
        })
    }
}
