// Trade records and the time-ordered dataset jobs select from

use crate::error::{AnalysisError, AnalysisResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Historical trade (intent) as supplied to the matching engine.
///
/// Amounts are in token units, `block_time` in unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub token_bought_address: String,
    pub token_sold_address: String,
    pub token_bought_amount: f64,
    pub token_sold_amount: f64,
    pub block_time: i64,
    pub amount_usd: f64,
    #[serde(default)]
    pub exact_out: Option<bool>,
    /// Per-trade cap on the matching window, seconds after `block_time`
    #[serde(default)]
    pub max_match_time: Option<i64>,
    /// Reference price observed at creation, in the stored series orientation
    #[serde(default)]
    pub creation_price: Option<f64>,
    /// Multiplier from the reference price to the price the trade would have
    /// executed at without a match
    #[serde(default)]
    pub market_price_rel_offset: Option<f64>,
}

impl Trade {
    pub fn new(
        id: impl Into<String>,
        token_bought_address: impl Into<String>,
        token_sold_address: impl Into<String>,
        token_bought_amount: f64,
        token_sold_amount: f64,
        block_time: i64,
        amount_usd: f64,
    ) -> Self {
        Self {
            id: id.into(),
            token_bought_address: token_bought_address.into(),
            token_sold_address: token_sold_address.into(),
            token_bought_amount,
            token_sold_amount,
            block_time,
            amount_usd,
            exact_out: None,
            max_match_time: None,
            creation_price: None,
            market_price_rel_offset: None,
        }
    }

    pub fn with_creation_price(mut self, price: f64) -> Self {
        self.creation_price = Some(price);
        self
    }

    pub fn with_rel_offset(mut self, offset: f64) -> Self {
        self.market_price_rel_offset = Some(offset);
        self
    }

    pub fn with_max_match_time(mut self, secs: i64) -> Self {
        self.max_match_time = Some(secs);
        self
    }

    pub fn with_exact_out(mut self, exact_out: bool) -> Self {
        self.exact_out = Some(exact_out);
        self
    }

    /// Both traded tokens belong to `{base, quote}`
    pub fn trades_pair(&self, base: &str, quote: &str) -> bool {
        let in_pair = |token: &str| token == base || token == quote;
        in_pair(&self.token_bought_address) && in_pair(&self.token_sold_address)
    }

    /// Side relative to a (base, quote) pair: selling base is an ask
    pub fn side(&self, base: &str) -> TradeSide {
        if self.token_sold_address == base {
            TradeSide::Ask
        } else {
            TradeSide::Bid
        }
    }

    pub fn is_exact_out(&self) -> bool {
        self.exact_out.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Ask,
    Bid,
}

impl TradeSide {
    pub fn is_ask(self) -> bool {
        matches!(self, TradeSide::Ask)
    }
}

/// Immutable view over trades, ordered by `block_time`.
///
/// Masks handed to jobs index into this ordering.
#[derive(Debug, Clone, Default)]
pub struct TradeDataset {
    trades: Vec<Trade>,
}

impl TradeDataset {
    pub fn new(mut trades: Vec<Trade>) -> Self {
        // Stable sort keeps input order for equal timestamps
        trades.sort_by_key(|t| t.block_time);
        Self { trades }
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Selection of trades whose bought and sold tokens are both in `{base, quote}`
    pub fn pair_mask(&self, base: &str, quote: &str) -> Vec<bool> {
        self.trades
            .iter()
            .map(|t| t.trades_pair(base, quote))
            .collect()
    }

    /// Trades selected by `mask`, in dataset order
    pub fn select(&self, mask: &[bool]) -> AnalysisResult<Vec<Trade>> {
        self.check_mask(mask)?;
        Ok(self
            .trades
            .iter()
            .zip(mask)
            .filter(|(_, &selected)| selected)
            .map(|(t, _)| t.clone())
            .collect())
    }

    pub fn check_mask(&self, mask: &[bool]) -> AnalysisResult<()> {
        if mask.len() != self.trades.len() {
            return Err(AnalysisError::MaskLength {
                expected: self.trades.len(),
                actual: mask.len(),
            });
        }
        Ok(())
    }

    /// First and last trade time
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.trades.first()?;
        let last = self.trades.last()?;
        Some((
            DateTime::from_timestamp(first.block_time, 0)?,
            DateTime::from_timestamp(last.block_time, 0)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> TradeDataset {
        TradeDataset::new(vec![
            Trade::new("late", "ETH", "USDC", 1.0, 1500.0, 30, 1500.0),
            Trade::new("early", "USDC", "ETH", 1500.0, 1.0, 10, 1500.0),
            Trade::new("other", "WBTC", "USDC", 1.0, 60000.0, 20, 60000.0),
        ])
    }

    #[test]
    fn test_dataset_is_time_ordered() {
        let ds = dataset();
        let ids: Vec<&str> = ds.trades().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "other", "late"]);
    }

    #[test]
    fn test_pair_mask_matches_either_direction() {
        let ds = dataset();
        assert_eq!(ds.pair_mask("ETH", "USDC"), vec![true, false, true]);
        assert_eq!(ds.pair_mask("USDC", "ETH"), vec![true, false, true]);
        assert_eq!(ds.pair_mask("WBTC", "ETH"), vec![false, false, false]);
    }

    #[test]
    fn test_select_rejects_wrong_mask_length() {
        let ds = dataset();
        let err = ds.select(&[true]).unwrap_err();
        assert!(matches!(err, AnalysisError::MaskLength { expected: 3, actual: 1 }));

        let selected = ds.select(&[false, true, false]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "other");
    }

    #[test]
    fn test_side_relative_to_base() {
        let ask = Trade::new("a", "USDC", "ETH", 1500.0, 1.0, 0, 1500.0);
        let bid = Trade::new("b", "ETH", "USDC", 1.0, 1500.0, 0, 1500.0);
        assert_eq!(ask.side("ETH"), TradeSide::Ask);
        assert_eq!(bid.side("ETH"), TradeSide::Bid);
    }

    #[test]
    fn test_time_range() {
        let ds = dataset();
        let (first, last) = ds.time_range().unwrap();
        assert_eq!(first.timestamp(), 10);
        assert_eq!(last.timestamp(), 30);
        assert!(TradeDataset::default().time_range().is_none());
    }
}
