// External reference prices indexed by token pair and orientation

use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One observation of the external market price of `base_token` in `quote_token`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePricePoint {
    pub base_token: String,
    pub quote_token: String,
    pub price: f64,
    #[serde(alias = "timestamp")]
    pub block_time: i64,
}

impl ReferencePricePoint {
    pub fn new(
        base_token: impl Into<String>,
        quote_token: impl Into<String>,
        price: f64,
        block_time: i64,
    ) -> Self {
        Self {
            base_token: base_token.into(),
            quote_token: quote_token.into(),
            price,
            block_time,
        }
    }

    fn is_pair(&self, base: &str, quote: &str) -> bool {
        self.base_token == base && self.quote_token == quote
    }
}

/// Price update as the matching engine consumes it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub price: f64,
    pub timestamp: i64,
}

/// Reference prices grouped by base token, then quote token, each leaf time-ordered
pub type ReferenceFeed = BTreeMap<String, BTreeMap<String, Vec<PriceUpdate>>>;

/// Index over reference price points.
///
/// Each pair is stored in exactly one orientation; queries in the other
/// orientation report `is_inversed == true` and never rewrite the stored data.
#[derive(Debug, Clone)]
pub struct PriceReferenceIndex {
    points: Vec<ReferencePricePoint>,
    pairs: HashSet<(String, String)>,
}

impl PriceReferenceIndex {
    pub fn new(mut points: Vec<ReferencePricePoint>) -> AnalysisResult<Self> {
        points.sort_by_key(|p| p.block_time);

        let pairs: HashSet<(String, String)> = points
            .iter()
            .map(|p| (p.base_token.clone(), p.quote_token.clone()))
            .collect();

        for (base, quote) in &pairs {
            if pairs.contains(&(quote.clone(), base.clone())) {
                return Err(AnalysisError::ConflictingOrientation {
                    base: base.clone(),
                    quote: quote.clone(),
                });
            }
        }

        Ok(Self { points, pairs })
    }

    pub fn points(&self) -> &[ReferencePricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True if the pair is stored as quote→base rather than base→quote
    pub fn is_inversed(&self, base: &str, quote: &str) -> AnalysisResult<bool> {
        if self.pairs.contains(&(base.to_string(), quote.to_string())) {
            Ok(false)
        } else if self.pairs.contains(&(quote.to_string(), base.to_string())) {
            Ok(true)
        } else {
            Err(AnalysisError::UnresolvedOrientation {
                base: base.to_string(),
                quote: quote.to_string(),
            })
        }
    }

    /// Selection over `points()` covering any requested pair in either token order
    pub fn mask_for_pairs<'a, I>(&self, pairs: I) -> Vec<bool>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let wanted: HashSet<(&str, &str)> = pairs
            .into_iter()
            .flat_map(|(a, b)| [(a, b), (b, a)])
            .collect();

        self.points
            .iter()
            .map(|p| wanted.contains(&(p.base_token.as_str(), p.quote_token.as_str())))
            .collect()
    }

    /// Time-ordered points for one pair, in whichever orientation it is stored
    pub fn series_for(&self, base: &str, quote: &str) -> Vec<ReferencePricePoint> {
        self.points
            .iter()
            .zip(self.mask_for_pairs([(base, quote)]))
            .filter(|(_, selected)| *selected)
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Engine feed restricted to the requested pairs
    pub fn feed_for_pairs<'a, I>(&self, pairs: I) -> ReferenceFeed
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut feed = ReferenceFeed::new();
        let mask = self.mask_for_pairs(pairs);

        for (point, _) in self.points.iter().zip(mask).filter(|(_, selected)| *selected) {
            feed.entry(point.base_token.clone())
                .or_default()
                .entry(point.quote_token.clone())
                .or_default()
                .push(PriceUpdate {
                    price: point.price,
                    timestamp: point.block_time,
                });
        }

        feed
    }
}

/// Orientation of a single-pair series relative to (base, quote).
///
/// Every point must carry the pair in the same orientation.
pub fn series_orientation(
    points: &[ReferencePricePoint],
    base: &str,
    quote: &str,
) -> AnalysisResult<bool> {
    let invalid = |reason: &str| AnalysisError::InvalidPair {
        base: base.to_string(),
        quote: quote.to_string(),
        reason: reason.to_string(),
    };

    if points.is_empty() {
        return Err(invalid("reference series is empty"));
    }
    if points.iter().all(|p| p.is_pair(base, quote)) {
        Ok(false)
    } else if points.iter().all(|p| p.is_pair(quote, base)) {
        Ok(true)
    } else {
        Err(invalid("reference series mixes pairs or orientations"))
    }
}

/// Sorted (time, price) series supporting a forward-looking nearest-time lookup
#[derive(Debug, Clone)]
pub struct ReferenceSeries {
    ticks: Vec<(i64, f64)>,
}

impl ReferenceSeries {
    pub fn from_points(points: &[ReferencePricePoint]) -> Self {
        let mut ticks: Vec<(i64, f64)> = points.iter().map(|p| (p.block_time, p.price)).collect();
        ticks.sort_by_key(|&(t, _)| t);
        Self { ticks }
    }

    /// First price observed at or after `time`, no later than `time + tolerance`
    pub fn price_at_or_after(&self, time: i64, tolerance: i64) -> Option<f64> {
        let idx = self.ticks.partition_point(|&(t, _)| t < time);
        self.ticks
            .get(idx)
            .filter(|&&(t, _)| t - time <= tolerance)
            .map(|&(_, price)| price)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Vec<ReferencePricePoint> {
        vec![
            ReferencePricePoint::new("ETH", "USDC", 1510.0, 20),
            ReferencePricePoint::new("ETH", "USDC", 1500.0, 10),
            ReferencePricePoint::new("USDC", "WBTC", 1.0 / 60000.0, 15),
        ]
    }

    #[test]
    fn test_is_inversed() {
        let index = PriceReferenceIndex::new(points()).unwrap();
        assert!(!index.is_inversed("ETH", "USDC").unwrap());
        assert!(index.is_inversed("WBTC", "USDC").unwrap());
        assert!(matches!(
            index.is_inversed("ETH", "DAI"),
            Err(AnalysisError::UnresolvedOrientation { .. })
        ));
    }

    #[test]
    fn test_conflicting_orientation_rejected() {
        let mut pts = points();
        pts.push(ReferencePricePoint::new("USDC", "ETH", 1.0 / 1500.0, 30));
        assert!(matches!(
            PriceReferenceIndex::new(pts),
            Err(AnalysisError::ConflictingOrientation { .. })
        ));
    }

    #[test]
    fn test_mask_for_pairs_either_order() {
        let index = PriceReferenceIndex::new(points()).unwrap();
        // sorted: (10 ETH/USDC), (15 USDC/WBTC), (20 ETH/USDC)
        assert_eq!(index.mask_for_pairs([("USDC", "ETH")]), vec![true, false, true]);
        assert_eq!(index.mask_for_pairs([("WBTC", "USDC")]), vec![false, true, false]);
    }

    #[test]
    fn test_feed_grouped_by_base_then_quote() {
        let index = PriceReferenceIndex::new(points()).unwrap();
        let feed = index.feed_for_pairs([("ETH", "USDC"), ("WBTC", "USDC")]);

        let eth = &feed["ETH"]["USDC"];
        assert_eq!(eth.len(), 2);
        assert!(eth[0].timestamp < eth[1].timestamp);
        assert_eq!(feed["USDC"]["WBTC"].len(), 1);
    }

    #[test]
    fn test_series_orientation() {
        let index = PriceReferenceIndex::new(points()).unwrap();
        let series = index.series_for("USDC", "ETH");
        assert!(series_orientation(&series, "USDC", "ETH").unwrap());
        assert!(!series_orientation(&series, "ETH", "USDC").unwrap());
        assert!(series_orientation(index.points(), "ETH", "USDC").is_err());
    }

    #[test]
    fn test_forward_lookup_with_tolerance() {
        let series = ReferenceSeries::from_points(&points());
        assert_eq!(series.price_at_or_after(10, 0), Some(1500.0));
        assert_eq!(series.price_at_or_after(11, 4), Some(1.0 / 60000.0));
        assert_eq!(series.price_at_or_after(16, 3), None);
        assert_eq!(series.price_at_or_after(16, 4), Some(1510.0));
        assert_eq!(series.price_at_or_after(21, 1000), None);
    }
}
