// Integration tests for job statistics and outlier handling

mod common;

use common::*;
use match_analysis::analytics::partition_outliers;
use match_analysis::{
    AnalysisError, EnrichedTrade, EnrichmentEngine, EnrichmentInput, MatchesStats, Metric, Stat,
    StatsOptions, Weight,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

fn ids(trades: &[EnrichedTrade]) -> HashSet<String> {
    trades.iter().map(|t| t.id().to_string()).collect()
}

fn enriched_book() -> Vec<EnrichedTrade> {
    let trades = vec![
        ask("a1", 1.0, 1500.0, 0),
        bid("b1", 1.0, 1520.0, 0),
        ask("a2", 2.0, 1500.0, 10),
        bid("b2", 1.0, 1500.0, 12),
    ];
    let matches = vec![fill("b1", "a1", 1.0, 1510.0, 5), fill("b2", "a2", 1.0, 1500.0, 15)];
    let options = weth_usdc(Some(60));

    EnrichmentEngine::default()
        .enrich(&EnrichmentInput {
            trades: &trades,
            matches: &matches,
            expired_orders: &[],
            options: &options,
            reference: None,
            inversed_prices: None,
        })
        .unwrap()
}

#[test]
fn test_matches_stats_summary() {
    let enriched = enriched_book();
    let stats = MatchesStats::compute(&enriched, &StatsOptions::default()).unwrap();

    assert_eq!(stats.total_trades, 4);
    assert_eq!(stats.total_volume_traded, 1500.0 + 1520.0 + 3000.0 + 1500.0);
    assert_eq!(stats.rel_matches, 1.0);

    // a2 is half filled, everything else fully
    let matched_usd = 1500.0 + 1520.0 * (1510.0 / 1520.0) + 3000.0 * 0.5 + 1500.0;
    assert!((stats.rel_matched_vol - matched_usd / stats.total_volume_traded).abs() < 1e-12);

    // no reference price anywhere
    assert!(stats.pi_with_mkt_fallback.is_none());
    assert!(stats.eff_pi_with_mkt_fallback.is_none());
    assert!(stats.wait_cost.is_none());

    let matched_only = stats.pi_matched_only.unwrap();
    assert_eq!(matched_only.count, 4);
    assert!(stats.pi_no_fail_cost.mean > 0.0);
}

#[test]
fn test_matched_only_excludes_unfilled_trades() {
    let mut enriched = enriched_book();
    enriched.push(enriched_with_pi("idle", 0.0, 1000.0));
    let idle = enriched.last_mut().unwrap();
    idle.prop_matched = 0.0;
    idle.match_fills = 0;

    let stats = MatchesStats::compute(&enriched, &StatsOptions::default()).unwrap();
    assert_eq!(stats.pi_no_fail_cost.count, 5);
    assert_eq!(stats.pi_matched_only.unwrap().count, 4);
    assert!((stats.rel_matches - 0.8).abs() < 1e-12);
}

#[test]
fn test_gross_improvement_weighted_by_matched_notional() {
    let stats = MatchesStats::compute(&enriched_book(), &StatsOptions::default()).unwrap();
    let gross = stats.gross_pi.unwrap();

    // a1 and b1 cross at 1510, a2 and b2 at their shared limit
    let a1 = 1510.0 / 1500.0 - 1.0;
    let b1 = 1.0 - 1510.0 / 1520.0;
    let expected = (1500.0 * a1 + 1510.0 * b1) / (1500.0 + 1510.0 + 1500.0 + 1500.0);
    assert_eq!(gross.count, 4);
    assert!((gross.weighted_mean - expected).abs() < 1e-12);
}

#[test]
fn test_unmatched_wait_cost_over_partial_and_idle_trades() {
    let trades = vec![
        ask("a1", 1.0, 1500.0, 0),
        bid("b1", 1.0, 1500.0, 0),
        ask("a2", 2.0, 1500.0, 0),
        bid("b2", 1.0, 1500.0, 0),
        ask("idle", 1.0, 1600.0, 0),
    ];
    let matches = vec![fill("b1", "a1", 1.0, 1500.0, 10), fill("b2", "a2", 1.0, 1500.0, 20)];
    let options = weth_usdc(Some(60));
    let prices = weth_prices(&[(0, 1500.0), (10, 1490.0), (20, 1480.0), (60, 1450.0)]);

    let enriched = EnrichmentEngine::default()
        .enrich(&EnrichmentInput {
            trades: &trades,
            matches: &matches,
            expired_orders: &[],
            options: &options,
            reference: Some(prices.as_slice()),
            inversed_prices: None,
        })
        .unwrap();
    let stats = MatchesStats::compute(&enriched, &StatsOptions::default()).unwrap();
    let unmatched = stats.wait_cost_unmatched.unwrap();

    // only a2 (half filled, resolved at 20) and idle (window end at 60) have a remainder
    let a2 = 1.0 - 1480.0 / 1500.0;
    let idle = 1.0 - 1450.0 / 1500.0;
    assert_eq!(unmatched.count, 2);
    assert!((unmatched.mean - (a2 + idle) / 2.0).abs() < 1e-12);
    let expected = (1500.0 * a2 + 1600.0 * idle) / (1500.0 + 1600.0);
    assert!((unmatched.weighted_mean - expected).abs() < 1e-12);

    assert_eq!(stats.wait_cost.unwrap().count, 5);
}

#[test]
fn test_empty_selection_is_an_error() {
    let err = MatchesStats::compute(&[], &StatsOptions::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::EmptySelection(_)));
}

#[test]
fn test_weights() {
    let mut trade = enriched_with_pi("t", 0.01, 200.0);
    trade.prop_matched = 0.25;
    assert_eq!(Weight::Notional.value(&trade), 200.0);
    assert_eq!(Weight::MatchedNotional.value(&trade), 50.0);
    assert_eq!(Weight::UnmatchedNotional.value(&trade), 150.0);
    assert_eq!(Metric::PriceImprovement.value(&trade), Some(0.01));
    assert_eq!(Metric::WaitCost.value(&trade), None);
}

#[test]
fn test_outliers_reported_without_trimming() {
    let mut trades: Vec<EnrichedTrade> = (0..9)
        .map(|i| enriched_with_pi(&format!("t{}", i), 0.001 * i as f64, 100.0))
        .collect();
    trades.push(enriched_with_pi("spike", 0.5, 100.0));

    let stats = MatchesStats::compute(&trades, &StatsOptions::default()).unwrap();
    assert_eq!(stats.total_trades, 10);
    assert_eq!(stats.outlier_count(), 1);
    assert_eq!(stats.outliers[0].id(), "spike");
    assert_eq!(stats.outlier_ids(), vec!["spike".to_string()]);

    let trimmed = MatchesStats::compute(&trades, &StatsOptions::default().trimmed()).unwrap();
    assert_eq!(trimmed.total_trades, 9);
    assert_eq!(trimmed.outlier_count(), 1);
    assert!(trimmed.pi_no_fail_cost.mean < stats.pi_no_fail_cost.mean);
}

#[test]
fn test_outlier_partition_is_exact() {
    let mut rng = StdRng::seed_from_u64(1234);

    for round in 0..50 {
        let n = rng.gen_range(1..60);
        let trades: Vec<EnrichedTrade> = (0..n)
            .map(|i| {
                let pi = if rng.gen_bool(0.1) {
                    rng.gen_range(0.05..0.5)
                } else {
                    rng.gen_range(0.0..0.01)
                };
                enriched_with_pi(&format!("r{}-{}", round, i), pi, rng.gen_range(10.0..1e5))
            })
            .collect();

        let (kept, outliers) = partition_outliers(&trades, 1.5);
        let (kept_ids, outlier_ids) = (ids(&kept), ids(&outliers));

        assert_eq!(kept.len() + outliers.len(), trades.len());
        assert!(kept_ids.is_disjoint(&outlier_ids));
        assert_eq!(&kept_ids | &outlier_ids, ids(&trades));
    }
}

#[test]
fn test_stat_over_metric() {
    let trades = vec![
        enriched_with_pi("a", 0.001, 100.0),
        enriched_with_pi("b", 0.003, 300.0),
    ];
    let stat = Stat::from_trades(&trades, Metric::PriceImprovement, Weight::Notional).unwrap();
    assert!((stat.mean - 0.002).abs() < 1e-15);
    assert!((stat.weighted_mean - 0.0025).abs() < 1e-15);
    assert_eq!(stat.count, 2);
    assert!(Stat::from_trades(&trades, Metric::WaitCost, Weight::Notional).is_none());
}
