// Common test utilities and helpers
#![allow(dead_code)]

use match_analysis::{
    EnrichedTrade, ExpiredOrder, MatchRecord, MatchingOptions, ReferencePricePoint, Trade,
    TradeSide,
};
use rand::Rng;

pub const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
pub const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const WBTC: &str = "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599";

/// Sell `base_amount` WETH for USDC at `price`
pub fn ask(id: &str, base_amount: f64, price: f64, block_time: i64) -> Trade {
    let quote_amount = base_amount * price;
    Trade::new(id, USDC, WETH, quote_amount, base_amount, block_time, quote_amount)
}

/// Buy `base_amount` WETH with USDC at `price`
pub fn bid(id: &str, base_amount: f64, price: f64, block_time: i64) -> Trade {
    let quote_amount = base_amount * price;
    Trade::new(id, WETH, USDC, base_amount, quote_amount, block_time, quote_amount)
}

pub fn fill(bid_id: &str, ask_id: &str, amount: f64, price: f64, timestamp: i64) -> MatchRecord {
    MatchRecord {
        bid_id: bid_id.to_string(),
        ask_id: ask_id.to_string(),
        amount,
        price,
        timestamp,
        ext_ref_price: None,
    }
}

pub fn expired(id: &str, ext_ref_price: Option<f64>) -> ExpiredOrder {
    ExpiredOrder {
        id: id.to_string(),
        ext_ref_price,
    }
}

/// WETH/USDC matching with the given window
pub fn weth_usdc(time_limit: Option<i64>) -> MatchingOptions {
    MatchingOptions {
        base_asset: WETH.to_string(),
        quote_asset: USDC.to_string(),
        time_limit,
        min_delta: None,
        batch_duration: 0,
    }
}

/// WETH priced in USDC at each (time, price)
pub fn weth_prices(ticks: &[(i64, f64)]) -> Vec<ReferencePricePoint> {
    ticks
        .iter()
        .map(|&(t, p)| ReferencePricePoint::new(WETH, USDC, p, t))
        .collect()
}

/// The same ticks stored the other way round, as USDC priced in WETH
pub fn inverted_weth_prices(ticks: &[(i64, f64)]) -> Vec<ReferencePricePoint> {
    ticks
        .iter()
        .map(|&(t, p)| ReferencePricePoint::new(USDC, WETH, 1.0 / p, t))
        .collect()
}

/// Crossing asks and bids with fills priced between their limits
pub fn random_book(rng: &mut impl Rng, pairs: usize) -> (Vec<Trade>, Vec<MatchRecord>) {
    let mut trades = Vec::with_capacity(pairs * 2);
    let mut fills = Vec::new();

    for i in 0..pairs {
        let ask_id = format!("ask-{}", i);
        let bid_id = format!("bid-{}", i);
        let ask_price = rng.gen_range(1400.0..1500.0);
        let bid_price = ask_price + rng.gen_range(0.0..50.0);
        let ask_size = rng.gen_range(0.1..5.0);
        let bid_size = rng.gen_range(0.1..5.0);
        let t = i as i64 * 12;

        trades.push(ask(&ask_id, ask_size, ask_price, t));
        trades.push(bid(&bid_id, bid_size, bid_price, t + 1));

        match rng.gen_range(0..3) {
            0 => {}
            1 => {
                let amount = f64::min(ask_size, bid_size);
                fills.push(fill(&bid_id, &ask_id, amount, bid_price, t + 5));
            }
            _ => {
                let amount = f64::min(ask_size, bid_size) * rng.gen_range(0.1..1.0);
                let price = rng.gen_range(ask_price..=bid_price);
                fills.push(fill(&bid_id, &ask_id, amount, price, t + 5));
            }
        }
    }

    (trades, fills)
}

/// Bare enriched trade carrying only a price improvement and notional
pub fn enriched_with_pi(id: &str, price_improvement: f64, amount_usd: f64) -> EnrichedTrade {
    EnrichedTrade {
        trade: Trade::new(id, USDC, WETH, amount_usd, 1.0, 0, amount_usd),
        side: TradeSide::Ask,
        is_matched: true,
        is_expired: false,
        match_fills: 1,
        matched_amount_base: 1.0,
        matched_amount_quote: amount_usd,
        match_time_max: Some(0),
        match_time_wmean: Some(0.0),
        match_ext_ref_price_wmean: None,
        match_ext_ref_price_last: None,
        expiry_ext_ref_price: None,
        wait_time: Some(0),
        wait_time_wmean: Some(0.0),
        prop_matched: 1.0,
        price_org: amount_usd,
        price_matched: amount_usd,
        price_realized: amount_usd,
        price_improvement,
        gross_price_improvement: Some(price_improvement),
        cost: None,
    }
}
