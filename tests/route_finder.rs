// SPDX-License-Identifier: MIT

mod common;

use common::{MockAggregator, MockPools, asset, units};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use swapflow::domain::error::{AppError, ErrorKind};
use swapflow::domain::types::Venue;
use swapflow::swap::RouteFinder;
use swapflow::swap::ports::{PoolQuoter, QuoteSource};

const TIERS: [u32; 3] = [500, 3_000, 10_000];

fn finder(
    aggregator: Option<Arc<MockAggregator>>,
    pools: Arc<MockPools>,
    intermediates: &[(&str, u8)],
) -> RouteFinder {
    RouteFinder::new(
        aggregator.map(|a| a as Arc<dyn QuoteSource>),
        pools as Arc<dyn PoolQuoter>,
        TIERS.to_vec(),
        intermediates.iter().map(|(s, d)| asset(s, *d)).collect(),
    )
}

#[tokio::test]
async fn direct_quote_picks_the_highest_output_tier() {
    // 0.05% tier returns more than 0.3%.
    let pools = Arc::new(
        MockPools::new()
            .with_rate("WETH", "USDC", 500, 119_880_000, 1_000_000_000_000_000_000)
            .with_rate("WETH", "USDC", 3_000, 119_000_000, 1_000_000_000_000_000_000),
    );
    let finder = finder(None, pools, &[]);

    let quote = finder
        .best_quote(&asset("WETH", 18), &asset("USDC", 6), units(1, 18))
        .await
        .unwrap();

    assert_eq!(quote.amount_out, units(119_880_000, 0));
    assert_eq!(quote.route.hops()[0].venue, Venue::Pool { fee_tier: 500 });
    assert_eq!(quote.fee_bps, 5);
    assert!(!quote.route.is_multi_hop());
}

#[tokio::test]
async fn equal_outputs_keep_the_first_enumerated_tier() {
    let pools = Arc::new(
        MockPools::new()
            .with_rate("WETH", "USDC", 500, 120_000_000, 1_000_000_000_000_000_000)
            .with_rate("WETH", "USDC", 3_000, 120_000_000, 1_000_000_000_000_000_000),
    );
    let finder = finder(None, pools, &[]);

    let quote = finder
        .best_quote(&asset("WETH", 18), &asset("USDC", 6), units(1, 18))
        .await
        .unwrap();

    assert_eq!(quote.route.hops()[0].venue, Venue::Pool { fee_tier: 500 });
}

#[tokio::test]
async fn aggregator_wins_when_it_answers() {
    let aggregator = Arc::new(
        MockAggregator::new().with_rate("WETH", "USDC", 121_000_000, 1_000_000_000_000_000_000),
    );
    let pools = Arc::new(
        MockPools::new().with_rate("WETH", "USDC", 500, 120_000_000, 1_000_000_000_000_000_000),
    );
    let finder = finder(Some(aggregator), pools.clone(), &[]);

    let quote = finder
        .best_quote(&asset("WETH", 18), &asset("USDC", 6), units(1, 18))
        .await
        .unwrap();

    assert!(matches!(
        &quote.route.hops()[0].venue,
        Venue::Aggregator(name) if name == "mockagg"
    ));
    assert_eq!(quote.fee_bps, 0);
    // Direct pools are never consulted once the aggregator answered.
    assert_eq!(pools.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn aggregator_failure_falls_back_to_pools() {
    let aggregator = Arc::new(MockAggregator::new());
    let pools = Arc::new(
        MockPools::new().with_rate("WETH", "USDC", 500, 120_000_000, 1_000_000_000_000_000_000),
    );
    let finder = finder(Some(aggregator.clone()), pools, &[]);

    let quote = finder
        .best_quote(&asset("WETH", 18), &asset("USDC", 6), units(1, 18))
        .await
        .unwrap();

    assert_eq!(aggregator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(quote.route.hops()[0].venue, Venue::Pool { fee_tier: 500 });
}

#[tokio::test]
async fn two_hop_route_chains_leg_outputs_and_sums_fees() {
    // No direct USDC/TOKEN pool at any tier; WETH bridges.
    // 100 USDC -> 0.833 WETH -> 833 TOKEN-ish via exact linear rates.
    let pools = Arc::new(
        MockPools::new()
            .with_rate("USDC", "WETH", 500, 8_333, 1_000_000_000) // 6 -> 18 decimals
            .with_rate("WETH", "TOKEN", 3_000, 999, 1_000),
    );
    let finder = finder(None, pools, &[("WETH", 18)]);

    let amount_in = units(100, 6);
    let quote = finder
        .best_quote(&asset("USDC", 6), &asset("TOKEN", 18), amount_in)
        .await
        .unwrap();

    assert!(quote.route.is_multi_hop());
    assert_eq!(quote.route.intermediate().unwrap().symbol, "WETH");
    let leg1_out = amount_in * units(8_333, 0) / units(1_000_000_000, 0);
    let expected = leg1_out * units(999, 0) / units(1_000, 0);
    assert_eq!(quote.amount_out, expected);
    assert_eq!(quote.fee_bps, 5 + 30);
}

#[tokio::test]
async fn intermediate_matching_an_endpoint_is_skipped() {
    // WETH is the only configured intermediate but also the source; the
    // degenerate WETH->WETH->USDC path must not be considered.
    let pools = Arc::new(
        MockPools::new().with_rate("WETH", "USDC", 500, 120_000_000, 1_000_000_000_000_000_000),
    );
    let finder = finder(None, pools, &[("WETH", 18)]);

    let quote = finder
        .best_quote(&asset("WETH", 18), &asset("USDC", 6), units(1, 18))
        .await
        .unwrap();
    assert!(!quote.route.is_multi_hop());
}

#[tokio::test]
async fn unroutable_pair_reports_no_route() {
    let finder = finder(None, Arc::new(MockPools::new()), &[("WETH", 18)]);

    let err = finder
        .best_quote(&asset("USDC", 6), &asset("TOKEN", 18), units(100, 6))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NoRouteFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NoRouteFound);
}

#[tokio::test]
async fn repeated_queries_return_identical_quotes() {
    let pools = Arc::new(
        MockPools::new()
            .with_rate("USDC", "WETH", 500, 8_333, 1_000_000_000)
            .with_rate("WETH", "TOKEN", 3_000, 999, 1_000),
    );
    let finder = finder(None, pools, &[("WETH", 18)]);

    let first = finder
        .best_quote(&asset("USDC", 6), &asset("TOKEN", 18), units(100, 6))
        .await
        .unwrap();
    let second = finder
        .best_quote(&asset("USDC", 6), &asset("TOKEN", 18), units(100, 6))
        .await
        .unwrap();
    assert_eq!(first, second);
}
