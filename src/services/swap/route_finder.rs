// SPDX-License-Identifier: MIT

use crate::domain::error::AppError;
use crate::domain::types::{AssetRef, Quote, Route, Venue};
use crate::services::swap::ports::{PoolQuoter, QuoteSource};
use alloy::primitives::U256;
use std::sync::Arc;

/// Selects the best available route for a pair: aggregator first, then
/// direct pools across the configured fee tiers, then two-hop paths
/// through the configured intermediates. First strategy to succeed wins.
pub struct RouteFinder {
    aggregator: Option<Arc<dyn QuoteSource>>,
    pools: Arc<dyn PoolQuoter>,
    fee_tiers: Vec<u32>,
    intermediates: Vec<AssetRef>,
}

impl RouteFinder {
    pub fn new(
        aggregator: Option<Arc<dyn QuoteSource>>,
        pools: Arc<dyn PoolQuoter>,
        fee_tiers: Vec<u32>,
        intermediates: Vec<AssetRef>,
    ) -> Self {
        Self {
            aggregator,
            pools,
            fee_tiers,
            intermediates,
        }
    }

    pub async fn best_quote(
        &self,
        source: &AssetRef,
        dest: &AssetRef,
        amount_in: U256,
    ) -> Result<Quote, AppError> {
        // 1. Aggregator, when configured. Its quote bundles venue-shopping
        // and fees; no further decomposition here.
        if let Some(aggregator) = &self.aggregator {
            match aggregator.quote(source, dest, amount_in).await {
                Ok(quote) => {
                    tracing::debug!(
                        target: "router",
                        provider = aggregator.name(),
                        route = %quote.description(),
                        amount_out = %quote.amount_out,
                        "Route selected via aggregator"
                    );
                    return Ok(quote);
                }
                Err(e) => {
                    tracing::debug!(
                        target: "router",
                        provider = aggregator.name(),
                        error = %e,
                        "Aggregator unavailable, falling back to direct pools"
                    );
                }
            }
        }

        // 2. Direct pool across fee tiers.
        if let Ok(quote) = self.best_direct(source, dest, amount_in).await {
            return Ok(quote);
        }

        // 3. Two-hop through an intermediate.
        if let Some(quote) = self.best_two_hop(source, dest, amount_in).await {
            tracing::debug!(
                target: "router",
                route = %quote.description(),
                amount_out = %quote.amount_out,
                "Route selected via intermediate"
            );
            return Ok(quote);
        }

        Err(AppError::NoRouteFound {
            src: source.symbol.clone(),
            dest: dest.symbol.clone(),
        })
    }

    /// Best direct pool quote. Per-tier failures mean the pool is absent at
    /// that tier and are discarded; ties keep the first enumerated tier.
    pub async fn best_direct(
        &self,
        source: &AssetRef,
        dest: &AssetRef,
        amount_in: U256,
    ) -> Result<Quote, AppError> {
        let mut best: Option<(u32, U256)> = None;
        for &tier in &self.fee_tiers {
            match self
                .pools
                .quote_fee_tier(source, dest, amount_in, tier)
                .await
            {
                Ok(amount_out) if !amount_out.is_zero() => {
                    if best.map(|(_, b)| amount_out > b).unwrap_or(true) {
                        best = Some((tier, amount_out));
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::trace!(
                        target: "router",
                        tier,
                        error = %e,
                        "No pool at fee tier"
                    );
                }
            }
        }

        let (fee_tier, amount_out) = best.ok_or_else(|| AppError::QuoteUnavailable {
            src: source.symbol.clone(),
            dest: dest.symbol.clone(),
            reason: "no direct pool at any configured fee tier".to_string(),
        })?;
        let route = Route::direct(source.clone(), dest.clone(), Venue::Pool { fee_tier });
        Ok(Quote::shape(route, amount_in, amount_out, fee_tier / 100))
    }

    /// Two-hop search: the second leg is fed the first leg's exact output;
    /// fee and impact are the sums of the legs. One failed leg disqualifies
    /// that intermediate.
    async fn best_two_hop(
        &self,
        source: &AssetRef,
        dest: &AssetRef,
        amount_in: U256,
    ) -> Option<Quote> {
        let mut best: Option<Quote> = None;
        for mid in &self.intermediates {
            if mid == source || mid == dest {
                continue;
            }
            let Ok(first) = self.best_direct(source, mid, amount_in).await else {
                continue;
            };
            let Ok(second) = self.best_direct(mid, dest, first.amount_out).await else {
                continue;
            };

            let Some(route) = Route::two_hop(
                source.clone(),
                mid.clone(),
                dest.clone(),
                first.route.hops()[0].venue.clone(),
                second.route.hops()[0].venue.clone(),
            ) else {
                continue;
            };
            let candidate = Quote {
                route,
                amount_in,
                amount_out: second.amount_out,
                fee_bps: first.fee_bps + second.fee_bps,
                price_impact_pct: first.price_impact_pct + second.price_impact_pct,
            };
            if best
                .as_ref()
                .map(|b| candidate.amount_out > b.amount_out)
                .unwrap_or(true)
            {
                best = Some(candidate);
            }
        }
        best
    }
}
