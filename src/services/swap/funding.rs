// SPDX-License-Identifier: MIT

use crate::domain::constants::{BPS_DENOMINATOR, to_common_scale};
use crate::domain::error::AppError;
use crate::domain::types::{AssetRef, BalanceSnapshot, FundingPlan, Quote};
use crate::services::swap::route_finder::RouteFinder;
use alloy::primitives::U256;
use std::sync::Arc;

/// Searches the user's other holdings for the cheapest way to cover a
/// shortfall in the required asset. Greedy: candidates are evaluated
/// independently, multiple sources are never combined.
pub struct FundingPlanner {
    route_finder: Arc<RouteFinder>,
    /// Candidate symbols tried first (native asset and stables/LSTs).
    priority: Vec<String>,
    native_symbol: Option<String>,
    /// Native balance held back for gas, never offered for swapping.
    gas_reserve: U256,
    safety_margin_bps: u64,
}

struct Accepted {
    source: AssetRef,
    source_amount: U256,
    expected_output: U256,
    /// Source amount on the common 18-decimals scale, for the
    /// cheapest-candidate comparison across assets.
    normalized_cost: U256,
}

impl FundingPlanner {
    pub fn new(
        route_finder: Arc<RouteFinder>,
        priority: Vec<String>,
        native_symbol: Option<String>,
        gas_reserve: U256,
        safety_margin_bps: u64,
    ) -> Self {
        Self {
            route_finder,
            priority,
            native_symbol,
            gas_reserve,
            safety_margin_bps,
        }
    }

    /// Two-pass search: a rough quote at the candidate's full spendable
    /// balance fixes an exchange rate, the shortfall is inverse-scaled
    /// (plus safety margin) into a source estimate, and a precise quote at
    /// exactly that estimate must cover the shortfall for acceptance.
    pub async fn plan(
        &self,
        required: &AssetRef,
        required_amount: U256,
        balances: &BalanceSnapshot,
        holdings: &[AssetRef],
    ) -> Result<FundingPlan, AppError> {
        let held = balances.amount_of(&required.symbol);
        if held >= required_amount {
            tracing::debug!(
                target: "funding",
                asset = %required.symbol,
                held = %held,
                required = %required_amount,
                "Balance already sufficient"
            );
            return Ok(FundingPlan::sufficient());
        }
        let shortfall = required_amount - held;

        let mut best: Option<Accepted> = None;
        let mut any_unaffordable = false;

        for candidate in self.candidate_order(required, balances, holdings) {
            let spendable = self.spendable_balance(&candidate, balances);
            if spendable.is_zero() {
                continue;
            }

            // First pass: rough rate at the full spendable balance.
            let rough = match self
                .route_finder
                .best_quote(&candidate, required, spendable)
                .await
            {
                Ok(q) => q,
                Err(e) => {
                    tracing::debug!(
                        target: "funding",
                        candidate = %candidate.symbol,
                        error = %e,
                        "Candidate not routable, skipping"
                    );
                    continue;
                }
            };
            if rough.amount_out.is_zero() {
                continue;
            }

            let Some(estimate) = self.estimate_source_amount(shortfall, spendable, &rough) else {
                continue;
            };
            if estimate > spendable {
                tracing::debug!(
                    target: "funding",
                    candidate = %candidate.symbol,
                    estimate = %estimate,
                    spendable = %spendable,
                    "Candidate balance cannot cover the estimate"
                );
                any_unaffordable = true;
                continue;
            }

            // Second pass: precise quote at exactly the estimated amount.
            let precise = match self
                .route_finder
                .best_quote(&candidate, required, estimate)
                .await
            {
                Ok(q) => q,
                Err(_) => continue,
            };
            if precise.amount_out < shortfall {
                tracing::debug!(
                    target: "funding",
                    candidate = %candidate.symbol,
                    output = %precise.amount_out,
                    shortfall = %shortfall,
                    "Precise quote falls short, rejecting candidate"
                );
                continue;
            }

            let normalized_cost = to_common_scale(estimate, candidate.decimals);
            let cheaper = best
                .as_ref()
                .map(|b| normalized_cost < b.normalized_cost)
                .unwrap_or(true);
            if cheaper {
                best = Some(Accepted {
                    source: candidate,
                    source_amount: estimate,
                    expected_output: precise.amount_out,
                    normalized_cost,
                });
            }
        }

        match best {
            Some(accepted) => {
                tracing::info!(
                    target: "funding",
                    source = %accepted.source.symbol,
                    source_amount = %accepted.source_amount,
                    expected_output = %accepted.expected_output,
                    shortfall = %shortfall,
                    "Funding plan selected"
                );
                Ok(FundingPlan::funded(
                    shortfall,
                    accepted.source,
                    accepted.source_amount,
                    accepted.expected_output,
                ))
            }
            None if any_unaffordable => Err(AppError::InsufficientBalance {
                required: format!("{shortfall} {}", required.symbol),
                available: balances.summary(),
            }),
            None => Err(AppError::NoFundingPath {
                asset: required.symbol.clone(),
                shortfall: shortfall.to_string(),
                balances: balances.summary(),
            }),
        }
    }

    /// Priority symbols first, in configured order, then every other
    /// positive-balance holding in symbol order. The required asset is
    /// never a candidate for funding itself.
    fn candidate_order(
        &self,
        required: &AssetRef,
        balances: &BalanceSnapshot,
        holdings: &[AssetRef],
    ) -> Vec<AssetRef> {
        let mut ordered: Vec<AssetRef> = Vec::new();
        for symbol in &self.priority {
            if symbol.eq_ignore_ascii_case(&required.symbol) {
                continue;
            }
            if let Some(asset) = holdings
                .iter()
                .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
            {
                if !balances.amount_of(&asset.symbol).is_zero() {
                    ordered.push(asset.clone());
                }
            }
        }
        let mut rest: Vec<AssetRef> = holdings
            .iter()
            .filter(|a| {
                a.symbol != required.symbol
                    && !ordered.iter().any(|o| o.symbol == a.symbol)
                    && !balances.amount_of(&a.symbol).is_zero()
            })
            .cloned()
            .collect();
        rest.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        ordered.extend(rest);
        ordered
    }

    fn spendable_balance(&self, candidate: &AssetRef, balances: &BalanceSnapshot) -> U256 {
        let balance = balances.amount_of(&candidate.symbol);
        let is_native = self
            .native_symbol
            .as_ref()
            .map(|n| n.eq_ignore_ascii_case(&candidate.symbol))
            .unwrap_or(false);
        if is_native {
            balance.saturating_sub(self.gas_reserve)
        } else {
            balance
        }
    }

    fn estimate_source_amount(
        &self,
        shortfall: U256,
        probe_amount: U256,
        rough: &Quote,
    ) -> Option<U256> {
        inverse_estimate(
            shortfall,
            probe_amount,
            rough.amount_out,
            self.safety_margin_bps,
        )
    }
}

/// Inverse-scale a target output into an input estimate using the rate a
/// probe quote implied (`probe_in` -> `probe_out`), padded by the safety
/// margin. Integer math throughout; never less than one base unit.
pub(crate) fn inverse_estimate(
    target_out: U256,
    probe_in: U256,
    probe_out: U256,
    margin_bps: u64,
) -> Option<U256> {
    if probe_out.is_zero() {
        return None;
    }
    let raw = target_out.checked_mul(probe_in)?.checked_div(probe_out)?;
    let padded = raw
        .checked_mul(U256::from(BPS_DENOMINATOR + margin_bps))?
        .checked_div(U256::from(BPS_DENOMINATOR))?;
    Some(padded.max(U256::from(1u64)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_estimate_pads_by_margin() {
        // Rate 1:120, shortfall 60 -> 0.5 before margin, 0.505 after 1%.
        let est = inverse_estimate(
            U256::from(60_000_000u64),
            U256::from(1_000_000u64),
            U256::from(120_000_000u64),
            100,
        )
        .unwrap();
        assert_eq!(est, U256::from(505_000u64));
    }

    #[test]
    fn inverse_estimate_floors_at_one_unit() {
        let est = inverse_estimate(U256::from(1u64), U256::from(1u64), U256::from(1_000u64), 100)
            .unwrap();
        assert_eq!(est, U256::from(1u64));
    }

    #[test]
    fn inverse_estimate_rejects_zero_probe_output() {
        assert!(inverse_estimate(U256::from(5u64), U256::from(5u64), U256::ZERO, 100).is_none());
    }
}
