// SPDX-License-Identifier: MIT

use crate::domain::constants::BPS_DENOMINATOR;
use crate::domain::error::AppError;
use crate::domain::types::{ExecutionMode, Quote, SwapResult};
use crate::services::swap::ports::{AllowanceManager, SwapSubmitter};
use alloy::primitives::{Address, U256};
use std::sync::Arc;

/// Drives a selected route to an outcome. Simulation returns the quote as
/// a non-binding projection without touching any state-changing
/// collaborator; live execution is strictly approve-then-submit.
pub struct SwapExecutor {
    allowance: Arc<dyn AllowanceManager>,
    submitter: Arc<dyn SwapSubmitter>,
    /// Contract the allowance must cover (the swap router).
    spender: Address,
    default_slippage_bps: u64,
}

impl SwapExecutor {
    pub fn new(
        allowance: Arc<dyn AllowanceManager>,
        submitter: Arc<dyn SwapSubmitter>,
        spender: Address,
        default_slippage_bps: u64,
    ) -> Self {
        Self {
            allowance,
            submitter,
            spender,
            default_slippage_bps,
        }
    }

    pub async fn execute(
        &self,
        quote: &Quote,
        user: Address,
        max_slippage_bps: Option<u64>,
        mode: ExecutionMode,
    ) -> Result<SwapResult, AppError> {
        if !mode.is_live() {
            tracing::info!(
                target: "executor",
                route = %quote.description(),
                amount_in = %quote.amount_in,
                amount_out = %quote.amount_out,
                "Dry-run: would execute swap"
            );
            return Ok(SwapResult {
                route: quote.description(),
                amount_in: quote.amount_in,
                amount_out: quote.amount_out,
                tx_hash: None,
                simulated: true,
            });
        }

        // Approval must confirm before submission or the swap reverts;
        // these two steps are never issued concurrently.
        self.allowance
            .ensure_approved(quote.source(), self.spender, quote.amount_in, user)
            .await?;

        let slippage_bps = max_slippage_bps.unwrap_or(self.default_slippage_bps);
        let amount_out_min = min_out(quote.amount_out, slippage_bps);
        let outcome = self
            .submitter
            .submit(&quote.route, quote.amount_in, amount_out_min, user)
            .await?;

        Ok(SwapResult {
            route: quote.description(),
            amount_in: quote.amount_in,
            amount_out: outcome.amount_out,
            tx_hash: Some(outcome.tx_hash),
            simulated: false,
        })
    }
}

/// Quoted output reduced by the slippage tolerance.
pub(crate) fn min_out(amount_out: U256, slippage_bps: u64) -> U256 {
    amount_out.saturating_mul(U256::from(BPS_DENOMINATOR.saturating_sub(slippage_bps)))
        / U256::from(BPS_DENOMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_out_applies_slippage_floor() {
        assert_eq!(min_out(U256::from(10_000u64), 50), U256::from(9_950u64));
        assert_eq!(min_out(U256::from(10_000u64), 0), U256::from(10_000u64));
        // Slippage beyond 100% floors at zero rather than underflowing.
        assert_eq!(min_out(U256::from(10_000u64), 20_000), U256::ZERO);
    }
}
