// SPDX-License-Identifier: MIT

use alloy::primitives::{Address, U256, address};

// Common assets (mainnet)
pub const WETH_MAINNET: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const USDC_MAINNET: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const NATIVE_SENTINEL: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

// =============================================================================
// ROUTING CONSTANTS
// =============================================================================

/// V3-style pool fee tiers, in hundredths of a basis point (500 = 0.05%).
/// Enumeration order doubles as the tie-break: the first tier wins on equal output.
pub const DEFAULT_FEE_TIERS: [u32; 4] = [100, 500, 3_000, 10_000];

/// Fee tier assumed when executing a route that was quoted by the aggregator
/// (which reports only a flat fee). Overridable via config.
pub const DEFAULT_EXECUTION_FEE_TIER: u32 = 3_000;

pub const DEFAULT_INTERMEDIATES: [&str; 4] = ["WETH", "USDC", "USDT", "DAI"];

// =============================================================================
// FUNDING CONSTANTS
// =============================================================================

/// Candidate source assets tried first when covering a shortfall.
pub const DEFAULT_FUNDING_PRIORITY: [&str; 6] = ["ETH", "WETH", "USDC", "USDT", "DAI", "WSTETH"];

/// Native balance held back for gas, never offered to the planner. 0.01 ETH.
pub const DEFAULT_GAS_RESERVE_WEI: u64 = 10_000_000_000_000_000;

/// Safety margin applied when inverse-scaling a shortfall into a source
/// amount estimate (basis points; 100 = 1%).
pub const DEFAULT_SAFETY_MARGIN_BPS: u64 = 100;

pub const DEFAULT_SLIPPAGE_BPS: u64 = 50;

pub const BPS_DENOMINATOR: u64 = 10_000;

// =============================================================================
// TRANSACTION CONSTANTS
// =============================================================================

pub const DEFAULT_RECEIPT_TIMEOUT_MS: u64 = 120_000;
pub const SWAP_DEADLINE_SECS: u64 = 300;

/// Scale amounts of a `decimals`-precision asset onto a common 18-decimals
/// basis so amounts of different assets compare deterministically.
pub fn to_common_scale(amount: U256, decimals: u8) -> U256 {
    if decimals >= 18 {
        amount / U256::from(10u64).pow(U256::from((decimals - 18) as u64))
    } else {
        amount * U256::from(10u64).pow(U256::from((18 - decimals) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_scale_aligns_decimals() {
        // 1.0 of a 6-decimals asset and 1.0 of an 18-decimals asset land on the same scale.
        let one_usdc = to_common_scale(U256::from(1_000_000u64), 6);
        let one_weth = to_common_scale(U256::from(10u64).pow(U256::from(18u64)), 18);
        assert_eq!(one_usdc, one_weth);
    }
}
