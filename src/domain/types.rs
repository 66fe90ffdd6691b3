// SPDX-License-Identifier: MIT

use crate::domain::amount::serde_u256;
use crate::domain::error::{AppError, ErrorKind};
use alloy::primitives::{Address, B256, U256};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Token identity resolved by the registry. Treated as a value type
/// everywhere in the core; never mutated after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRef {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Liquidity venue a hop trades through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Venue {
    /// External DEX aggregator, identified by name. Venue-shopping and fee
    /// are bundled inside its quote; the core does not decompose it.
    Aggregator(String),
    /// Direct pool at a discrete fee tier (hundredths of a bip, 500 = 0.05%).
    Pool { fee_tier: u32 },
}

impl Venue {
    pub fn fee_bps(&self) -> u32 {
        match self {
            // Aggregator fees are already folded into amount_out.
            Venue::Aggregator(_) => 0,
            Venue::Pool { fee_tier } => fee_tier / 100,
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Aggregator(name) => write!(f, "{name}"),
            Venue::Pool { fee_tier } => write!(f, "pool:{:.2}%", *fee_tier as f64 / 10_000.0),
        }
    }
}

/// A single asset-to-asset conversion through one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hop {
    pub from: AssetRef,
    pub to: AssetRef,
    pub venue: Venue,
}

/// One or two ordered hops from a source asset to a destination asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    hops: Vec<Hop>,
}

impl Route {
    pub fn direct(from: AssetRef, to: AssetRef, venue: Venue) -> Self {
        Self {
            hops: vec![Hop { from, to, venue }],
        }
    }

    /// Two-hop route through `mid`. None if `mid` collides with either
    /// endpoint; a multi-hop route's intermediate must be disjoint.
    pub fn two_hop(
        from: AssetRef,
        mid: AssetRef,
        to: AssetRef,
        first: Venue,
        second: Venue,
    ) -> Option<Self> {
        if mid == from || mid == to {
            return None;
        }
        Some(Self {
            hops: vec![
                Hop {
                    from,
                    to: mid.clone(),
                    venue: first,
                },
                Hop {
                    from: mid,
                    to,
                    venue: second,
                },
            ],
        })
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    pub fn source(&self) -> &AssetRef {
        &self.hops.first().expect("route has at least one hop").from
    }

    pub fn dest(&self) -> &AssetRef {
        &self.hops.last().expect("route has at least one hop").to
    }

    pub fn is_multi_hop(&self) -> bool {
        self.hops.len() > 1
    }

    pub fn intermediate(&self) -> Option<&AssetRef> {
        if self.is_multi_hop() {
            Some(&self.hops[0].to)
        } else {
            None
        }
    }

    pub fn describe(&self) -> String {
        let mut out = self.source().symbol.clone();
        for hop in &self.hops {
            out.push_str(&format!(" -[{}]-> {}", hop.venue, hop.to.symbol));
        }
        out
    }
}

/// Canonical quote shape. Produced fresh per request, never cached;
/// all downstream logic operates only on this type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub route: Route,
    #[serde(with = "serde_u256")]
    pub amount_in: U256,
    #[serde(with = "serde_u256")]
    pub amount_out: U256,
    /// Additive across hops in a multi-hop quote.
    pub fee_bps: u32,
    /// Simplified effective-rate deviation over decimals-normalized amounts,
    /// not a true AMM curvature measure.
    pub price_impact_pct: f64,
}

impl Quote {
    pub fn shape(route: Route, amount_in: U256, amount_out: U256, fee_bps: u32) -> Self {
        let price_impact_pct = effective_rate_deviation_pct(
            amount_in,
            route.source().decimals,
            amount_out,
            route.dest().decimals,
        );
        Self {
            route,
            amount_in,
            amount_out,
            fee_bps,
            price_impact_pct,
        }
    }

    pub fn source(&self) -> &AssetRef {
        self.route.source()
    }

    pub fn dest(&self) -> &AssetRef {
        self.route.dest()
    }

    pub fn description(&self) -> String {
        self.route.describe()
    }
}

/// `|1 - out/in| * 100` over human-unit amounts. Floats are confined to this
/// reporting field; route comparison never touches it.
fn effective_rate_deviation_pct(
    amount_in: U256,
    in_decimals: u8,
    amount_out: U256,
    out_decimals: u8,
) -> f64 {
    let in_h = u256_to_f64(amount_in) / 10f64.powi(in_decimals as i32);
    let out_h = u256_to_f64(amount_out) / 10f64.powi(out_decimals as i32);
    if in_h <= 0.0 {
        return 0.0;
    }
    ((1.0 - out_h / in_h) * 100.0).abs()
}

fn u256_to_f64(v: U256) -> f64 {
    v.as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * 2f64.powi(64) + limb as f64)
}

/// Point-in-time balances for one user, keyed by asset symbol. Read-only,
/// discarded after use; never the authority on actual chain state.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceSnapshot {
    pub user: Address,
    #[serde(serialize_with = "serde_u256::serialize_map")]
    pub balances: HashMap<String, U256>,
}

impl BalanceSnapshot {
    pub fn new(user: Address) -> Self {
        Self {
            user,
            balances: HashMap::new(),
        }
    }

    pub fn amount_of(&self, symbol: &str) -> U256 {
        self.balances.get(symbol).copied().unwrap_or(U256::ZERO)
    }

    pub fn summary(&self) -> String {
        let mut entries: Vec<(&String, &U256)> = self
            .balances
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .iter()
            .map(|(symbol, amount)| format!("{symbol}={amount}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Output of the funding planner; consumed immediately by the coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct FundingPlan {
    pub sufficient_already: bool,
    #[serde(with = "serde_u256")]
    pub shortfall: U256,
    pub source: Option<AssetRef>,
    #[serde(with = "serde_u256::option")]
    pub source_amount: Option<U256>,
    #[serde(with = "serde_u256::option")]
    pub expected_output: Option<U256>,
}

impl FundingPlan {
    pub fn sufficient() -> Self {
        Self {
            sufficient_already: true,
            shortfall: U256::ZERO,
            source: None,
            source_amount: None,
            expected_output: None,
        }
    }

    pub fn funded(
        shortfall: U256,
        source: AssetRef,
        source_amount: U256,
        expected_output: U256,
    ) -> Self {
        Self {
            sufficient_already: false,
            shortfall,
            source: Some(source),
            source_amount: Some(source_amount),
            expected_output: Some(expected_output),
        }
    }
}

/// Global dry-run/live toggle; every state-changing path checks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    Simulate,
    Live,
}

impl ExecutionMode {
    pub fn is_live(self) -> bool {
        matches!(self, ExecutionMode::Live)
    }
}

/// Confirmation data for a submitted swap transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutcome {
    pub tx_hash: B256,
    #[serde(with = "serde_u256")]
    pub amount_out: U256,
}

/// Canonical record returned by the swap executor in both modes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapResult {
    pub route: String,
    #[serde(with = "serde_u256")]
    pub amount_in: U256,
    #[serde(with = "serde_u256")]
    pub amount_out: U256,
    pub tx_hash: Option<B256>,
    /// True when the result is a non-binding projection.
    pub simulated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositReceipt {
    pub asset: String,
    #[serde(with = "serde_u256")]
    pub amount: U256,
    pub tx_hash: Option<B256>,
    pub simulated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    FundingSwap,
    TargetSwap,
    Deposit,
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageName::FundingSwap => "funding-swap",
            StageName::TargetSwap => "target-swap",
            StageName::Deposit => "deposit",
        };
        write!(f, "{name}")
    }
}

/// Structured failure attached to a stage: kind + message, never a bare string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl StageFailure {
    pub fn from_error(err: &AppError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StagePayload {
    Swap(SwapResult),
    Deposit(DepositReceipt),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    pub stage: StageName,
    pub outcome: Result<StagePayload, StageFailure>,
}

impl StageResult {
    pub fn succeeded(stage: StageName, payload: StagePayload) -> Self {
        Self {
            stage,
            outcome: Ok(payload),
        }
    }

    pub fn failed(stage: StageName, err: &AppError) -> Self {
        Self {
            stage,
            outcome: Err(StageFailure::from_error(err)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Single structured outcome describing every stage attempted.
/// Created once per workflow call, never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowResult {
    pub success: bool,
    pub simulation: bool,
    pub stages: Vec<StageResult>,
    pub final_error: Option<StageFailure>,
    pub suggestion: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(symbol: &str, decimals: u8) -> AssetRef {
        AssetRef {
            symbol: symbol.to_string(),
            address: Address::from([decimals; 20]),
            decimals,
        }
    }

    #[test]
    fn two_hop_rejects_colliding_intermediate() {
        let usdc = asset("USDC", 6);
        let weth = asset("WETH", 18);
        let venue = Venue::Pool { fee_tier: 500 };
        assert!(
            Route::two_hop(
                usdc.clone(),
                usdc.clone(),
                weth.clone(),
                venue.clone(),
                venue.clone()
            )
            .is_none()
        );
        let dai = asset("DAI", 18);
        let route =
            Route::two_hop(usdc.clone(), weth.clone(), dai, venue.clone(), venue).unwrap();
        assert!(route.is_multi_hop());
        assert_eq!(route.intermediate().unwrap().symbol, "WETH");
        assert_eq!(route.source(), &usdc);
    }

    #[test]
    fn pool_fee_converts_to_bps() {
        assert_eq!(Venue::Pool { fee_tier: 500 }.fee_bps(), 5);
        assert_eq!(Venue::Pool { fee_tier: 3_000 }.fee_bps(), 30);
    }

    #[test]
    fn impact_is_rate_deviation_over_human_units() {
        // 100 USDC (6 decimals) -> 99 DAI (18 decimals): 1% deviation.
        let route = Route::direct(
            asset("USDC", 6),
            asset("DAI", 18),
            Venue::Pool { fee_tier: 500 },
        );
        let quote = Quote::shape(
            route,
            U256::from(100_000_000u64),
            U256::from(99u64) * U256::from(10u64).pow(U256::from(18u64)),
            5,
        );
        assert!((quote.price_impact_pct - 1.0).abs() < 1e-9);
    }
}
