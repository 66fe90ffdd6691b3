// SPDX-License-Identifier: MIT

use crate::domain::constants;
use crate::domain::error::AppError;
use crate::domain::types::ExecutionMode;
use alloy::primitives::{Address, U256, address};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalSettings {
    // General
    #[serde(default = "default_debug")]
    pub debug: bool,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    pub rpc_url: String,

    // Identity: the sending account is managed by the node/signer
    // collaborator; this crate never holds keys.
    pub wallet_address: Address,

    // Token metadata
    pub tokenlist_path: Option<String>,

    // Aggregator provider (optional; routing falls back to pools without it)
    pub aggregator_url: Option<String>,
    #[serde(default = "default_aggregator_name")]
    pub aggregator_name: String,
    #[serde(default = "default_aggregator_timeout_ms")]
    pub aggregator_timeout_ms: u64,

    // On-chain venues
    #[serde(default = "default_quoter_address")]
    pub quoter_address: Address,
    #[serde(default = "default_router_address")]
    pub router_address: Address,
    #[serde(default = "default_deposit_pool_address")]
    pub deposit_pool_address: Address,

    // Routing policy
    #[serde(default = "default_fee_tiers")]
    pub fee_tiers: Vec<u32>,
    #[serde(default = "default_intermediates")]
    pub intermediate_symbols: Vec<String>,
    /// Fee tier used when executing an aggregator-quoted route through a
    /// direct pool; an explicit policy choice, not derived from the quote.
    #[serde(default = "default_execution_fee_tier")]
    pub default_execution_fee_tier: u32,

    // Funding policy
    #[serde(default = "default_funding_priority")]
    pub funding_priority: Vec<String>,
    #[serde(default = "default_gas_reserve_wei")]
    pub gas_reserve_wei: u64,
    #[serde(default = "default_safety_margin_bps")]
    pub safety_margin_bps: u64,

    // Execution
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u64,
    #[serde(default = "default_false")]
    pub live: bool,
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
}

// Defaults
fn default_debug() -> bool {
    false
}
fn default_false() -> bool {
    false
}
fn default_chain_id() -> u64 {
    1
}
fn default_aggregator_name() -> String {
    "1inch".to_string()
}
fn default_aggregator_timeout_ms() -> u64 {
    5_000
}
fn default_quoter_address() -> Address {
    // Uniswap V3 Quoter, mainnet
    address!("b27308f9F90D607463bb33eA1BeBb41C27CE5AB6")
}
fn default_router_address() -> Address {
    // Uniswap V3 SwapRouter, mainnet
    address!("E592427A0AEce92De3Edee1F18E0157C05861564")
}
fn default_deposit_pool_address() -> Address {
    // Aave v3 Pool, mainnet
    address!("87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2")
}
fn default_fee_tiers() -> Vec<u32> {
    constants::DEFAULT_FEE_TIERS.to_vec()
}
fn default_intermediates() -> Vec<String> {
    constants::DEFAULT_INTERMEDIATES
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_execution_fee_tier() -> u32 {
    constants::DEFAULT_EXECUTION_FEE_TIER
}
fn default_funding_priority() -> Vec<String> {
    constants::DEFAULT_FUNDING_PRIORITY
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_gas_reserve_wei() -> u64 {
    constants::DEFAULT_GAS_RESERVE_WEI
}
fn default_safety_margin_bps() -> u64 {
    constants::DEFAULT_SAFETY_MARGIN_BPS
}
fn default_slippage_bps() -> u64 {
    constants::DEFAULT_SLIPPAGE_BPS
}
fn default_receipt_timeout_ms() -> u64 {
    constants::DEFAULT_RECEIPT_TIMEOUT_MS
}

impl GlobalSettings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env if present
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(selected) = path {
            builder = builder.add_source(File::from(Path::new(selected)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Precedence: CLI (in main) > env/.env > config file.
        builder = builder.add_source(Environment::with_prefix("SWAPFLOW"));

        let settings: GlobalSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.rpc_url.trim().is_empty() {
            return Err(AppError::Config("RPC_URL is missing".to_string()));
        }
        if self.fee_tiers.is_empty() {
            return Err(AppError::Config(
                "fee_tiers must name at least one pool tier".to_string(),
            ));
        }
        if self.slippage_bps >= constants::BPS_DENOMINATOR {
            return Err(AppError::Config(format!(
                "slippage_bps {} out of range",
                self.slippage_bps
            )));
        }
        if self.safety_margin_bps >= constants::BPS_DENOMINATOR {
            return Err(AppError::Config(format!(
                "safety_margin_bps {} out of range",
                self.safety_margin_bps
            )));
        }
        Ok(())
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        if self.live {
            ExecutionMode::Live
        } else {
            ExecutionMode::Simulate
        }
    }

    pub fn gas_reserve(&self) -> U256 {
        U256::from(self.gas_reserve_wei)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> GlobalSettings {
        GlobalSettings {
            debug: false,
            chain_id: 1,
            rpc_url: "http://localhost:8545".to_string(),
            wallet_address: Address::ZERO,
            tokenlist_path: None,
            aggregator_url: None,
            aggregator_name: default_aggregator_name(),
            aggregator_timeout_ms: default_aggregator_timeout_ms(),
            quoter_address: default_quoter_address(),
            router_address: default_router_address(),
            deposit_pool_address: default_deposit_pool_address(),
            fee_tiers: default_fee_tiers(),
            intermediate_symbols: default_intermediates(),
            default_execution_fee_tier: default_execution_fee_tier(),
            funding_priority: default_funding_priority(),
            gas_reserve_wei: default_gas_reserve_wei(),
            safety_margin_bps: default_safety_margin_bps(),
            slippage_bps: default_slippage_bps(),
            live: false,
            receipt_timeout_ms: default_receipt_timeout_ms(),
        }
    }

    #[test]
    fn default_mode_is_simulation() {
        assert!(!base().execution_mode().is_live());
    }

    #[test]
    fn rejects_empty_rpc_and_bad_bps() {
        let mut s = base();
        s.rpc_url = " ".to_string();
        assert!(s.validate().is_err());

        let mut s = base();
        s.slippage_bps = 10_000;
        assert!(s.validate().is_err());
    }
}
