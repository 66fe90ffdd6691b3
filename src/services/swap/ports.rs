// SPDX-License-Identifier: MIT

//! Collaborator contracts the orchestration core consumes. Concrete
//! implementations live in `infrastructure`; tests drive the core
//! through mocks. None of these retry internally; callers own the
//! fallback policy.

use crate::domain::error::AppError;
use crate::domain::types::{
    AssetRef, BalanceSnapshot, DepositReceipt, Quote, Route, TxOutcome,
};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;

/// A liquidity source able to price a pair in one shot (DEX aggregator).
/// Fails with `QuoteUnavailable` on missing liquidity, transport errors
/// or malformed responses. No side effects.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &str;

    async fn quote(
        &self,
        source: &AssetRef,
        dest: &AssetRef,
        amount_in: U256,
    ) -> Result<Quote, AppError>;
}

/// Direct AMM pool quoting at a discrete fee tier. A missing pool is a
/// `QuoteUnavailable` failure the route finder discards per tier.
#[async_trait]
pub trait PoolQuoter: Send + Sync {
    async fn quote_fee_tier(
        &self,
        source: &AssetRef,
        dest: &AssetRef,
        amount_in: U256,
        fee_tier: u32,
    ) -> Result<U256, AppError>;
}

#[async_trait]
pub trait BalanceReader: Send + Sync {
    async fn snapshot(
        &self,
        user: Address,
        assets: &[AssetRef],
    ) -> Result<BalanceSnapshot, AppError>;
}

/// Checks the current spending allowance and, when short, issues an
/// approval and waits for its confirmation before returning.
#[async_trait]
pub trait AllowanceManager: Send + Sync {
    async fn ensure_approved(
        &self,
        asset: &AssetRef,
        spender: Address,
        amount: U256,
        owner: Address,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait SwapSubmitter: Send + Sync {
    async fn submit(
        &self,
        route: &Route,
        amount_in: U256,
        amount_out_min: U256,
        user: Address,
    ) -> Result<TxOutcome, AppError>;
}

#[async_trait]
pub trait DepositSink: Send + Sync {
    async fn deposit(
        &self,
        asset: &AssetRef,
        amount: U256,
        user: Address,
    ) -> Result<DepositReceipt, AppError>;
}
