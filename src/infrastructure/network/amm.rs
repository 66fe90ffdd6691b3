// SPDX-License-Identifier: MIT

//! On-chain collaborator adapters: pool quoting, balance snapshots,
//! allowance management, swap submission and pool deposits. Transactions
//! are sent from the node-managed account (`eth_sendTransaction`); this
//! crate never holds keys.

use crate::common::retry::retry_async;
use crate::domain::constants::{NATIVE_SENTINEL, SWAP_DEADLINE_SECS};
use crate::domain::error::AppError;
use crate::domain::types::{
    AssetRef, BalanceSnapshot, DepositReceipt, Route, TxOutcome, Venue,
};
use crate::infrastructure::network::contracts::{ERC20, LendingPool, UniV3Quoter, UniV3Router};
use crate::infrastructure::network::provider::HttpProvider;
use crate::services::swap::ports::{
    AllowanceManager, BalanceReader, DepositSink, PoolQuoter, SwapSubmitter,
};
use alloy::network::Ethereum;
use alloy::primitives::aliases::{U24, U160};
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::{PendingTransactionBuilder, Provider};
use async_trait::async_trait;
use std::time::Duration;

pub struct OnchainVenue {
    provider: HttpProvider,
    quoter: Address,
    router: Address,
    deposit_pool: Address,
    /// Fee tier used to execute aggregator-quoted routes through a pool.
    execution_fee_tier: u32,
    receipt_timeout: Duration,
}

impl OnchainVenue {
    pub fn new(
        provider: HttpProvider,
        quoter: Address,
        router: Address,
        deposit_pool: Address,
        execution_fee_tier: u32,
        receipt_timeout_ms: u64,
    ) -> Self {
        Self {
            provider,
            quoter,
            router,
            deposit_pool,
            execution_fee_tier,
            receipt_timeout: Duration::from_millis(receipt_timeout_ms),
        }
    }

    /// Wait for a submitted transaction to confirm; `Err(reason)` on
    /// timeout, transport failure or revert. Callers map the reason into
    /// their stage-specific error variant.
    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<Ethereum>,
        what: &str,
    ) -> Result<B256, String> {
        let hash = *pending.tx_hash();
        let receipt = tokio::time::timeout(self.receipt_timeout, pending.get_receipt())
            .await
            .map_err(|_| format!("{what} confirmation timed out ({hash:#x})"))?
            .map_err(|e| format!("{what} receipt fetch failed: {e}"))?;
        if !receipt.status() {
            return Err(format!("{what} reverted ({hash:#x})"));
        }
        Ok(hash)
    }

    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256, AppError> {
        let erc20 = ERC20::new(token, self.provider.clone());
        retry_async(
            move |_| {
                let c = erc20.clone();
                async move { c.balanceOf(owner).call().await }
            },
            2,
            Duration::from_millis(100),
        )
        .await
        .map_err(|e| AppError::Connection(format!("balanceOf failed for {token:#x}: {e}")))
    }

    fn hop_fee_tier(&self, venue: &Venue) -> u32 {
        match venue {
            Venue::Pool { fee_tier } => *fee_tier,
            Venue::Aggregator(_) => self.execution_fee_tier,
        }
    }

    /// V3 multi-hop path: token0 ++ fee ++ token1 ++ fee ++ token2,
    /// fee as 3 big-endian bytes.
    fn encode_path(&self, route: &Route) -> Bytes {
        let mut path = Vec::with_capacity(20 + route.hops().len() * 23);
        path.extend_from_slice(route.source().address.as_slice());
        for hop in route.hops() {
            let fee = self.hop_fee_tier(&hop.venue);
            path.extend_from_slice(&fee.to_be_bytes()[1..4]);
            path.extend_from_slice(hop.to.address.as_slice());
        }
        Bytes::from(path)
    }

    fn deadline() -> U256 {
        U256::from(chrono::Utc::now().timestamp() as u64 + SWAP_DEADLINE_SECS)
    }
}

#[async_trait]
impl PoolQuoter for OnchainVenue {
    async fn quote_fee_tier(
        &self,
        source: &AssetRef,
        dest: &AssetRef,
        amount_in: U256,
        fee_tier: u32,
    ) -> Result<U256, AppError> {
        let quoter = UniV3Quoter::new(self.quoter, self.provider.clone());
        quoter
            .quoteExactInputSingle(
                source.address,
                dest.address,
                U24::from(fee_tier),
                amount_in,
                U160::ZERO,
            )
            .call()
            .await
            .map_err(|e| AppError::QuoteUnavailable {
                src: source.symbol.clone(),
                dest: dest.symbol.clone(),
                reason: format!("no pool at tier {fee_tier}: {e}"),
            })
    }
}

#[async_trait]
impl BalanceReader for OnchainVenue {
    async fn snapshot(
        &self,
        user: Address,
        assets: &[AssetRef],
    ) -> Result<BalanceSnapshot, AppError> {
        let mut snapshot = BalanceSnapshot::new(user);
        for asset in assets {
            let amount = if asset.address == NATIVE_SENTINEL {
                self.provider
                    .get_balance(user)
                    .await
                    .map_err(|e| AppError::Connection(format!("get_balance failed: {e}")))?
            } else {
                self.erc20_balance(asset.address, user).await?
            };
            snapshot.balances.insert(asset.symbol.clone(), amount);
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl AllowanceManager for OnchainVenue {
    async fn ensure_approved(
        &self,
        asset: &AssetRef,
        spender: Address,
        amount: U256,
        owner: Address,
    ) -> Result<(), AppError> {
        let erc20 = ERC20::new(asset.address, self.provider.clone());
        let current = erc20
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| AppError::Connection(format!("allowance read failed: {e}")))?;
        if current >= amount {
            return Ok(());
        }

        tracing::info!(
            target: "allowance",
            asset = %asset.symbol,
            spender = %format!("{spender:#x}"),
            amount = %amount,
            "Allowance below requirement, approving"
        );

        let pending = erc20
            .approve(spender, amount)
            .from(owner)
            .send()
            .await
            .map_err(|e| AppError::SwapFailed {
                reason: format!("approval submission failed: {e}"),
            })?;
        // The swap reverts if submitted before this confirms; hard ordering.
        self.confirm(pending, "approval")
            .await
            .map_err(|reason| AppError::SwapFailed { reason })?;
        Ok(())
    }
}

#[async_trait]
impl SwapSubmitter for OnchainVenue {
    async fn submit(
        &self,
        route: &Route,
        amount_in: U256,
        amount_out_min: U256,
        user: Address,
    ) -> Result<TxOutcome, AppError> {
        let router = UniV3Router::new(self.router, self.provider.clone());
        let balance_before = self.erc20_balance(route.dest().address, user).await?;

        let pending = if route.is_multi_hop() {
            let params = UniV3Router::ExactInputParams {
                path: self.encode_path(route),
                recipient: user,
                deadline: Self::deadline(),
                amountIn: amount_in,
                amountOutMinimum: amount_out_min,
            };
            router.exactInput(params).from(user).send().await
        } else {
            let hop = &route.hops()[0];
            let params = UniV3Router::ExactInputSingleParams {
                tokenIn: hop.from.address,
                tokenOut: hop.to.address,
                fee: U24::from(self.hop_fee_tier(&hop.venue)),
                recipient: user,
                deadline: Self::deadline(),
                amountIn: amount_in,
                amountOutMinimum: amount_out_min,
                sqrtPriceLimitX96: U160::ZERO,
            };
            router.exactInputSingle(params).from(user).send().await
        }
        .map_err(|e| AppError::SwapFailed {
            reason: format!("swap submission failed: {e}"),
        })?;

        let tx_hash = self
            .confirm(pending, "swap")
            .await
            .map_err(|reason| AppError::SwapFailed { reason })?;

        let balance_after = self.erc20_balance(route.dest().address, user).await?;
        let amount_out = balance_after.saturating_sub(balance_before);

        tracing::info!(
            target: "swap",
            route = %route.describe(),
            amount_in = %amount_in,
            amount_out = %amount_out,
            tx = %format!("{tx_hash:#x}"),
            "Swap confirmed"
        );

        Ok(TxOutcome {
            tx_hash,
            amount_out,
        })
    }
}

#[async_trait]
impl DepositSink for OnchainVenue {
    async fn deposit(
        &self,
        asset: &AssetRef,
        amount: U256,
        user: Address,
    ) -> Result<DepositReceipt, AppError> {
        let pool = LendingPool::new(self.deposit_pool, self.provider.clone());
        let pending = pool
            .supply(asset.address, amount, user, 0u16)
            .from(user)
            .send()
            .await
            .map_err(|e| AppError::DepositFailed {
                reason: format!("deposit submission failed: {e}"),
            })?;
        let tx_hash = self
            .confirm(pending, "deposit")
            .await
            .map_err(|reason| AppError::DepositFailed { reason })?;

        tracing::info!(
            target: "deposit",
            asset = %asset.symbol,
            amount = %amount,
            tx = %format!("{tx_hash:#x}"),
            "Deposit confirmed"
        );

        Ok(DepositReceipt {
            asset: asset.symbol.clone(),
            amount,
            tx_hash: Some(tx_hash),
            simulated: false,
        })
    }
}
