// SPDX-License-Identifier: MIT

//! Shared scripted collaborators for the integration tests. Pools and
//! aggregators apply a fixed linear rate per pair so quotes stay exact
//! in integer math; state-changing mocks record every invocation.
#![allow(dead_code)]

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use swapflow::domain::error::AppError;
use swapflow::domain::types::{
    AssetRef, BalanceSnapshot, DepositReceipt, Quote, Route, TxOutcome, Venue,
};
use swapflow::swap::ports::{
    AllowanceManager, BalanceReader, DepositSink, PoolQuoter, QuoteSource, SwapSubmitter,
};

pub fn asset(symbol: &str, decimals: u8) -> AssetRef {
    let mut bytes = [0u8; 20];
    for (i, b) in symbol.bytes().take(19).enumerate() {
        bytes[i] = b;
    }
    bytes[19] = decimals;
    AssetRef {
        symbol: symbol.to_string(),
        address: Address::from(bytes),
        decimals,
    }
}

pub fn units(whole: u64, decimals: u8) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(decimals as u64))
}

/// Linear rate: `amount_out = amount_in * num / den`.
#[derive(Clone, Copy)]
struct Rate {
    num: U256,
    den: U256,
}

impl Rate {
    fn apply(self, amount_in: U256) -> U256 {
        amount_in * self.num / self.den
    }
}

/// Pool quoter scripted per (source, dest, fee tier). Pairs without an
/// entry behave like a missing pool.
#[derive(Default)]
pub struct MockPools {
    rates: HashMap<(String, String, u32), Rate>,
    pub calls: AtomicUsize,
}

impl MockPools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: &str, to: &str, tier: u32, num: u64, den: u64) -> Self {
        self.rates.insert(
            (from.to_string(), to.to_string(), tier),
            Rate {
                num: U256::from(num),
                den: U256::from(den),
            },
        );
        self
    }
}

#[async_trait]
impl PoolQuoter for MockPools {
    async fn quote_fee_tier(
        &self,
        source: &AssetRef,
        dest: &AssetRef,
        amount_in: U256,
        fee_tier: u32,
    ) -> Result<U256, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = (source.symbol.clone(), dest.symbol.clone(), fee_tier);
        match self.rates.get(&key) {
            Some(rate) => Ok(rate.apply(amount_in)),
            None => Err(AppError::QuoteUnavailable {
                src: source.symbol.clone(),
                dest: dest.symbol.clone(),
                reason: format!("no pool at tier {fee_tier}"),
            }),
        }
    }
}

/// Aggregator scripted per pair; unknown pairs are unavailable.
#[derive(Default)]
pub struct MockAggregator {
    rates: HashMap<(String, String), Rate>,
    pub calls: AtomicUsize,
}

impl MockAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: &str, to: &str, num: u64, den: u64) -> Self {
        self.rates.insert(
            (from.to_string(), to.to_string()),
            Rate {
                num: U256::from(num),
                den: U256::from(den),
            },
        );
        self
    }
}

#[async_trait]
impl QuoteSource for MockAggregator {
    fn name(&self) -> &str {
        "mockagg"
    }

    async fn quote(
        &self,
        source: &AssetRef,
        dest: &AssetRef,
        amount_in: U256,
    ) -> Result<Quote, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = (source.symbol.clone(), dest.symbol.clone());
        let rate = self.rates.get(&key).ok_or_else(|| AppError::QuoteUnavailable {
            src: source.symbol.clone(),
            dest: dest.symbol.clone(),
            reason: "pair not offered".to_string(),
        })?;
        let route = Route::direct(
            source.clone(),
            dest.clone(),
            Venue::Aggregator("mockagg".to_string()),
        );
        Ok(Quote::shape(route, amount_in, rate.apply(amount_in), 0))
    }
}

/// Balance reader answering from a fixed symbol -> amount table.
pub struct StaticBalances {
    balances: HashMap<String, U256>,
}

impl StaticBalances {
    pub fn new(entries: &[(&str, U256)]) -> Self {
        Self {
            balances: entries
                .iter()
                .map(|(symbol, amount)| (symbol.to_string(), *amount))
                .collect(),
        }
    }
}

#[async_trait]
impl BalanceReader for StaticBalances {
    async fn snapshot(
        &self,
        user: Address,
        assets: &[AssetRef],
    ) -> Result<BalanceSnapshot, AppError> {
        let mut snapshot = BalanceSnapshot::new(user);
        for asset in assets {
            snapshot.balances.insert(
                asset.symbol.clone(),
                self.balances
                    .get(&asset.symbol)
                    .copied()
                    .unwrap_or(U256::ZERO),
            );
        }
        Ok(snapshot)
    }
}

#[derive(Default)]
pub struct RecordingAllowance {
    pub calls: AtomicUsize,
}

#[async_trait]
impl AllowanceManager for RecordingAllowance {
    async fn ensure_approved(
        &self,
        _asset: &AssetRef,
        _spender: Address,
        _amount: U256,
        _owner: Address,
    ) -> Result<(), AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Submitter that records every swap and reports the minimum as the
/// realized output. `fail: true` rejects every submission.
pub struct RecordingSubmitter {
    pub submissions: Mutex<Vec<(String, U256, U256)>>,
    pub fail: bool,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self {
            submissions: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            submissions: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl SwapSubmitter for RecordingSubmitter {
    async fn submit(
        &self,
        route: &Route,
        amount_in: U256,
        amount_out_min: U256,
        _user: Address,
    ) -> Result<TxOutcome, AppError> {
        if self.fail {
            return Err(AppError::SwapFailed {
                reason: "scripted submission failure".to_string(),
            });
        }
        self.submissions
            .lock()
            .unwrap()
            .push((route.describe(), amount_in, amount_out_min));
        Ok(TxOutcome {
            tx_hash: B256::repeat_byte(0xab),
            amount_out: amount_out_min,
        })
    }
}

pub struct RecordingDeposit {
    pub deposits: Mutex<Vec<(String, U256)>>,
    pub fail: bool,
}

impl RecordingDeposit {
    pub fn new() -> Self {
        Self {
            deposits: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            deposits: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.deposits.lock().unwrap().len()
    }
}

#[async_trait]
impl DepositSink for RecordingDeposit {
    async fn deposit(
        &self,
        asset: &AssetRef,
        amount: U256,
        _user: Address,
    ) -> Result<DepositReceipt, AppError> {
        if self.fail {
            return Err(AppError::DepositFailed {
                reason: "scripted deposit failure".to_string(),
            });
        }
        self.deposits
            .lock()
            .unwrap()
            .push((asset.symbol.clone(), amount));
        Ok(DepositReceipt {
            asset: asset.symbol.clone(),
            amount,
            tx_hash: Some(B256::repeat_byte(0xcd)),
            simulated: false,
        })
    }
}
