// SPDX-License-Identifier: MIT

//! Top-level sequencer. One workflow invocation is one linear async
//! pipeline: Planning -> (FundingSwap)? -> (TargetSwap)? -> Deposit.
//! Transaction ordering per sender is a strict chain-side constraint, so
//! stages for the same address are never interleaved; only read-only
//! calls (quotes, snapshots) are safe to issue concurrently.

use crate::domain::amount::format_units;
use crate::domain::error::AppError;
use crate::domain::types::{
    AssetRef, BalanceSnapshot, DepositReceipt, ExecutionMode, FundingPlan, StageFailure,
    StageName, StagePayload, StageResult, SwapResult, WorkflowResult,
};
use crate::infrastructure::data::token_registry::TokenRegistry;
use crate::services::swap::executor::SwapExecutor;
use crate::services::swap::funding::{FundingPlanner, inverse_estimate};
use crate::services::swap::ports::{BalanceReader, DepositSink};
use crate::services::swap::route_finder::RouteFinder;
use alloy::primitives::{Address, U256};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub user: Address,
    /// Asset finally deposited.
    pub deposit_asset: String,
    /// Base units of the deposit asset.
    pub deposit_amount: U256,
    /// When set, the user pays from this asset and a target swap converts
    /// it into the deposit asset first.
    pub pay_with: Option<String>,
    pub max_slippage_bps: Option<u64>,
}

#[derive(Debug, Default)]
pub struct WorkflowStats {
    pub started: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
}

/// The machine's states. The failed stage's identity travels in the stage
/// report, not here; `Failed` only stops the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Planning,
    FundingSwap,
    TargetSwap,
    Deposit,
    Done,
    Failed,
}

struct RunContext {
    user: Address,
    deposit_asset: AssetRef,
    deposit_amount: U256,
    pay_asset: Option<AssetRef>,
    required: AssetRef,
    required_amount: U256,
    snapshot: BalanceSnapshot,
    holdings: Vec<AssetRef>,
    max_slippage_bps: Option<u64>,
    plan: Option<FundingPlan>,
    realized_target_out: Option<U256>,
}

pub struct WorkflowCoordinator {
    registry: Arc<TokenRegistry>,
    balances: Arc<dyn BalanceReader>,
    route_finder: Arc<RouteFinder>,
    planner: FundingPlanner,
    executor: SwapExecutor,
    deposit: Arc<dyn DepositSink>,
    mode: ExecutionMode,
    safety_margin_bps: u64,
    stats: Arc<WorkflowStats>,
}

impl WorkflowCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<TokenRegistry>,
        balances: Arc<dyn BalanceReader>,
        route_finder: Arc<RouteFinder>,
        planner: FundingPlanner,
        executor: SwapExecutor,
        deposit: Arc<dyn DepositSink>,
        mode: ExecutionMode,
        safety_margin_bps: u64,
    ) -> Self {
        Self {
            registry,
            balances,
            route_finder,
            planner,
            executor,
            deposit,
            mode,
            safety_margin_bps,
            stats: Arc::new(WorkflowStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<WorkflowStats> {
        self.stats.clone()
    }

    pub async fn run(&self, request: WorkflowRequest) -> WorkflowResult {
        self.stats.started.fetch_add(1, Ordering::Relaxed);
        let simulation = !self.mode.is_live();
        let mut stages: Vec<StageResult> = Vec::new();
        let mut suggestion: Option<String> = None;
        let mut final_error: Option<StageFailure> = None;

        let mut ctx = match self.prepare(&request).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(target: "workflow", error = %e, "Workflow rejected before planning");
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                return WorkflowResult {
                    success: false,
                    simulation,
                    stages,
                    final_error: Some(StageFailure::from_error(&e)),
                    suggestion: None,
                };
            }
        };

        // Single authoritative transition table; every arm names the next
        // state, effects happen in the stage helpers.
        let mut stage = Stage::Planning;
        loop {
            stage = match stage {
                Stage::Planning => match self.run_planning(&mut ctx).await {
                    Ok(()) => self.after_planning(&ctx),
                    Err(e) => {
                        final_error = Some(StageFailure::from_error(&e));
                        Stage::Failed
                    }
                },
                Stage::FundingSwap => match self.run_funding_swap(&ctx).await {
                    Ok(result) => {
                        stages.push(StageResult::succeeded(
                            StageName::FundingSwap,
                            StagePayload::Swap(result),
                        ));
                        self.after_swaps(&ctx)
                    }
                    Err(e) => {
                        suggestion = Some(self.funding_suggestion(&ctx));
                        stages.push(StageResult::failed(StageName::FundingSwap, &e));
                        final_error = Some(StageFailure::from_error(&e));
                        Stage::Failed
                    }
                },
                Stage::TargetSwap => match self.run_target_swap(&mut ctx).await {
                    Ok(result) => {
                        stages.push(StageResult::succeeded(
                            StageName::TargetSwap,
                            StagePayload::Swap(result),
                        ));
                        Stage::Deposit
                    }
                    // On-chain swaps are not reversible; an already-executed
                    // funding swap stays reported as succeeded.
                    Err(e) => {
                        stages.push(StageResult::failed(StageName::TargetSwap, &e));
                        final_error = Some(StageFailure::from_error(&e));
                        Stage::Failed
                    }
                },
                Stage::Deposit => match self.run_deposit(&ctx).await {
                    Ok(receipt) => {
                        stages.push(StageResult::succeeded(
                            StageName::Deposit,
                            StagePayload::Deposit(receipt),
                        ));
                        Stage::Done
                    }
                    Err(e) => {
                        stages.push(StageResult::failed(StageName::Deposit, &e));
                        final_error = Some(StageFailure::from_error(&e));
                        Stage::Failed
                    }
                },
                Stage::Done | Stage::Failed => break,
            };
        }

        let success = final_error.is_none();
        if success {
            self.stats.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }
        tracing::info!(
            target: "workflow",
            user = %format!("{:#x}", request.user),
            success,
            simulation,
            stages = stages.len(),
            "Workflow finished"
        );

        WorkflowResult {
            success,
            simulation,
            stages,
            final_error,
            suggestion,
        }
    }

    async fn prepare(&self, request: &WorkflowRequest) -> Result<RunContext, AppError> {
        if request.deposit_amount.is_zero() {
            return Err(AppError::Config("Deposit amount must be positive".to_string()));
        }
        let deposit_asset = self.registry.resolve(&request.deposit_asset).await?;
        let pay_asset = match &request.pay_with {
            Some(symbol) if !symbol.eq_ignore_ascii_case(&request.deposit_asset) => {
                Some(self.registry.resolve(symbol).await?)
            }
            _ => None,
        };

        let mut holdings: Vec<AssetRef> = Vec::new();
        for symbol in self.registry.known_symbols() {
            match self.registry.resolve(&symbol).await {
                Ok(asset) => holdings.push(asset),
                Err(e) => {
                    tracing::warn!(
                        target: "workflow",
                        symbol = %symbol,
                        error = %e,
                        "Skipping unresolvable asset in holdings scan"
                    );
                }
            }
        }
        if !holdings.iter().any(|a| a.symbol == deposit_asset.symbol) {
            holdings.push(deposit_asset.clone());
        }
        if let Some(pay) = &pay_asset {
            if !holdings.iter().any(|a| a.symbol == pay.symbol) {
                holdings.push(pay.clone());
            }
        }

        let snapshot = self.balances.snapshot(request.user, &holdings).await?;

        let (required, required_amount) = match &pay_asset {
            None => (deposit_asset.clone(), request.deposit_amount),
            Some(pay) => {
                let amount = self
                    .estimate_pay_amount(pay, &deposit_asset, request.deposit_amount, &snapshot)
                    .await?;
                (pay.clone(), amount)
            }
        };

        Ok(RunContext {
            user: request.user,
            deposit_asset,
            deposit_amount: request.deposit_amount,
            pay_asset,
            required,
            required_amount,
            snapshot,
            holdings,
            max_slippage_bps: request.max_slippage_bps,
            plan: None,
            realized_target_out: None,
        })
    }

    /// How much of the pay asset yields the requested deposit output:
    /// inverse-scaled from a probe quote, padded by the safety margin.
    async fn estimate_pay_amount(
        &self,
        pay: &AssetRef,
        deposit_asset: &AssetRef,
        deposit_amount: U256,
        snapshot: &BalanceSnapshot,
    ) -> Result<U256, AppError> {
        let one_unit = U256::from(10u64).pow(U256::from(pay.decimals as u64));
        let probe = snapshot.amount_of(&pay.symbol).max(one_unit);
        let rough = self.route_finder.best_quote(pay, deposit_asset, probe).await?;
        inverse_estimate(
            deposit_amount,
            probe,
            rough.amount_out,
            self.safety_margin_bps,
        )
        .ok_or_else(|| AppError::QuoteUnavailable {
            src: pay.symbol.clone(),
            dest: deposit_asset.symbol.clone(),
            reason: "probe quote produced no usable rate".to_string(),
        })
    }

    async fn run_planning(&self, ctx: &mut RunContext) -> Result<(), AppError> {
        let plan = self
            .planner
            .plan(&ctx.required, ctx.required_amount, &ctx.snapshot, &ctx.holdings)
            .await?;
        ctx.plan = Some(plan);
        Ok(())
    }

    fn after_planning(&self, ctx: &RunContext) -> Stage {
        let needs_funding = ctx
            .plan
            .as_ref()
            .map(|p| !p.sufficient_already && p.source.is_some())
            .unwrap_or(false);
        if needs_funding {
            Stage::FundingSwap
        } else {
            // Held balance already covers the requirement: no funding swap,
            // straight to the conversion (if requested) or the deposit.
            self.after_swaps(ctx)
        }
    }

    fn after_swaps(&self, ctx: &RunContext) -> Stage {
        if ctx.pay_asset.is_some() {
            Stage::TargetSwap
        } else {
            Stage::Deposit
        }
    }

    async fn run_funding_swap(&self, ctx: &RunContext) -> Result<SwapResult, AppError> {
        let plan = ctx.plan.as_ref().ok_or_else(|| AppError::SwapFailed {
            reason: "funding swap without a plan".to_string(),
        })?;
        let (source, amount) = match (&plan.source, plan.source_amount) {
            (Some(source), Some(amount)) => (source.clone(), amount),
            _ => {
                return Err(AppError::SwapFailed {
                    reason: "funding plan names no source asset".to_string(),
                });
            }
        };
        // Prices move; re-quote at the planned amount right before acting.
        let quote = self
            .route_finder
            .best_quote(&source, &ctx.required, amount)
            .await?;
        self.executor
            .execute(&quote, ctx.user, ctx.max_slippage_bps, self.mode)
            .await
    }

    async fn run_target_swap(&self, ctx: &mut RunContext) -> Result<SwapResult, AppError> {
        let pay = ctx.pay_asset.clone().ok_or_else(|| AppError::SwapFailed {
            reason: "target swap without a pay asset".to_string(),
        })?;
        let quote = self
            .route_finder
            .best_quote(&pay, &ctx.deposit_asset, ctx.required_amount)
            .await?;
        let result = self
            .executor
            .execute(&quote, ctx.user, ctx.max_slippage_bps, self.mode)
            .await?;
        ctx.realized_target_out = Some(result.amount_out);
        Ok(result)
    }

    async fn run_deposit(&self, ctx: &RunContext) -> Result<DepositReceipt, AppError> {
        let amount = match ctx.realized_target_out {
            Some(realized) => realized.min(ctx.deposit_amount),
            None => ctx.deposit_amount,
        };
        if !self.mode.is_live() {
            tracing::info!(
                target: "workflow",
                asset = %ctx.deposit_asset.symbol,
                amount = %amount,
                "Dry-run: would deposit"
            );
            return Ok(DepositReceipt {
                asset: ctx.deposit_asset.symbol.clone(),
                amount,
                tx_hash: None,
                simulated: true,
            });
        }
        self.deposit
            .deposit(&ctx.deposit_asset, amount, ctx.user)
            .await
    }

    fn funding_suggestion(&self, ctx: &RunContext) -> String {
        let shortfall = ctx
            .plan
            .as_ref()
            .map(|p| p.shortfall)
            .unwrap_or(U256::ZERO);
        let source = ctx
            .plan
            .as_ref()
            .and_then(|p| p.source.as_ref())
            .map(|s| s.symbol.clone())
            .unwrap_or_else(|| "another asset".to_string());
        format!(
            "The automated funding swap failed; you may still hold enough {source} to cover the {} {} shortfall manually.",
            format_units(shortfall, ctx.required.decimals),
            ctx.required.symbol
        )
    }
}
