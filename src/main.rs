// SPDX-License-Identifier: MIT

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use swapflow::app::config::GlobalSettings;
use swapflow::app::logging::setup_logging;
use swapflow::data::token_registry::TokenRegistry;
use swapflow::domain::amount::parse_units;
use swapflow::domain::constants;
use swapflow::domain::types::{AssetRef, ExecutionMode};
use swapflow::network::aggregator::AggregatorClient;
use swapflow::network::amm::OnchainVenue;
use swapflow::network::provider::ConnectionFactory;
use swapflow::swap::ports::{PoolQuoter, QuoteSource};
use swapflow::swap::workflow::WorkflowRequest;
use swapflow::swap::{FundingPlanner, RouteFinder, SwapExecutor, WorkflowCoordinator};

/// One-shot swap-and-deposit workflow runner.
#[derive(Parser, Debug)]
#[command(name = "swapflow", version, about)]
struct Cli {
    /// Path to a config file (TOML). Falls back to ./config.* and env vars.
    #[arg(long)]
    config: Option<String>,

    /// Asset to deposit, by registry symbol.
    #[arg(long)]
    asset: String,

    /// Deposit amount in human units (e.g. "100" or "0.5").
    #[arg(long)]
    amount: String,

    /// Pay from this asset instead of the deposit asset.
    #[arg(long)]
    pay_with: Option<String>,

    /// Per-run slippage cap in basis points.
    #[arg(long)]
    slippage_bps: Option<u64>,

    /// Submit real transactions instead of the default dry run.
    #[arg(long)]
    live: bool,

    /// Log filter, a level or a full tracing directive string.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level, cli.json_logs);

    match run(cli).await {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let settings =
        GlobalSettings::load_with_path(cli.config.as_deref()).context("loading configuration")?;
    let mode = if cli.live {
        ExecutionMode::Live
    } else {
        settings.execution_mode()
    };
    tracing::info!(
        chain_id = settings.chain_id,
        live = mode.is_live(),
        "Starting swapflow"
    );

    let provider = ConnectionFactory::http(&settings.rpc_url)?;
    let registry = Arc::new(build_registry(&settings, provider.clone())?);

    let venue = Arc::new(OnchainVenue::new(
        provider,
        settings.quoter_address,
        settings.router_address,
        settings.deposit_pool_address,
        settings.default_execution_fee_tier,
        settings.receipt_timeout_ms,
    ));

    let aggregator: Option<Arc<dyn QuoteSource>> = match &settings.aggregator_url {
        Some(url) => Some(Arc::new(AggregatorClient::new(
            url,
            &settings.aggregator_name,
            settings.aggregator_timeout_ms,
        )?)),
        None => None,
    };

    let mut intermediates: Vec<AssetRef> = Vec::new();
    for symbol in &settings.intermediate_symbols {
        match registry.resolve(symbol).await {
            Ok(asset) => intermediates.push(asset),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Skipping unknown intermediate");
            }
        }
    }

    let route_finder = Arc::new(RouteFinder::new(
        aggregator,
        venue.clone() as Arc<dyn PoolQuoter>,
        settings.fee_tiers.clone(),
        intermediates,
    ));
    let planner = FundingPlanner::new(
        route_finder.clone(),
        settings.funding_priority.clone(),
        registry.native_symbol(),
        settings.gas_reserve(),
        settings.safety_margin_bps,
    );
    let executor = SwapExecutor::new(
        venue.clone(),
        venue.clone(),
        settings.router_address,
        settings.slippage_bps,
    );
    let coordinator = WorkflowCoordinator::new(
        registry.clone(),
        venue.clone(),
        route_finder,
        planner,
        executor,
        venue,
        mode,
        settings.safety_margin_bps,
    );

    let deposit_asset = registry.resolve(&cli.asset).await?;
    let deposit_amount = parse_units(&cli.amount, deposit_asset.decimals)
        .with_context(|| format!("parsing --amount for {}", deposit_asset.symbol))?;

    let request = WorkflowRequest {
        user: settings.wallet_address,
        deposit_asset: cli.asset,
        deposit_amount,
        pay_with: cli.pay_with,
        max_slippage_bps: cli.slippage_bps,
    };

    let result = coordinator.run(request).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.success)
}

fn build_registry(
    settings: &GlobalSettings,
    provider: swapflow::network::provider::HttpProvider,
) -> anyhow::Result<TokenRegistry> {
    let registry = match &settings.tokenlist_path {
        Some(path) => TokenRegistry::load_from_file(path, settings.chain_id)?,
        None => {
            // Minimal mainnet fallback so the tool works without a tokenlist.
            let mut registry = TokenRegistry::empty(settings.chain_id);
            registry.register("ETH", constants::NATIVE_SENTINEL, 18, &["native"]);
            registry.register("WETH", constants::WETH_MAINNET, 18, &["wrapped"]);
            registry.register("USDC", constants::USDC_MAINNET, 6, &["stablecoin"]);
            registry
        }
    };
    Ok(registry.with_provider(provider))
}
