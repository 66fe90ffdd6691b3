// SPDX-License-Identifier: MIT

use crate::common::retry::retry_async;
use crate::domain::error::AppError;
use crate::domain::types::AssetRef;
use crate::infrastructure::network::contracts::ERC20;
use crate::infrastructure::network::provider::HttpProvider;
use alloy::primitives::Address;
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;

#[derive(Deserialize)]
struct TokenEntry {
    symbol: String,
    #[serde(default)]
    decimals: Option<u8>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    addresses: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct RegisteredToken {
    address: Address,
    decimals: Option<u8>,
    tags: Vec<String>,
}

/// Symbol -> address/decimals registry for one chain. Decimals missing from
/// the tokenlist are read from the chain once and kept in an append-only
/// cache (concurrent reads safe, last write wins on population).
pub struct TokenRegistry {
    chain_id: u64,
    by_symbol: HashMap<String, RegisteredToken>,
    decimals_cache: DashMap<Address, u8>,
    provider: Option<HttpProvider>,
}

impl TokenRegistry {
    pub fn load_from_file(path: &str, chain_id: u64) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read tokenlist {path}: {e}")))?;
        Self::parse_tokenlist(&raw, chain_id)
            .map_err(|e| AppError::Config(format!("Invalid tokenlist JSON {path}: {e}")))
    }

    fn parse_tokenlist(raw: &str, chain_id: u64) -> Result<Self, serde_json::Error> {
        let entries: Vec<TokenEntry> = serde_json::from_str(raw)?;
        let mut by_symbol = HashMap::new();
        for entry in entries {
            let Some(addr_str) = entry.addresses.get(&chain_id.to_string()) else {
                continue;
            };
            let Ok(address) = addr_str.parse::<Address>() else {
                tracing::warn!(
                    target: "registry",
                    symbol = %entry.symbol,
                    address = %addr_str,
                    "Skipping tokenlist entry with unparseable address"
                );
                continue;
            };
            by_symbol.insert(
                entry.symbol.to_uppercase(),
                RegisteredToken {
                    address,
                    decimals: entry.decimals,
                    tags: entry.tags,
                },
            );
        }
        Ok(Self {
            chain_id,
            by_symbol,
            decimals_cache: DashMap::new(),
            provider: None,
        })
    }

    pub fn with_provider(mut self, provider: HttpProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Manual registration, used for wiring tests and minimal deployments
    /// without a tokenlist file.
    pub fn register(&mut self, symbol: &str, address: Address, decimals: u8, tags: &[&str]) {
        self.by_symbol.insert(
            symbol.to_uppercase(),
            RegisteredToken {
                address,
                decimals: Some(decimals),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        );
    }

    pub fn empty(chain_id: u64) -> Self {
        Self {
            chain_id,
            by_symbol: HashMap::new(),
            decimals_cache: DashMap::new(),
            provider: None,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub async fn resolve(&self, symbol: &str) -> Result<AssetRef, AppError> {
        let key = symbol.to_uppercase();
        let token = self
            .by_symbol
            .get(&key)
            .ok_or_else(|| AppError::UnknownAsset(symbol.to_string()))?;

        let decimals = match token.decimals {
            Some(d) => d,
            None => self.lookup_decimals(&key, token.address).await?,
        };

        Ok(AssetRef {
            symbol: key,
            address: token.address,
            decimals,
        })
    }

    async fn lookup_decimals(&self, symbol: &str, address: Address) -> Result<u8, AppError> {
        if let Some(cached) = self.decimals_cache.get(&address) {
            return Ok(*cached);
        }
        let Some(provider) = &self.provider else {
            return Err(AppError::Config(format!(
                "Tokenlist entry for {symbol} has no decimals and no provider is attached"
            )));
        };

        let erc20 = ERC20::new(address, provider.clone());
        let decimals = retry_async(
            move |_| {
                let c = erc20.clone();
                async move { c.decimals().call().await }
            },
            2,
            Duration::from_millis(100),
        )
        .await
        .map_err(|e| AppError::Connection(format!("decimals() failed for {symbol}: {e}")))?;

        self.decimals_cache.insert(address, decimals);
        Ok(decimals)
    }

    /// All registered symbols, sorted for deterministic snapshot order.
    pub fn known_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.by_symbol.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    fn has_tag(&self, symbol: &str, tag: &str) -> bool {
        self.by_symbol
            .get(&symbol.to_uppercase())
            .map(|t| t.tags.iter().any(|x| x.trim().eq_ignore_ascii_case(tag)))
            .unwrap_or(false)
    }

    pub fn is_native(&self, symbol: &str) -> bool {
        self.has_tag(symbol, "native")
    }

    pub fn native_symbol(&self) -> Option<String> {
        let mut natives: Vec<&String> = self
            .by_symbol
            .iter()
            .filter(|(_, t)| t.tags.iter().any(|x| x.trim().eq_ignore_ascii_case("native")))
            .map(|(s, _)| s)
            .collect();
        natives.sort();
        natives.first().map(|s| s.to_string())
    }
}
