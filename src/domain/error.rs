// SPDX-License-Identifier: MIT

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    // Field is named `src` (not `source`) because thiserror reserves
    // `source` for the error cause and requires it to impl Error.
    #[error("No quote available for {src} -> {dest}: {reason}")]
    QuoteUnavailable {
        src: String,
        dest: String,
        reason: String,
    },

    #[error("No route found from {src} to {dest}")]
    NoRouteFound { src: String, dest: String },

    #[error("No funding path covers a shortfall of {shortfall} {asset} (balances: {balances})")]
    NoFundingPath {
        asset: String,
        shortfall: String,
        balances: String,
    },

    #[error("Insufficient balance. Required: {required}, Available: {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("Swap failed: {reason}")]
    SwapFailed { reason: String },

    #[error("Deposit failed: {reason}")]
    DepositFailed { reason: String },

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

/// Stable machine-readable tags; stage reports carry these instead of
/// Display strings so callers can branch without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Config,
    Connection,
    QuoteUnavailable,
    NoRouteFound,
    NoFundingPath,
    InsufficientBalance,
    SwapFailed,
    DepositFailed,
    UnknownAsset,
    Unknown,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) => ErrorKind::Config,
            AppError::Connection(_) => ErrorKind::Connection,
            AppError::QuoteUnavailable { .. } => ErrorKind::QuoteUnavailable,
            AppError::NoRouteFound { .. } => ErrorKind::NoRouteFound,
            AppError::NoFundingPath { .. } => ErrorKind::NoFundingPath,
            AppError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            AppError::SwapFailed { .. } => ErrorKind::SwapFailed,
            AppError::DepositFailed { .. } => ErrorKind::DepositFailed,
            AppError::UnknownAsset(_) => ErrorKind::UnknownAsset,
            AppError::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
