// SPDX-License-Identifier: MIT

pub mod aggregator;
pub mod amm;
pub mod contracts;
pub mod provider;
