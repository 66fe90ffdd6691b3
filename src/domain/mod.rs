// SPDX-License-Identifier: MIT

pub mod amount;
pub mod constants;
pub mod error;
pub mod types;
