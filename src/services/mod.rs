// SPDX-License-Identifier: MIT

pub mod swap;
