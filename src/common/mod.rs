// SPDX-License-Identifier: MIT

pub mod retry;
