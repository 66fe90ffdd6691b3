// SPDX-License-Identifier: MIT

pub mod executor;
pub mod funding;
pub mod ports;
pub mod route_finder;
pub mod workflow;

pub use executor::SwapExecutor;
pub use funding::FundingPlanner;
pub use route_finder::RouteFinder;
pub use workflow::{WorkflowCoordinator, WorkflowRequest, WorkflowStats};
