//! Token pricing and cost accounting

pub mod calculator;
pub mod types;

pub use calculator::{calculate_cost, calculate_cost_for_mapping, calculate_costs};
pub use types::CostBreakdown;
