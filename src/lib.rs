//! Slitting planner: picks which customer orders to cut from a master roll,
//! lays out blade positions, and commits the result to inventory and orders.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod executor;
pub mod filter;
pub mod logging;
pub mod render;
pub mod seed;
pub mod solver;
pub mod store;
pub mod strip;
pub mod types;
pub mod workshop;

pub use error::PlanError;
pub use executor::{Execution, ExecutionSummary, PlanExecutor};
pub use filter::{Candidates, select_candidates};
pub use solver::Planner;
pub use types::{Constraints, OptimizationPlan, Order, PlanMode, RawMaterialRoll};
pub use workshop::{Committed, Workshop};
