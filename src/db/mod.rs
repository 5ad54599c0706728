//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Lazily opened connection pool
//! - Plan-based intent verification
//! - Statement execution
//! - Type mappings

pub mod executor;
pub mod plan;
pub mod provider;
pub mod types;

pub use executor::QueryExecutor;
pub use plan::{PlanGuard, PlanProbe, PlanProbeRow};
pub use provider::{ConnectionProvider, DbPool};
