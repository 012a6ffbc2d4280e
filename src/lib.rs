//! emrcost library
//!
//! Computes the monetary cost of EMR clusters by reconciling each instance's
//! observed runtime against a configured price table, for a single cluster or
//! for every cluster launched inside a date window.

pub mod calculator;
pub mod config;
pub mod emr;
pub mod error;
pub mod instance;
pub mod lister;
pub mod pricing;
pub mod retry;

// Re-export commonly used types
pub use calculator::{CostReport, EmrCostCalculator, TOTAL_KEY};
pub use config::Config;
pub use emr::{ClusterApi, EmrClient};
pub use error::{EmrCostError, Result};
pub use pricing::PriceTable;
