//! Facturas load test
//!
//! Constant-arrival-rate load against the invoices search endpoint:
//! iterations start at a fixed rate on a bounded pool of virtual users,
//! every response is checked and timed, and the aggregate is judged against
//! error-rate and p95 thresholds.

pub mod checks;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod scenario;
pub mod summary;

pub use error::{LoadError, Result};
pub use executor::{Executor, RunOutcome};
pub use scenario::{LoadScenario, Thresholds};
pub use summary::Summary;

/// Exit code when a threshold is crossed
pub const THRESHOLDS_FAILED_EXIT_CODE: i32 = 99;
