//! Progress reporting for long-running batch operations.
//!
//! Nothing in here knows what the work *is*. Callers feed `(current, total)`
//! observations in and get human-readable progress out:
//!
//! - [`ElapsedTimer`]: a 100 ms tick counter that restarts whenever a new
//!   amount of work begins.
//! - [`EtaEstimator`]: a weighted moving average over the most recent
//!   intervals between observations.
//! - [`ProgressEstimator`]: both of the above, producing [`ProgressReport`]s.
//! - [`ProgressObserver`]: the callback surface used by the library.
//! - [`PerformanceLog`]: named timings of async operations.

mod elapsed;
mod eta;
mod perf;
mod report;

pub use crate::elapsed::{ElapsedTimer, TICK};
pub use crate::eta::{EtaEstimator, ProgressSample, WINDOW};
pub use crate::perf::PerformanceLog;
pub use crate::report::{ProgressEstimator, ProgressObserver, ProgressReport, ProgressUpdate, SilentObserver};
