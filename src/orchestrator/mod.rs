//! Cycle orchestration: gas guard, the per-cycle state machine and the outer loop.

pub mod cycle;
pub mod gas_guard;
pub mod scheduler;

pub use cycle::{CycleOutcome, CycleReport, CycleRunner, CycleStep};
pub use gas_guard::{GasGuard, GasStatus};
pub use scheduler::{random_interval, RunSummary, Scheduler, Sleeper, TokioSleeper};
