//! Outer loop: pick an active wallet, run one cycle, sleep, repeat.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{error, info};

use super::cycle::{CycleOutcome, CycleRunner, CycleStep};
use crate::core::errors::BotError;
use crate::core::wallet_store::{WalletRecord, WalletStore};

/// Timed suspension between steps. Swapped out in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl RunSummary {
    pub fn total(&self) -> u64 {
        self.completed + self.skipped + self.failed
    }

    fn record(&mut self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::Completed(_) => self.completed += 1,
            CycleOutcome::Skipped { .. } => self.skipped += 1,
            CycleOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Uniform delay between `min_minutes` and `max_minutes`, at one-second resolution.
pub fn random_interval<R: Rng + ?Sized>(rng: &mut R, min_minutes: u64, max_minutes: u64) -> Duration {
    let (lo, hi) = if min_minutes <= max_minutes {
        (min_minutes, max_minutes)
    } else {
        (max_minutes, min_minutes)
    };
    Duration::from_secs(rng.gen_range(lo * 60..=hi * 60))
}

pub struct Scheduler<'a> {
    runner: &'a CycleRunner,
    wallets: &'a WalletStore,
    sleeper: &'a dyn Sleeper,
    interval_min: u64,
    interval_max: u64,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        runner: &'a CycleRunner,
        wallets: &'a WalletStore,
        sleeper: &'a dyn Sleeper,
        interval_min: u64,
        interval_max: u64,
    ) -> Self {
        Self { runner, wallets, sleeper, interval_min, interval_max }
    }

    /// Run cycles until `max_cycles` is reached, or forever when it is `None`.
    ///
    /// A failed or panicking cycle never stops the loop. The only error is an
    /// empty active-wallet pool.
    pub async fn run<R: Rng + Send + ?Sized>(
        &self,
        rng: &mut R,
        max_cycles: Option<u64>,
    ) -> Result<RunSummary, BotError> {
        let active = self.wallets.require_active()?;
        let mut summary = RunSummary::default();

        loop {
            if max_cycles.is_some_and(|max| summary.total() >= max) {
                info!(
                    completed = summary.completed,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "Cycle limit reached"
                );
                return Ok(summary);
            }
            if summary.total() > 0 {
                let delay = random_interval(&mut *rng, self.interval_min, self.interval_max);
                info!(seconds = delay.as_secs(), "Sleeping until next cycle");
                self.sleeper.sleep(delay).await;
            }

            let wallet = active
                .choose(&mut *rng)
                .copied()
                .ok_or_else(|| BotError::Config("No active wallets".to_string()))?;
            info!(cycle = summary.total() + 1, address = ?wallet.address, "Starting cycle");

            let outcome = self.run_guarded(wallet, &mut *rng).await;
            outcome.log(wallet.address);
            summary.record(&outcome);
        }
    }

    /// One cycle for `wallet`, with a panic folded into a `Failed` outcome at
    /// `CycleStep::Aborted`.
    pub async fn run_guarded<R: Rng + Send + ?Sized>(&self, wallet: &WalletRecord, rng: &mut R) -> CycleOutcome {
        let run = AssertUnwindSafe(self.runner.run_cycle(wallet, rng));
        match run.catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(address = ?wallet.address, "Cycle panicked");
                CycleOutcome::Failed {
                    step: CycleStep::Aborted,
                    error: "cycle panicked".to_string(),
                    retryable: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn interval_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let d = random_interval(&mut rng, 5, 15);
            assert!(d >= Duration::from_secs(300) && d <= Duration::from_secs(900));
        }
    }

    #[test]
    fn equal_bounds_give_fixed_interval() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(random_interval(&mut rng, 2, 2), Duration::from_secs(120));
    }

    #[test]
    fn summary_counts() {
        let mut s = RunSummary::default();
        s.record(&CycleOutcome::Skipped { step: CycleStep::Select, reason: "none".into() });
        s.record(&CycleOutcome::Failed { step: CycleStep::Swap, error: "boom".into(), retryable: true });
        assert_eq!(s.total(), 2);
        assert_eq!(s.skipped, 1);
        assert_eq!(s.failed, 1);
    }
}
