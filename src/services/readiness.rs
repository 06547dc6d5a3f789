//! Synthetic readiness.
//!
//! The oscillator flips a shared [`ReadinessSignal`] between READY and
//! NOT_READY on a randomized schedule: READY for a random delay, NOT_READY
//! for a fixed delay, forever, until its cancellation token fires. The health
//! endpoint only ever reads the signal.

use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_READY: Duration = Duration::from_secs(60);
pub const DEFAULT_NOT_READY: Duration = Duration::from_secs(10);

/// Single-writer, many-reader availability flag. Clones share the flag.
#[derive(Debug, Clone)]
pub struct ReadinessSignal(Arc<AtomicBool>);

impl ReadinessSignal {
    pub fn new(ready: bool) -> Self {
        Self(Arc::new(AtomicBool::new(ready)))
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, ready: bool) {
        self.0.store(ready, Ordering::Release);
    }
}

impl Default for ReadinessSignal {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Supplies the length of each READY period.
pub trait DelaySource: Send {
    fn ready_for(&mut self) -> Duration;
}

/// Uniform whole-second delays in `[0, max_ready)`.
pub struct RandomDelays {
    rng: StdRng,
    max_ready_secs: u64,
}

impl RandomDelays {
    pub fn new(max_ready: Duration) -> Self {
        Self::with_rng(StdRng::from_os_rng(), max_ready)
    }

    pub fn seeded(seed: u64, max_ready: Duration) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), max_ready)
    }

    fn with_rng(rng: StdRng, max_ready: Duration) -> Self {
        Self {
            rng,
            max_ready_secs: max_ready.as_secs(),
        }
    }
}

impl DelaySource for RandomDelays {
    fn ready_for(&mut self) -> Duration {
        if self.max_ready_secs == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs(self.rng.random_range(0..self.max_ready_secs))
    }
}

/// Cycles through a fixed list of delays.
#[derive(Debug, Clone)]
pub struct FixedDelays {
    delays: Vec<Duration>,
    next: usize,
}

impl FixedDelays {
    pub fn new(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: delays.into_iter().collect(),
            next: 0,
        }
    }
}

impl DelaySource for FixedDelays {
    fn ready_for(&mut self) -> Duration {
        if self.delays.is_empty() {
            return Duration::ZERO;
        }
        let delay = self.delays[self.next % self.delays.len()];
        self.next += 1;
        delay
    }
}

pub struct Oscillator<D> {
    signal: ReadinessSignal,
    delays: D,
    not_ready_for: Duration,
}

impl<D: DelaySource + 'static> Oscillator<D> {
    pub fn new(signal: ReadinessSignal, delays: D, not_ready_for: Duration) -> Self {
        Self {
            signal,
            delays,
            not_ready_for,
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Enter READY, then alternate until `cancel` fires. The signal keeps
    /// its last value after stopping.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.signal.set(true);
        info!("service ready");

        loop {
            let ready_for = self.delays.ready_for();
            debug!(ready_secs = ready_for.as_secs_f64(), "next readiness drop scheduled");
            if !pause(ready_for, &cancel).await {
                break;
            }

            self.signal.set(false);
            warn!(
                not_ready_secs = self.not_ready_for.as_secs_f64(),
                "service not ready"
            );
            if !pause(self.not_ready_for, &cancel).await {
                break;
            }

            self.signal.set(true);
            info!("service ready");
        }

        debug!("readiness oscillator stopped");
    }
}

/// Sleep for `duration`; false if cancelled first.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
