use crate::config::BarrierConfig;
use crate::shared::ids::RunId;
use crate::shared::logging::RunLog;
use std::sync::Arc;
use std::time::Duration;

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: RunId,
    first_barrier_pending: bool,
}

impl RunContext {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            first_barrier_pending: true,
        }
    }

    pub fn first_barrier_pending(&self) -> bool {
        self.first_barrier_pending
    }
}

#[derive(Clone)]
pub struct WaitBarrier {
    initial: Duration,
    subsequent: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for WaitBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitBarrier")
            .field("initial", &self.initial)
            .field("subsequent", &self.subsequent)
            .finish_non_exhaustive()
    }
}

impl WaitBarrier {
    pub fn new(config: &BarrierConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            initial: config.initial(),
            subsequent: config.subsequent(),
            sleeper,
        }
    }

    pub fn interval_for(&self, ctx: &RunContext) -> Duration {
        if ctx.first_barrier_pending {
            self.initial
        } else {
            self.subsequent
        }
    }

    pub fn wait(&self, ctx: &mut RunContext, log: &RunLog) -> Duration {
        let interval = self.interval_for(ctx);
        log.info(
            "barrier.wait",
            &format!(
                "{} waiting {}s (first={})",
                ctx.run_id,
                interval.as_secs(),
                ctx.first_barrier_pending
            ),
        );
        self.sleeper.sleep(interval);
        ctx.first_barrier_pending = false;
        interval
    }
}
