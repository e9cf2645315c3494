/*!
 * Adaptive Delay
 * Chooses the pause between sampling passes
 *
 * Strategy: sample densely while thread states are changing, back off towards the
 * configured ceiling while nothing changes, and never let the sampler itself cost
 * more than the target share of wall time.
 */

use crate::core::limits::{DELAY_STEP_DIVISOR, MIN_SAMPLING_DELAY, TARGET_OVERHEAD_PCT};
use crate::core::WatchConfig;
use std::time::Duration;

/// Summary of one finished sampling pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Nodes visited
    pub visited: usize,
    /// State changes observed (emitted or dropped)
    pub changes: usize,
    /// Wall time spent in the pass
    pub elapsed: Duration,
}

impl PassReport {
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.changes == 0
    }
}

/// Inter-pass delay state
#[derive(Debug, Clone)]
pub struct DelayController {
    current: Duration,
    floor: Duration,
    ceiling: Duration,
    step: Duration,
    idle_passes: u32,
}

impl DelayController {
    pub fn new(config: &WatchConfig) -> Self {
        Self::with_ceiling(config.max_delay)
    }

    pub fn with_ceiling(ceiling: Duration) -> Self {
        let floor = MIN_SAMPLING_DELAY.min(ceiling);
        let step = (ceiling / DELAY_STEP_DIVISOR).max(floor);

        Self {
            current: floor,
            floor,
            ceiling,
            step,
            idle_passes: 0,
        }
    }

    /// Delay that would be used right now
    #[inline]
    pub fn current(&self) -> Duration {
        self.current
    }

    #[inline]
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Fold in the pass just finished and return the next delay
    pub fn next_delay(&mut self, report: PassReport) -> Duration {
        let mut next = if report.is_idle() {
            self.idle_passes = self.idle_passes.saturating_add(1);
            self.current
                .saturating_add(self.step.saturating_mul(self.idle_passes))
        } else {
            self.idle_passes = 0;
            self.current / 2
        };

        // Overhead guard: pass time / (pass time + delay) <= target
        let guard = report
            .elapsed
            .saturating_mul(100 - TARGET_OVERHEAD_PCT)
            / TARGET_OVERHEAD_PCT;
        next = next.max(guard);

        self.current = next.clamp(self.floor, self.ceiling);
        self.current
    }
}
