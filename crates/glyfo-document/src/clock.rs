// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Time budget and cancellation — an injectable clock and the cooperative
// checkpoint evaluated before every page.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use glyfo_core::{GlyfoError, Result};
use tracing::warn;

/// Source of elapsed time.
pub trait Clock {
    /// Time since the clock's reference point.
    fn elapsed(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn elapsed(&self) -> Duration {
        (**self).elapsed()
    }
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clock advanced by hand, for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.get()
    }
}

/// Shared flag another thread can set to stop a run between pages.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Whole-document budget plus cancellation, measured from `start`.
pub struct Deadline<'a> {
    clock: &'a dyn Clock,
    started: Duration,
    budget: Duration,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> Deadline<'a> {
    pub fn start(clock: &'a dyn Clock, budget: Duration, cancel: Option<&'a CancellationToken>) -> Self {
        Self {
            clock,
            started: clock.elapsed(),
            budget,
            cancel,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed().saturating_sub(self.started)
    }

    /// Checkpoint before `page`: `elapsed >= budget` is a timeout, so a zero
    /// budget fails the first check.
    pub fn check(&self, page: u32) -> Result<()> {
        if self.cancel.is_some_and(CancellationToken::is_cancelled) {
            warn!(page, "processing cancelled");
            return Err(GlyfoError::Cancelled { page });
        }
        let elapsed = self.elapsed();
        if elapsed >= self.budget {
            warn!(page, elapsed_secs = elapsed.as_secs_f64(), limit_secs = self.budget.as_secs(), "time budget exhausted");
            return Err(GlyfoError::Timeout {
                page,
                elapsed_secs: elapsed.as_secs_f64(),
                limit_secs: self.budget.as_secs(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_budget_times_out_immediately() {
        let clock = ManualClock::new();
        let deadline = Deadline::start(&clock, Duration::ZERO, None);
        assert!(matches!(deadline.check(1), Err(GlyfoError::Timeout { page: 1, limit_secs: 0, .. })));
    }

    #[test]
    fn budget_expires_at_the_limit() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(100));
        let deadline = Deadline::start(&clock, Duration::from_secs(10), None);
        clock.advance(Duration::from_secs(9));
        assert!(deadline.check(1).is_ok());
        clock.advance(Duration::from_secs(1));
        assert!(matches!(deadline.check(2), Err(GlyfoError::Timeout { page: 2, .. })));
    }

    #[test]
    fn cancellation_wins_over_budget() {
        let clock = ManualClock::new();
        let token = CancellationToken::new();
        let deadline = Deadline::start(&clock, Duration::from_secs(60), Some(&token));
        assert!(deadline.check(1).is_ok());
        token.clone().cancel();
        assert!(matches!(deadline.check(2), Err(GlyfoError::Cancelled { page: 2 })));
    }
}
