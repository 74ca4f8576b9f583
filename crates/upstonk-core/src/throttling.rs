use std::fmt::{Debug, Formatter};
use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-provider call budget for upstreams with hard quotas.
///
/// Non-blocking: when the budget is spent the caller gets the wait time back
/// and decides whether to stop or to return what it already has.
pub struct RateBudget {
    limiter: DirectRateLimiter,
    clock: DefaultClock,
    calls_per_minute: u32,
}

impl RateBudget {
    pub fn per_minute(calls: u32) -> Self {
        let calls = NonZeroU32::new(calls.max(1)).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_minute(calls)),
            clock: DefaultClock::default(),
            calls_per_minute: calls.get(),
        }
    }

    /// Takes one call from the budget, or returns how long until one frees up.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    pub const fn calls_per_minute(&self) -> u32 {
        self.calls_per_minute
    }
}

impl Debug for RateBudget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateBudget")
            .field("calls_per_minute", &self.calls_per_minute)
            .finish()
    }
}
