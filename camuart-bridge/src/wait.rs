//! Cooperative deadline-and-retry loops.
//!
//! Every wait-for-condition operation of the bridge uses the same pattern:
//! check the condition, and while it is unmet re-check against a deadline
//! computed once at entry, sleeping a minimum interval between polls to
//! bound busy waiting. The clock is injectable so tests can simulate
//! elapsed time without real delays.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Time source and sleep facility used by [`Deadline`].
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// The monotonic wall clock. Sleeping suspends the calling thread.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A deterministic clock for tests. Time only moves when [`Clock::sleep`] is
/// called or [`ManualClock::advance`] is invoked; no real delay ever occurs.
///
/// Clones share the same time base, so a test can keep a handle while the
/// bridge owns another.
#[derive(Clone, Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock {
            origin: Instant::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// Move time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }

    /// Simulated time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// A retry window bounded by a timeout.
///
/// [`Deadline::poll`] grants at least one poll for any positive timeout,
/// then keeps granting polls until the deadline passes, sleeping whatever is
/// left of `min_interval` since the previous poll. A `false` return means
/// the window is exhausted; the caller decides whether that is a short
/// result or a hard error.
#[derive(Debug)]
pub struct Deadline {
    end: Instant,
    min_interval: Duration,
    last_poll: Instant,
    first: bool,
    timeout: Duration,
}

impl Deadline {
    pub fn start(clock: &impl Clock, timeout: Duration, min_interval: Duration) -> Deadline {
        let now = clock.now();
        Deadline {
            end: now + timeout,
            min_interval,
            last_poll: now,
            first: true,
            timeout,
        }
    }

    /// Returns `true` while there is time left for another condition check.
    pub fn poll(&mut self, clock: &impl Clock) -> bool {
        if self.first {
            self.first = false;
            if !self.timeout.is_zero() {
                // min one check for every positive timeout
                return true;
            }
        }
        if clock.now() >= self.end {
            return false;
        }
        if !self.min_interval.is_zero() {
            let since_last = clock.now() - self.last_poll;
            if since_last < self.min_interval {
                clock.sleep(self.min_interval - since_last);
            }
        }
        self.last_poll = clock.now();
        true
    }

    /// The timeout this window was created with.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
