//! Time sources for the frame loop.
//!
//! The loop never reads wall-clock time directly. It asks a [`Clock`] for the
//! time since the clock's origin, which lets tests drive ticks with a
//! [`ManualClock`] while the app uses [`InstantClock`].

use std::{cell::Cell, rc::Rc};

use instant::{Duration, Instant};

/// A monotonic time source measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock backed by `instant`, which maps to `performance.now()` on the web.
#[derive(Debug, Clone, Copy)]
pub struct InstantClock {
    origin: Instant,
}

impl InstantClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for InstantClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to a [`Timer`].
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, dt: Duration) {
        self.now.set(self.now.get() + dt);
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Accumulates elapsed time, one `update` per frame.
///
/// The first `update` measures from the moment the timer was created. A clock
/// that reports an earlier time than before produces a zero delta, so
/// `elapsed` never decreases.
#[derive(Debug)]
pub struct Timer<C: Clock> {
    clock: C,
    previous: Duration,
    delta: Duration,
    elapsed: Duration,
}

impl<C: Clock> Timer<C> {
    pub fn new(clock: C) -> Self {
        let previous = clock.now();
        Self {
            clock,
            previous,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }

    pub fn update(&mut self) -> Duration {
        let now = self.clock.now();
        self.delta = now.saturating_sub(self.previous);
        self.previous = now.max(self.previous);
        self.elapsed += self.delta;
        self.delta
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_measures_from_creation() {
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(5));
        let mut timer = Timer::new(clock.clone());

        clock.advance(Duration::from_millis(250));
        assert_eq!(timer.update(), Duration::from_millis(250));
        assert_eq!(timer.elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn update_without_time_passing_is_a_zero_delta() {
        let clock = ManualClock::new();
        let mut timer = Timer::new(clock.clone());

        clock.advance(Duration::from_millis(10));
        timer.update();
        timer.update();
        assert_eq!(timer.delta(), Duration::ZERO);
        assert_eq!(timer.elapsed(), Duration::from_millis(10));
    }

    #[test]
    fn clock_going_backwards_does_not_shrink_elapsed() {
        let clock = ManualClock::new();
        let mut timer = Timer::new(clock.clone());

        clock.set(Duration::from_millis(100));
        timer.update();
        clock.set(Duration::from_millis(40));
        timer.update();
        assert_eq!(timer.delta(), Duration::ZERO);
        assert_eq!(timer.elapsed(), Duration::from_millis(100));

        // resumes counting from the high-water mark
        clock.set(Duration::from_millis(120));
        timer.update();
        assert_eq!(timer.elapsed(), Duration::from_millis(120));
    }

    #[test]
    fn instant_clock_is_monotonic() {
        let clock = InstantClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
