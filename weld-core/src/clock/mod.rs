//! Millisecond time base shared by the controller and its collaborators.
//!
//! Every timing decision in the crate flows through [`Clock`], which lets the
//! firmware bind the hardware tick and lets tests substitute a fake clock that
//! advances only when asked.

use core::fmt;

/// Monotonic millisecond timestamp backed by a wrapping `u32` tick counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Millis(u32);

impl Millis {
    pub const ZERO: Self = Self(0);

    /// Wraps a raw tick value.
    #[must_use]
    pub const fn from_ticks(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Returns the raw tick value.
    #[must_use]
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, tolerant of a single counter wrap.
    #[must_use]
    pub const fn wrapping_since(self, earlier: Millis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Returns the timestamp `ms` milliseconds after `self`.
    #[must_use]
    pub const fn wrapping_add(self, ms: u32) -> Self {
        Self(self.0.wrapping_add(ms))
    }

    /// Returns `true` once `self` is at or past `deadline`.
    ///
    /// Deadlines must lie within half the counter range of `self`.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn has_reached(self, deadline: Millis) -> bool {
        (self.0.wrapping_sub(deadline.0) as i32) >= 0
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Monotonic time source with a blocking delay primitive.
pub trait Clock {
    /// Current timestamp.
    fn now(&self) -> Millis;

    /// Blocks the caller for `ms` milliseconds.
    ///
    /// The default spins on [`Clock::now`]. Implementations with a hardware
    /// delay should override it.
    fn busy_wait_ms(&mut self, ms: u32) {
        let start = self.now();
        while self.now().wrapping_since(start) < ms {
            core::hint::spin_loop();
        }
    }
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now(&self) -> Millis {
        (**self).now()
    }

    fn busy_wait_ms(&mut self, ms: u32) {
        (**self).busy_wait_ms(ms);
    }
}
