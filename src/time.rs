//! Time abstraction traits for platform-agnostic timing.
//!
//! The sequencer never reads a clock on its own. The control loop hands it an
//! instant on every tick, so any monotonic (or wrapping) timer can drive it.

use core::time::Duration;

/// Trait abstraction for duration types.
pub trait TimeDuration: Copy + PartialEq {
    /// Converts duration to milliseconds.
    fn as_millis(&self) -> u64;
}

/// Trait abstraction for instant types.
pub trait TimeInstant: Copy {
    /// Duration type for this instant.
    type Duration: TimeDuration;

    /// Calculates duration since an earlier instant.
    fn duration_since(&self, earlier: Self) -> Self::Duration;
}

impl TimeDuration for Duration {
    fn as_millis(&self) -> u64 {
        Duration::as_millis(self) as u64
    }
}

/// A free-running 32-bit millisecond counter, as returned by most board
/// `millis()` timers.
///
/// Differences are computed with wrapping arithmetic, so animations keep
/// running across the ~49 day rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Millis(pub u32);

impl TimeInstant for Millis {
    type Duration = Duration;

    fn duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(u64::from(self.0.wrapping_sub(earlier.0)))
    }
}

impl From<u32> for Millis {
    fn from(ms: u32) -> Self {
        Millis(ms)
    }
}
