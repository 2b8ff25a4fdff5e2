//! Single-slot animation state machine.
//!
//! Provides [`SlotSequencer`] which walks one slot through its [`Pattern`],
//! and the [`PixelStrip`] trait the multi-slot sequencer renders into.

use crate::COLOR_OFF;
use crate::sequence::Pattern;
use crate::time::{TimeDuration, TimeInstant};
use palette::Srgb;

/// Trait for abstracting the addressable pixel strip.
///
/// Implement this for your strip driver (WS2812 over RMT/PIO/SPI, etc.).
/// Writes are buffered by the driver until [`show`](PixelStrip::show) is
/// called, which lets the sequencer batch one flush per tick.
pub trait PixelStrip {
    /// Stores the color for one pixel without pushing it to the hardware.
    fn set_pixel(&mut self, index: usize, color: Srgb<u8>);

    /// Pushes all buffered pixel colors to the hardware.
    fn show(&mut self);
}

/// The current state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotState {
    /// No pattern loaded. Slot renders off.
    Idle,
    /// Pattern loaded, waiting for its first tick.
    Loaded,
    /// Pattern actively playing.
    Running,
}

/// Plays a pattern on one slot.
///
/// The slot is advanced by [`update`](SlotSequencer::update), which computes
/// the color for the given instant. Fades are re-evaluated from the elapsed
/// time on every call, so irregular tick intervals do not accumulate error.
///
/// # Type Parameters
/// * `I` - Time instant type
/// * `N` - Maximum number of segments in a pattern
#[derive(Debug, Clone)]
pub struct SlotSequencer<I: TimeInstant, const N: usize> {
    pattern: Option<Pattern<N>>,
    cursor: usize,
    last_advance: Option<I>,
    current_color: Srgb<u8>,
}

impl<I: TimeInstant, const N: usize> SlotSequencer<I, N> {
    /// Creates a new idle slot rendering off.
    pub fn new() -> Self {
        Self {
            pattern: None,
            cursor: 0,
            last_advance: None,
            current_color: COLOR_OFF,
        }
    }

    /// Replaces the pattern and rewinds to its first segment.
    ///
    /// The rendered color is kept until the next update so that the change is
    /// picked up as a visible transition.
    pub fn load(&mut self, pattern: Pattern<N>) {
        self.pattern = Some(pattern);
        self.cursor = 0;
        self.last_advance = None;
    }

    /// Drops the pattern and turns the slot off.
    ///
    /// Returns true if the rendered color changed.
    pub fn clear(&mut self) -> bool {
        self.pattern = None;
        self.cursor = 0;
        self.last_advance = None;

        if self.current_color != COLOR_OFF {
            self.current_color = COLOR_OFF;
            true
        } else {
            false
        }
    }

    /// Advances the pattern to `now` and recomputes the color.
    ///
    /// Returns true if the rendered color changed.
    pub fn update(&mut self, now: I) -> bool {
        let Some(pattern) = self.pattern.as_ref() else {
            return false;
        };
        let segments = pattern.segments();

        let new_color = match self.last_advance {
            None => {
                self.last_advance = Some(now);
                segments[self.cursor].color
            }
            Some(last) => {
                let elapsed = now.duration_since(last).as_millis();
                let segment = &segments[self.cursor];
                if elapsed >= u64::from(segment.hold_ms) {
                    self.cursor = (self.cursor + 1) % segments.len();
                    self.last_advance = Some(now);
                    segments[self.cursor].color
                } else {
                    // elapsed < hold_ms, which is a u32
                    segment.color_at(elapsed as u32)
                }
            }
        };

        if new_color != self.current_color {
            self.current_color = new_color;
            true
        } else {
            false
        }
    }

    /// Returns the current state of the slot.
    pub fn state(&self) -> SlotState {
        match (&self.pattern, self.last_advance) {
            (None, _) => SlotState::Idle,
            (Some(_), None) => SlotState::Loaded,
            (Some(_), Some(_)) => SlotState::Running,
        }
    }

    /// Returns the color the slot currently renders.
    pub fn current_color(&self) -> Srgb<u8> {
        self.current_color
    }

    /// Returns the index of the segment being played.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns a reference to the loaded pattern, if any.
    pub fn pattern(&self) -> Option<&Pattern<N>> {
        self.pattern.as_ref()
    }
}

impl<I: TimeInstant, const N: usize> Default for SlotSequencer<I, N> {
    fn default() -> Self {
        Self::new()
    }
}
