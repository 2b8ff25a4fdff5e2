//! Core types for pattern construction.

use palette::Srgb;

/// Hold duration used when a segment omits the `:ms` suffix.
pub const DEFAULT_HOLD_MS: u32 = 1000;

/// How a segment hands over to the one after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Hold the color flat, then jump (`,` in pattern text).
    Cut,

    /// Fade linearly into the next segment's color (`>` in pattern text).
    Gradient,
}

/// A single hold/gradient step of a slot's color sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Base color shown when the segment starts.
    pub color: Srgb<u8>,

    /// Time spent in this segment before moving on.
    pub hold_ms: u32,

    /// Per-millisecond channel change (red, green, blue).
    ///
    /// All zero unless the segment fades into its successor.
    pub delta: [f32; 3],
}

impl Segment {
    /// Creates a segment that holds `color` flat for `hold_ms`.
    #[inline]
    pub const fn new(color: Srgb<u8>, hold_ms: u32) -> Self {
        Self {
            color,
            hold_ms,
            delta: [0.0; 3],
        }
    }

    /// Returns true if this segment fades rather than holds.
    #[inline]
    pub fn is_gradient(&self) -> bool {
        self.delta.iter().any(|d| *d != 0.0)
    }

    /// Computes the color `elapsed_ms` into the segment.
    ///
    /// Each channel is truncated towards zero after applying its delta.
    pub fn color_at(&self, elapsed_ms: u32) -> Srgb<u8> {
        if !self.is_gradient() {
            return self.color;
        }
        let t = elapsed_ms as f32;
        let channel = |base: u8, delta: f32| (f32::from(base) + delta * t) as u8;
        Srgb::new(
            channel(self.color.red, self.delta[0]),
            channel(self.color.green, self.delta[1]),
            channel(self.color.blue, self.delta[2]),
        )
    }

    /// Sets the deltas so the color reaches `target` after `hold_ms`.
    pub(crate) fn fade_towards(&mut self, target: Srgb<u8>) {
        if self.hold_ms == 0 {
            self.delta = [0.0; 3];
            return;
        }
        let span = self.hold_ms as f32;
        let diff = |from: u8, to: u8| (i16::from(to) - i16::from(from)) as f32 / span;
        self.delta = [
            diff(self.color.red, target.red),
            diff(self.color.green, target.green),
            diff(self.color.blue, target.blue),
        ];
    }
}

/// Pattern parsing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PatternError {
    /// A color was not exactly six hex digits.
    MalformedHex,

    /// A `:` was not followed by an unsigned decimal.
    MalformedHold,

    /// No segment could be read.
    Empty,

    /// More segments than the slot can hold.
    TooManySegments,
}

impl core::fmt::Display for PatternError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PatternError::MalformedHex => {
                write!(f, "segment color must be six hex digits")
            }
            PatternError::MalformedHold => {
                write!(f, "hold suffix must be an unsigned decimal")
            }
            PatternError::Empty => {
                write!(f, "pattern must have at least one segment")
            }
            PatternError::TooManySegments => {
                write!(f, "pattern has more segments than the slot can hold")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PatternError {}
