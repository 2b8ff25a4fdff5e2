use crate::scan;
use crate::types::{DEFAULT_HOLD_MS, PatternError, Segment, Transition};
use heapless::Vec;
use palette::Srgb;

/// A parsed color pattern ready to be played on a slot.
///
/// Holds the segment list with gradient deltas already resolved. The last
/// segment's gradient target wraps around to the first segment, so every
/// pattern loops seamlessly.
///
/// Pattern text follows this grammar (hex is case-insensitive):
///
/// ```text
/// pattern := segment (('>' | ',') segment)*
/// segment := HEX{6} (':' decimal-ms)?
/// ```
///
/// `,` holds the color flat and then cuts, `>` fades into the next segment.
/// The hold defaults to one second.
///
/// # Type Parameters
/// * `N` - Maximum number of segments this pattern can hold
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern<const N: usize> {
    segments: Vec<Segment, N>,
}

impl<const N: usize> Pattern<N> {
    /// Creates a new pattern builder.
    pub fn builder() -> PatternBuilder<N> {
        PatternBuilder::new()
    }

    /// Parses pattern text such as `FF0000:500>00FF00:500>`.
    ///
    /// Leading spaces are skipped and parsing stops at the first character
    /// that cannot begin a segment.
    ///
    /// # Errors
    /// * `MalformedHex` - A color is not exactly six hex digits
    /// * `MalformedHold` - A `:` is not followed by an unsigned decimal
    /// * `Empty` - No segment could be read
    /// * `TooManySegments` - More than `N` segments
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let mut rest = scan::skip_ws(text);
        let mut builder = PatternBuilder::new();

        while rest.as_bytes().first().is_some_and(|b| scan::is_hex(*b)) {
            let (rgb, digits, after) = scan::hex(rest).map_err(|_| PatternError::MalformedHex)?;
            if digits != 6 {
                return Err(PatternError::MalformedHex);
            }
            rest = after;

            let mut hold_ms = DEFAULT_HOLD_MS;
            if let Some(after) = rest.strip_prefix(':') {
                let (ms, after) = scan::uint(after).map_err(|_| PatternError::MalformedHold)?;
                hold_ms = ms;
                rest = after;
            }

            let transition = if let Some(after) = rest.strip_prefix('>') {
                rest = after;
                Transition::Gradient
            } else {
                if let Some(after) = rest.strip_prefix(',') {
                    rest = after;
                }
                Transition::Cut
            };

            builder = builder.segment(rgb_to_color(rgb), hold_ms, transition)?;
        }

        builder.build()
    }

    /// Creates a static single-color pattern.
    pub fn solid(color: Srgb<u8>) -> Result<Self, PatternError> {
        PatternBuilder::new()
            .segment(color, 0, Transition::Cut)?
            .build()
    }

    /// Returns the number of segments in this pattern.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false for a built pattern; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns a reference to the segment at the given index.
    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Returns all segments in playback order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Sum of all hold durations, i.e. the length of one loop.
    pub fn loop_ms(&self) -> u64 {
        self.segments.iter().map(|s| u64::from(s.hold_ms)).sum()
    }
}

/// Splits a `0xRRGGBB` value into a color.
fn rgb_to_color(rgb: u32) -> Srgb<u8> {
    Srgb::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

/// Builder for constructing patterns without going through text.
#[derive(Debug)]
pub struct PatternBuilder<const N: usize> {
    segments: Vec<(Segment, Transition), N>,
}

impl<const N: usize> PatternBuilder<N> {
    /// Creates a new empty pattern builder.
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Adds a segment to the pattern.
    ///
    /// # Errors
    /// Returns `TooManySegments` if the pattern capacity is exceeded.
    pub fn segment(
        mut self,
        color: Srgb<u8>,
        hold_ms: u32,
        transition: Transition,
    ) -> Result<Self, PatternError> {
        self.segments
            .push((Segment::new(color, hold_ms), transition))
            .map_err(|_| PatternError::TooManySegments)?;
        Ok(self)
    }

    /// Returns the number of segments added so far.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if no segment has been added.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolves gradient deltas and builds the pattern.
    ///
    /// A single segment is normalized to a static color (no hold, no fade).
    ///
    /// # Errors
    /// Returns `Empty` if no segment was added.
    pub fn build(self) -> Result<Pattern<N>, PatternError> {
        let count = self.segments.len();
        if count == 0 {
            return Err(PatternError::Empty);
        }

        let mut segments: Vec<Segment, N> = self.segments.iter().map(|(seg, _)| *seg).collect();

        if count == 1 {
            segments[0].hold_ms = 0;
            return Ok(Pattern { segments });
        }

        for (i, (_, transition)) in self.segments.iter().enumerate() {
            if *transition == Transition::Gradient {
                let target = segments[(i + 1) % count].color;
                segments[i].fade_towards(target);
            }
        }

        Ok(Pattern { segments })
    }
}

impl<const N: usize> Default for PatternBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}
