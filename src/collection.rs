use crate::COLOR_OFF;
use crate::sequence::{Pattern, PatternBuilder};
use crate::sequencer::{PixelStrip, SlotSequencer, SlotState};
use crate::time::TimeInstant;
use crate::types::{PatternError, Transition};
use heapless::Vec;
use palette::Srgb;

/// An identifier for a slot within the sequencer.
///
/// Slot ids are physical pixel indices on the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId(pub usize);

impl From<usize> for SlotId {
    fn from(id: usize) -> Self {
        SlotId(id)
    }
}

impl From<SlotId> for usize {
    fn from(id: SlotId) -> Self {
        id.0
    }
}

/// Errors that can occur during sequencer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerError {
    /// The slot id is not below the configured slot count.
    SlotOutOfRange { slot: SlotId, count: usize },

    /// More slots were requested than the sequencer can hold.
    TooManySlots { requested: usize, capacity: usize },

    /// The pattern was rejected.
    Pattern(PatternError),
}

impl core::fmt::Display for SequencerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SequencerError::SlotOutOfRange { slot, count } => {
                write!(f, "slot {} is out of range for {} slots", slot.0, count)
            }
            SequencerError::TooManySlots {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "{} slots requested but only {} are available",
                    requested, capacity
                )
            }
            SequencerError::Pattern(err) => {
                write!(f, "pattern error: {}", err)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SequencerError {}

impl From<PatternError> for SequencerError {
    fn from(err: PatternError) -> Self {
        SequencerError::Pattern(err)
    }
}

/// Drives every slot of the pixel strip.
///
/// Owns the strip and one [`SlotSequencer`] per configured slot. Each tick
/// advances all slots, writes the pixels that changed and flushes the strip
/// once, so the hardware sees at most one update per tick.
///
/// # Type Parameters
/// * `I` - Time instant type
/// * `L` - Pixel strip implementation type
/// * `SLOTS` - Maximum number of slots
/// * `N` - Maximum number of segments per pattern
pub struct Sequencer<I: TimeInstant, L: PixelStrip, const SLOTS: usize, const N: usize> {
    strip: L,
    slots: Vec<SlotSequencer<I, N>, SLOTS>,
}

impl<I, L, const SLOTS: usize, const N: usize> Sequencer<I, L, SLOTS, N>
where
    I: TimeInstant,
    L: PixelStrip,
{
    /// Creates a sequencer with no slots configured.
    pub fn new(strip: L) -> Self {
        Self {
            strip,
            slots: Vec::new(),
        }
    }

    /// Allocates `count` idle slots and blanks the strip.
    ///
    /// # Errors
    /// Returns `TooManySlots` if `count` exceeds `SLOTS`.
    pub fn configure(&mut self, count: usize) -> Result<(), SequencerError> {
        if count > SLOTS {
            return Err(SequencerError::TooManySlots {
                requested: count,
                capacity: SLOTS,
            });
        }

        self.slots.clear();
        for index in 0..count {
            // Cannot fail: count <= SLOTS
            let _ = self.slots.push(SlotSequencer::new());
            self.strip.set_pixel(index, COLOR_OFF);
        }
        self.strip.show();
        debug!("sequencer configured with {} slots", count);
        Ok(())
    }

    /// Parses `text` and loads it onto the slot.
    ///
    /// On error the slot keeps its previous pattern, position and color.
    pub fn parse(&mut self, id: SlotId, text: &str) -> Result<(), SequencerError> {
        self.check(id)?;
        let pattern = Pattern::parse(text)?;
        self.load(id, pattern)
    }

    /// Loads an already built pattern onto the slot.
    pub fn load(&mut self, id: SlotId, pattern: Pattern<N>) -> Result<(), SequencerError> {
        self.check(id)?;
        debug!("slot {} loaded with {} segments", id.0, pattern.len());
        self.slots[id.0].load(pattern);
        Ok(())
    }

    /// Clears one slot, or every slot when `id` is `None`.
    ///
    /// Returns whether any pixel went dark; the strip is flushed if so.
    pub fn reset(&mut self, id: Option<SlotId>) -> Result<bool, SequencerError> {
        let changed = match id {
            Some(id) => {
                self.check(id)?;
                let changed = self.slots[id.0].clear();
                if changed {
                    self.strip.set_pixel(id.0, COLOR_OFF);
                }
                changed
            }
            None => {
                let mut changed = false;
                for (index, slot) in self.slots.iter_mut().enumerate() {
                    if slot.clear() {
                        self.strip.set_pixel(index, COLOR_OFF);
                        changed = true;
                    }
                }
                changed
            }
        };

        if changed {
            self.strip.show();
        }
        Ok(changed)
    }

    /// Advances every slot to `now`.
    ///
    /// Returns true if at least one pixel changed, in which case the strip
    /// has been flushed.
    pub fn tick(&mut self, now: I) -> bool {
        let mut changed = false;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.update(now) {
                self.strip.set_pixel(index, slot.current_color());
                changed = true;
            }
        }

        if changed {
            self.strip.show();
        }
        changed
    }

    /// Loads a "bouncing dot" animation across all slots.
    ///
    /// The dot travels from the last slot to the first and back, spending
    /// `hold_ms` on each step and fading between neighbours. A cycle takes
    /// `2 * (count - 1)` steps, so `N` must be at least that large.
    pub fn chase(&mut self, color: Srgb<u8>, hold_ms: u32) -> Result<(), SequencerError> {
        let count = self.slots.len();
        if count == 0 {
            return Ok(());
        }
        if count == 1 {
            return self.load(SlotId(0), Pattern::solid(color)?);
        }

        let period = 2 * (count - 1);
        if period > N {
            return Err(PatternError::TooManySegments.into());
        }

        // Build every pattern first so a failure leaves all slots untouched
        let mut patterns: Vec<Pattern<N>, SLOTS> = Vec::new();
        for slot in 0..count {
            let lit = count - 1 - slot;
            let mut builder = PatternBuilder::<N>::new();
            for step in 0..period {
                let on = step == lit || step == (period - lit) % period;
                let step_color = if on { color } else { COLOR_OFF };
                builder = builder.segment(step_color, hold_ms, Transition::Gradient)?;
            }
            let _ = patterns.push(builder.build()?);
        }

        for (slot, pattern) in self.slots.iter_mut().zip(patterns) {
            slot.load(pattern);
        }
        Ok(())
    }

    /// Returns the number of configured slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the color the slot currently renders.
    pub fn color(&self, id: SlotId) -> Result<Srgb<u8>, SequencerError> {
        self.check(id)?;
        Ok(self.slots[id.0].current_color())
    }

    /// Returns the current state of the slot.
    pub fn state(&self, id: SlotId) -> Result<SlotState, SequencerError> {
        self.check(id)?;
        Ok(self.slots[id.0].state())
    }

    /// Returns how many segments the slot's pattern holds (0 when idle).
    pub fn segment_count(&self, id: SlotId) -> Result<usize, SequencerError> {
        self.check(id)?;
        Ok(self.slots[id.0].pattern().map_or(0, |p| p.len()))
    }

    /// Returns true if no slot has a pattern loaded.
    pub fn is_idle(&self) -> bool {
        self.slots.iter().all(|slot| slot.state() == SlotState::Idle)
    }

    /// Returns the slot's state machine.
    pub fn slot(&self, id: SlotId) -> Result<&SlotSequencer<I, N>, SequencerError> {
        self.check(id)?;
        Ok(&self.slots[id.0])
    }

    /// Returns a reference to the pixel strip.
    pub fn strip(&self) -> &L {
        &self.strip
    }

    /// Returns a mutable reference to the pixel strip.
    pub fn strip_mut(&mut self) -> &mut L {
        &mut self.strip
    }

    fn check(&self, id: SlotId) -> Result<(), SequencerError> {
        if id.0 < self.slots.len() {
            Ok(())
        } else {
            Err(SequencerError::SlotOutOfRange {
                slot: id,
                count: self.slots.len(),
            })
        }
    }
}
