#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`Processor`**: Frames host bytes into commands and uploads, runs them, answers
//! - **`Command`**: A validated host command borrowing its arguments from the line
//! - **`StatusCode`**: Numeric result codes sent in responses and notifications
//! - **`Sequencer`**: Drives one LED slot per strip pixel through timed patterns
//! - **`Pattern`**: A looping list of color segments (hold or fade)
//! - **`LinkState`**: Connectivity status shared with the network event context
//! - **`PixelStrip`**, **`AudioPlayer`**, **`FileStore`**, **`Network`**, **`Transport`**:
//!   Traits to implement for your board
//!
//! Colors are `Srgb<u8>`; gradients are computed per channel in `f32` and
//! truncated back to 8 bits.

#[macro_use]
mod fmt;

// Re-export Srgb from palette for user convenience
pub use palette::Srgb;

pub mod collection;
pub mod command;
pub mod config;
pub mod device;
pub mod link;
pub mod processor;
pub mod scan;
pub mod sequence;
pub mod sequencer;
pub mod status;
pub mod time;
pub mod types;

pub use collection::{Sequencer, SequencerError, SlotId};
pub use command::Command;
pub use config::ProcessorConfig;
pub use device::{
    AudioError, AudioPlayer, FileEntry, FileStore, JoinError, Network, NetworkStatus,
    StorageError, StorageUsage, StoredFile, Transport,
};
pub use link::{DisconnectReason, LinkHandle, LinkState, NetworkEvent, WifiState};
pub use processor::{Peripherals, Processor, SessionState};
pub use sequence::{Pattern, PatternBuilder};
pub use sequencer::{PixelStrip, SlotSequencer, SlotState};
pub use status::StatusCode;
pub use time::{Millis, TimeDuration, TimeInstant};
pub use types::{PatternError, Segment, Transition};

pub const COLOR_OFF: Srgb<u8> = Srgb::new(0, 0, 0);
