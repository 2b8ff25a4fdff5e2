//! Traits for the peripherals the control core drives.
//!
//! Implement these for your board: the audio decoder, the flash file system,
//! the Wi-Fi station and the host link. None of the methods block; anything
//! slow is expected to run on its own task or be polled.

use crate::link::LinkHandle;
use crate::status::StatusCode;

/// Errors reported by the audio engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioError {
    /// Source could not be opened.
    Open,
    /// Source opened but decoding could not start.
    Decode,
}

impl core::fmt::Display for AudioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AudioError::Open => write!(f, "audio source could not be opened"),
            AudioError::Decode => write!(f, "audio decoding failed to start"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AudioError {}

impl From<AudioError> for StatusCode {
    fn from(_: AudioError) -> Self {
        StatusCode::FileIo
    }
}

/// Audio decode and playback engine.
pub trait AudioPlayer {
    /// Native volume ceiling; requests in `0..=100` are scaled to `0..=MAX_VOLUME`.
    const MAX_VOLUME: u8 = 21;

    /// Starts playing a file from local storage.
    fn play_file(&mut self, path: &str) -> Result<(), AudioError>;

    /// Starts playing a network stream.
    fn play_stream(&mut self, url: &str) -> Result<(), AudioError>;

    /// Stops playback. Does nothing when idle.
    fn stop(&mut self);

    /// Sets the output level in native units.
    fn set_volume(&mut self, level: u8);

    /// Returns true while audio is being decoded.
    fn is_running(&self) -> bool;

    /// Gives the decoder a chance to run. Called once per control cycle.
    fn poll(&mut self) {}

    /// Raises (or drops) CPU/resource readiness needed for decoding.
    fn set_boost(&mut self, _boost: bool) {}
}

/// Errors reported by the file store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// File does not exist.
    NotFound,
    /// No space left.
    Full,
    /// Any other I/O failure.
    Io,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StorageError::NotFound => write!(f, "file not found"),
            StorageError::Full => write!(f, "storage full"),
            StorageError::Io => write!(f, "storage I/O error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StorageError {}

impl From<StorageError> for StatusCode {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => StatusCode::FileNotFound,
            StorageError::Full => StatusCode::StorageFull,
            StorageError::Io => StatusCode::FileIo,
        }
    }
}

/// Bytes used and available on the file store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorageUsage {
    pub used: u64,
    pub total: u64,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry<'a> {
    pub name: &'a str,
    pub size: u64,
}

/// A file opened for writing.
pub trait StoredFile {
    /// Appends bytes, returning how many were written.
    fn write(&mut self, data: &[u8]) -> Result<usize, StorageError>;

    /// Flushes and closes the file.
    fn close(self) -> Result<(), StorageError>;
}

/// Persistent, path-addressed file storage.
pub trait FileStore {
    type File: StoredFile;

    /// Returns true if `path` names an existing file.
    fn exists(&self, path: &str) -> bool;

    /// Creates (or truncates) `path` for writing.
    fn create(&mut self, path: &str) -> Result<Self::File, StorageError>;

    /// Deletes `path`.
    fn remove(&mut self, path: &str) -> Result<(), StorageError>;

    /// Returns used and total bytes.
    fn usage(&self) -> StorageUsage;

    /// Calls `visit` once per stored file.
    fn list(&self, visit: &mut dyn FnMut(FileEntry<'_>));
}

/// Station status as reported by the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkStatus {
    Disabled,
    Idle,
    NoSsid,
    ScanCompleted,
    Connected,
    ConnectFailed,
    ConnectionLost,
    Disconnected,
}

impl NetworkStatus {
    /// Text reported by a bare `wifi` command.
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkStatus::Disabled => "Disabled",
            NetworkStatus::Idle => "Idle",
            NetworkStatus::NoSsid => "NoSSID",
            NetworkStatus::ScanCompleted => "ScanComplete",
            NetworkStatus::Connected => "Connected",
            NetworkStatus::ConnectFailed => "ConnectFailed",
            NetworkStatus::ConnectionLost => "ConnectionLost",
            NetworkStatus::Disconnected => "Disconnected",
        }
    }
}

/// The network stack refused to start a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JoinError;

impl core::fmt::Display for JoinError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "network join could not be started")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for JoinError {}

impl From<JoinError> for StatusCode {
    fn from(_: JoinError) -> Self {
        StatusCode::WifiConnectFailed
    }
}

/// Wi-Fi station control.
///
/// Connection results arrive later through the [`LinkHandle`] passed to
/// [`subscribe`](Network::subscribe), possibly from another context.
pub trait Network<'l> {
    /// Drops any current association and starts joining `ssid`.
    fn join(&mut self, ssid: &str, password: &str) -> Result<(), JoinError>;

    /// Returns the station status.
    fn status(&self) -> NetworkStatus;

    /// Registers where connect/disconnect events are to be reported.
    fn subscribe(&mut self, events: LinkHandle<'l>);
}

/// Outbound half of the host link.
pub trait Transport {
    /// Writes one line; the terminator is added by the implementation.
    fn write_line(&mut self, line: &str);
}
