//! Shared test infrastructure for ledbell-core integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use ledbell_core::{
    AudioError, AudioPlayer, FileEntry, FileStore, JoinError, LinkHandle, LinkState, Millis,
    Network, NetworkStatus, Peripherals, PixelStrip, Processor, ProcessorConfig, StorageError,
    StorageUsage, StoredFile, Transport,
};
use palette::Srgb;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

// ============================================================================
// Colors
// ============================================================================

pub const RED: Srgb<u8> = Srgb::new(255, 0, 0);
pub const GREEN: Srgb<u8> = Srgb::new(0, 255, 0);
pub const BLUE: Srgb<u8> = Srgb::new(0, 0, 255);
pub const OFF: Srgb<u8> = Srgb::new(0, 0, 0);

// ============================================================================
// Mock Strip
// ============================================================================

pub const STRIP_LEN: usize = 6;

/// Pixel strip that remembers the latest color per pixel
#[derive(Debug, Default)]
pub struct MockStrip {
    pub pixels: [Srgb<u8>; STRIP_LEN],
    pub shows: usize,
}

impl PixelStrip for MockStrip {
    fn set_pixel(&mut self, index: usize, color: Srgb<u8>) {
        self.pixels[index] = color;
    }

    fn show(&mut self) {
        self.shows += 1;
    }
}

// ============================================================================
// Mock Audio
// ============================================================================

/// Audio engine that records what it was asked to play
#[derive(Debug, Default)]
pub struct MockAudio {
    pub source: Option<String>,
    pub streaming: bool,
    pub running: bool,
    pub volume: u8,
    pub stops: usize,
    pub boosted: bool,
    pub fail_start: bool,
}

impl AudioPlayer for MockAudio {
    fn play_file(&mut self, path: &str) -> Result<(), AudioError> {
        if self.fail_start {
            return Err(AudioError::Decode);
        }
        self.source = Some(path.to_string());
        self.streaming = false;
        self.running = true;
        Ok(())
    }

    fn play_stream(&mut self, url: &str) -> Result<(), AudioError> {
        if self.fail_start {
            return Err(AudioError::Open);
        }
        self.source = Some(url.to_string());
        self.streaming = true;
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
        self.source = None;
        self.running = false;
    }

    fn set_volume(&mut self, level: u8) {
        self.volume = level;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn set_boost(&mut self, boost: bool) {
        self.boosted = boost;
    }
}

// ============================================================================
// Mock Storage
// ============================================================================

type Files = Rc<RefCell<BTreeMap<String, Vec<u8>>>>;

/// In-memory file store with an optional capacity limit
#[derive(Debug)]
pub struct MockStore {
    pub files: Files,
    pub total: u64,
}

impl MockStore {
    pub fn new(total: u64) -> Self {
        Self {
            files: Rc::new(RefCell::new(BTreeMap::new())),
            total,
        }
    }

    pub fn insert(&self, path: &str, data: &[u8]) {
        self.files.borrow_mut().insert(path.to_string(), data.to_vec());
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    fn used(files: &BTreeMap<String, Vec<u8>>) -> u64 {
        files.values().map(|data| data.len() as u64).sum()
    }
}

/// File handle appending into the shared map
#[derive(Debug)]
pub struct MockFile {
    path: String,
    files: Files,
    total: u64,
}

impl StoredFile for MockFile {
    fn write(&mut self, data: &[u8]) -> Result<usize, StorageError> {
        let mut files = self.files.borrow_mut();
        let room = self.total.saturating_sub(MockStore::used(&files)) as usize;
        let written = data.len().min(room);
        files
            .get_mut(&self.path)
            .ok_or(StorageError::Io)?
            .extend_from_slice(&data[..written]);
        Ok(written)
    }

    fn close(self) -> Result<(), StorageError> {
        Ok(())
    }
}

impl FileStore for MockStore {
    type File = MockFile;

    fn exists(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn create(&mut self, path: &str) -> Result<MockFile, StorageError> {
        self.files.borrow_mut().insert(path.to_string(), Vec::new());
        Ok(MockFile {
            path: path.to_string(),
            files: Rc::clone(&self.files),
            total: self.total,
        })
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        self.files
            .borrow_mut()
            .remove(path)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    fn usage(&self) -> StorageUsage {
        StorageUsage {
            used: Self::used(&self.files.borrow()),
            total: self.total,
        }
    }

    fn list(&self, visit: &mut dyn FnMut(FileEntry<'_>)) {
        for (path, data) in self.files.borrow().iter() {
            visit(FileEntry {
                name: path.trim_start_matches('/'),
                size: data.len() as u64,
            });
        }
    }
}

// ============================================================================
// Mock Network
// ============================================================================

/// Network stack that records joins and keeps the subscribed handle
#[derive(Debug)]
pub struct MockNetwork<'l> {
    pub joins: Vec<(String, String)>,
    pub status: NetworkStatus,
    pub events: Option<LinkHandle<'l>>,
    pub refuse: bool,
}

impl Default for MockNetwork<'_> {
    fn default() -> Self {
        Self {
            joins: Vec::new(),
            status: NetworkStatus::Idle,
            events: None,
            refuse: false,
        }
    }
}

impl<'l> Network<'l> for MockNetwork<'l> {
    fn join(&mut self, ssid: &str, password: &str) -> Result<(), JoinError> {
        if self.refuse {
            return Err(JoinError);
        }
        self.joins.push((ssid.to_string(), password.to_string()));
        Ok(())
    }

    fn status(&self) -> NetworkStatus {
        self.status
    }

    fn subscribe(&mut self, events: LinkHandle<'l>) {
        self.events = Some(events);
    }
}

// ============================================================================
// Recording Transport
// ============================================================================

/// Transport that collects every outbound line
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub lines: Vec<String>,
}

impl RecordingTransport {
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

impl Transport for RecordingTransport {
    fn write_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

// ============================================================================
// Processor Helpers
// ============================================================================

pub type TestProcessor<'l> = Processor<
    'l,
    Millis,
    MockStrip,
    MockAudio,
    MockStore,
    MockNetwork<'l>,
    RecordingTransport,
>;

pub const STORAGE_TOTAL: u64 = 1_000_000;

/// Creates an attached processor with empty storage
pub fn processor(link: &LinkState) -> TestProcessor<'_> {
    processor_with_store(link, MockStore::new(STORAGE_TOTAL))
}

/// Creates an attached processor around the given store
pub fn processor_with_store(link: &LinkState, storage: MockStore) -> TestProcessor<'_> {
    let peripherals = Peripherals {
        strip: MockStrip::default(),
        audio: MockAudio::default(),
        storage,
        network: MockNetwork::default(),
        transport: RecordingTransport::default(),
    };
    let mut processor = Processor::new(ProcessorConfig::default(), peripherals, link);
    processor.on_transport_attached();
    processor
}

/// Feeds `input` in one chunk and returns the lines written in response
pub fn send(processor: &mut TestProcessor<'_>, input: &str) -> Vec<String> {
    processor.receive(input.as_bytes());
    processor.transport_mut().take()
}
