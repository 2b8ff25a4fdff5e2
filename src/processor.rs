//! Serial command protocol engine.
//!
//! Provides [`Processor`], which frames inbound bytes into command lines (or
//! raw upload data), runs the commands against the peripherals and writes
//! response and notification lines back to the host.
//!
//! # Wire format
//!
//! ```text
//! host   → device   <command> [args...] '\n' | "\r\n"
//! device → host     <response-prefix> <NN text>[detail]['+']
//!                   <notify-prefix> <NN text>['+']
//!                   [body lines, after a '+' response]
//! ```
//!
//! An `upload "path" <size>` command is followed by exactly `size` raw bytes
//! on the same stream. The transfer ends by count alone.

use crate::collection::{Sequencer, SequencerError, SlotId};
use crate::command::{Command, MAX_VOLUME_PERCENT};
use crate::config::{
    CHUNK_CAPACITY, DEFAULT_SLOT_COUNT, LINE_CAPACITY, MAX_SEGMENTS, MESSAGE_CAPACITY,
    PASSWORD_CAPACITY, PATH_CAPACITY, ProcessorConfig, SSID_CAPACITY,
};
use crate::device::{
    AudioPlayer, FileStore, Network, StorageError, StoredFile, Transport,
};
use crate::link::{LinkState, NetworkEvent, WifiState};
use crate::sequencer::PixelStrip;
use crate::status::StatusCode;
use crate::time::TimeInstant;
use core::fmt::{self, Write as _};
use heapless::{String, Vec};
use palette::Srgb;

/// Color of the idle animation shown until the host first talks to us.
pub const IDLE_COLOR: Srgb<u8> = Srgb::new(0x33, 0x33, 0xCC);

/// Step length of the idle animation.
pub const IDLE_STEP_MS: u32 = 2000;

/// Phase of the protocol session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// Collecting a command line.
    Listening,
    /// Counting raw upload bytes into a file.
    UploadingFile,
    /// Discarding input up to the next line terminator.
    Resyncing,
}

impl From<SequencerError> for StatusCode {
    fn from(err: SequencerError) -> Self {
        match err {
            SequencerError::SlotOutOfRange { .. } => StatusCode::SlotError,
            SequencerError::TooManySlots { .. } => StatusCode::CommandError,
            SequencerError::Pattern(_) => StatusCode::BadPattern,
        }
    }
}

/// The devices a [`Processor`] drives.
pub struct Peripherals<L, A, F, W, T> {
    pub strip: L,
    pub audio: A,
    pub storage: F,
    pub network: W,
    pub transport: T,
}

/// An in-progress file transfer.
struct Upload<W> {
    file: Option<W>,
    failure: Option<StorageError>,
    declared: u32,
    received: u32,
    chunk: Vec<u8, CHUNK_CAPACITY>,
}

impl<W: StoredFile> Upload<W> {
    fn new(file: W, declared: u32) -> Self {
        Self {
            file: Some(file),
            failure: None,
            declared,
            received: 0,
            chunk: Vec::new(),
        }
    }

    fn remaining(&self) -> usize {
        (self.declared - self.received) as usize
    }

    /// Stages payload bytes, writing out every full chunk.
    fn accept(&mut self, mut payload: &[u8]) {
        while !payload.is_empty() {
            let room = CHUNK_CAPACITY - self.chunk.len();
            let (head, tail) = payload.split_at(room.min(payload.len()));
            // Cannot fail: head fits in the remaining room
            let _ = self.chunk.extend_from_slice(head);
            self.received += head.len() as u32;
            payload = tail;

            if self.chunk.is_full() {
                self.flush();
            }
        }
    }

    /// Writes staged bytes to the file.
    ///
    /// A failed or short write closes the file; the remaining bytes are still
    /// counted so the stream stays in step with the host.
    fn flush(&mut self) {
        if self.chunk.is_empty() {
            return;
        }
        trace!("upload flush {}/{}", self.received, self.declared);

        let result = match self.file.as_mut() {
            Some(file) => file.write(&self.chunk),
            None => Ok(self.chunk.len()),
        };
        match result {
            Ok(written) if written == self.chunk.len() => {}
            Ok(_) => self.fail(StorageError::Full),
            Err(err) => self.fail(err),
        }
        self.chunk.clear();
    }

    fn fail(&mut self, err: StorageError) {
        warn!("upload write failed after {} bytes", self.received);
        if let Some(file) = self.file.take() {
            let _ = file.close();
        }
        self.failure = Some(err);
    }

    /// Flushes the tail and closes the file, returning the byte count.
    fn finish(mut self) -> Result<u32, StorageError> {
        self.flush();
        match (self.file.take(), self.failure) {
            (Some(file), _) => {
                file.close()?;
                Ok(self.received)
            }
            (None, Some(err)) => Err(err),
            (None, None) => Err(StorageError::Io),
        }
    }
}

enum Phase<W> {
    Listening,
    Uploading(Upload<W>),
    Resyncing,
}

/// `fmt::Write` sink that keeps as much text as fits and drops the rest.
struct Truncating<'b, const N: usize>(&'b mut String<N>);

impl<const N: usize> fmt::Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut end = s.len().min(N - self.0.len());
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        // Cannot fail: the prefix fits in the remaining room
        let _ = self.0.push_str(&s[..end]);
        Ok(())
    }
}

/// Formats one line and hands it to the transport.
///
/// Lines longer than `MESSAGE_CAPACITY` are cut short on a char boundary.
fn emit<T: Transport>(transport: &mut T, link: &LinkState, args: fmt::Arguments<'_>) {
    if !link.is_attached() {
        return;
    }
    let mut line: String<MESSAGE_CAPACITY> = String::new();
    let _ = Truncating(&mut line).write_fmt(args);
    transport.write_line(&line);
}

/// Adds the leading `/` a stored path needs.
fn normalize(path: &str) -> Result<String<PATH_CAPACITY>, StatusCode> {
    let mut normalized = String::new();
    if !path.starts_with('/') {
        normalized.push('/').map_err(|_| StatusCode::StringParse)?;
    }
    normalized
        .push_str(path)
        .map_err(|_| StatusCode::StringParse)?;
    Ok(normalized)
}

fn is_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// The protocol engine and owner of all peripherals.
///
/// Call [`receive`](Processor::receive) with every chunk read from the host,
/// [`process`](Processor::process) once per control-loop cycle, and the
/// transport attach/detach hooks whenever the host link changes.
///
/// # Type Parameters
/// * `'l` - Lifetime of the shared [`LinkState`]
/// * `I` - Time instant type
/// * `L` - Pixel strip
/// * `A` - Audio engine
/// * `F` - File store
/// * `W` - Network stack
/// * `T` - Host transport
/// * `SLOTS` - Number of animated slots
/// * `N` - Maximum segments per slot pattern
pub struct Processor<
    'l,
    I,
    L,
    A,
    F,
    W,
    T,
    const SLOTS: usize = DEFAULT_SLOT_COUNT,
    const N: usize = MAX_SEGMENTS,
> where
    I: TimeInstant,
    L: PixelStrip,
    A: AudioPlayer,
    F: FileStore,
    W: Network<'l>,
    T: Transport,
{
    config: ProcessorConfig,
    sequencer: Sequencer<I, L, SLOTS, N>,
    audio: A,
    storage: F,
    network: W,
    transport: T,
    link: &'l LinkState,
    phase: Phase<F::File>,
    line: Vec<u8, LINE_CAPACITY>,
    swallow_lf: bool,
    contacted: bool,
    subscribed: bool,
    boosted: bool,
    playing: String<PATH_CAPACITY>,
    ssid: String<SSID_CAPACITY>,
    password: String<PASSWORD_CAPACITY>,
}

impl<'l, I, L, A, F, W, T, const SLOTS: usize, const N: usize>
    Processor<'l, I, L, A, F, W, T, SLOTS, N>
where
    I: TimeInstant,
    L: PixelStrip,
    A: AudioPlayer,
    F: FileStore,
    W: Network<'l>,
    T: Transport,
{
    /// Creates a listening processor with all `SLOTS` slots idle.
    pub fn new(
        config: ProcessorConfig,
        peripherals: Peripherals<L, A, F, W, T>,
        link: &'l LinkState,
    ) -> Self {
        let mut sequencer = Sequencer::new(peripherals.strip);
        // Cannot fail: the slot count equals the capacity
        let _ = sequencer.configure(SLOTS);

        Self {
            config,
            sequencer,
            audio: peripherals.audio,
            storage: peripherals.storage,
            network: peripherals.network,
            transport: peripherals.transport,
            link,
            phase: Phase::Listening,
            line: Vec::new(),
            swallow_lf: false,
            contacted: false,
            subscribed: false,
            boosted: false,
            playing: String::new(),
            ssid: String::new(),
            password: String::new(),
        }
    }

    /// Starts the idle animation. It runs until the host first sends data.
    pub fn start_idle_animation(&mut self) -> Result<(), SequencerError> {
        self.sequencer.chase(IDLE_COLOR, IDLE_STEP_MS)
    }

    /// Consumes a chunk of inbound bytes of any size.
    pub fn receive(&mut self, data: &[u8]) {
        if !self.contacted {
            self.contacted = true;
            let _ = self.sequencer.reset(None);
        }

        let mut rest = data;
        while let Some((&first, tail)) = rest.split_first() {
            if core::mem::take(&mut self.swallow_lf) && first == b'\n' {
                rest = tail;
                continue;
            }
            rest = match self.phase {
                Phase::Listening => self.frame(rest),
                Phase::Uploading(_) => self.upload(rest),
                Phase::Resyncing => self.resync(rest),
            };
        }
    }

    /// Runs one control-loop cycle.
    pub fn process(&mut self, now: I) {
        self.audio.poll();
        if self.boosted && !self.audio.is_running() {
            self.audio.set_boost(false);
            self.boosted = false;
        }

        self.sequencer.tick(now);
        self.flush_notice();
    }

    /// The host link came up; sends any deferred notification.
    pub fn on_transport_attached(&mut self) {
        self.link.set_attached(true);
        self.flush_notice();
    }

    /// The host link went away; notifications are deferred from now on.
    pub fn on_transport_detached(&mut self) {
        self.link.set_attached(false);
    }

    /// Records a connectivity event delivered on the control-loop context.
    ///
    /// Events from other contexts go through a [`LinkHandle`](crate::LinkHandle)
    /// and are announced on the next [`process`](Processor::process).
    pub fn on_network_event(&mut self, event: NetworkEvent) {
        self.link.record(event);
        self.flush_notice();
    }

    /// Returns the current session phase.
    pub fn session_state(&self) -> SessionState {
        match self.phase {
            Phase::Listening => SessionState::Listening,
            Phase::Uploading(_) => SessionState::UploadingFile,
            Phase::Resyncing => SessionState::Resyncing,
        }
    }

    /// Returns the last credentials given to `wifi`, if any.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.ssid.is_empty() || self.password.is_empty() {
            None
        } else {
            Some((self.ssid.as_str(), self.password.as_str()))
        }
    }

    /// Returns the path or URL being played, if any.
    pub fn now_playing(&self) -> Option<&str> {
        (!self.playing.is_empty()).then_some(self.playing.as_str())
    }

    pub fn sequencer(&self) -> &Sequencer<I, L, SLOTS, N> {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer<I, L, SLOTS, N> {
        &mut self.sequencer
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn storage(&self) -> &F {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut F {
        &mut self.storage
    }

    pub fn network(&self) -> &W {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut W {
        &mut self.network
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn link(&self) -> &'l LinkState {
        self.link
    }

    // ---------------------------------------------------------------------
    // Framing
    // ---------------------------------------------------------------------

    /// Collects command bytes, running each completed line.
    ///
    /// Returns early with the unread input when a line changes the phase.
    fn frame<'d>(&mut self, data: &'d [u8]) -> &'d [u8] {
        for (i, &byte) in data.iter().enumerate() {
            if core::mem::take(&mut self.swallow_lf) && byte == b'\n' {
                continue;
            }
            match byte {
                b'\n' | b'\r' => {
                    self.swallow_lf = byte == b'\r';
                    self.run_line();
                    if !matches!(self.phase, Phase::Listening) {
                        return &data[i + 1..];
                    }
                }
                _ => {
                    if self.line.push(byte).is_err() {
                        warn!("command line overflow, resyncing");
                        self.line.clear();
                        self.phase = Phase::Resyncing;
                        return &data[i + 1..];
                    }
                }
            }
        }
        &[]
    }

    /// Drops input up to and including the next `\n`.
    fn resync<'d>(&mut self, data: &'d [u8]) -> &'d [u8] {
        match data.iter().position(|b| *b == b'\n') {
            Some(i) => {
                debug!("resynced after {} bytes", i + 1);
                self.phase = Phase::Listening;
                &data[i + 1..]
            }
            None => &[],
        }
    }

    /// Feeds raw bytes into the open upload, completing it when the declared
    /// size has arrived.
    fn upload<'d>(&mut self, data: &'d [u8]) -> &'d [u8] {
        let Phase::Uploading(upload) = &mut self.phase else {
            return data;
        };

        let (payload, rest) = data.split_at(upload.remaining().min(data.len()));
        upload.accept(payload);
        if upload.remaining() > 0 {
            return rest;
        }

        if let Phase::Uploading(upload) = core::mem::replace(&mut self.phase, Phase::Listening) {
            match upload.finish() {
                Ok(size) => {
                    info!("upload complete, {} bytes", size);
                    self.respond_with(
                        StatusCode::Ok,
                        format_args!(", Upload Complete. size={}", size),
                    );
                }
                Err(err) => self.respond(err.into()),
            }
        }
        rest
    }

    fn run_line(&mut self) {
        let line = core::mem::take(&mut self.line);
        let result = match core::str::from_utf8(&line) {
            Ok(text) => self.dispatch(text),
            Err(_) => Err(StatusCode::BadFormat),
        };
        if let Err(code) = result {
            debug!("command failed: {}", code.code());
            self.respond(code);
        }
    }

    // ---------------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------------

    /// Runs one command. Success responses are sent by the command itself;
    /// an error is returned for the caller to report.
    fn dispatch(&mut self, text: &str) -> Result<(), StatusCode> {
        let command = Command::parse(text)?;
        debug!("command {}", command);

        match command {
            Command::About => {
                let identity = self.config.identity;
                self.respond_with(StatusCode::Ok, format_args!(", {}", identity));
                Ok(())
            }
            Command::WifiStatus => {
                let status = self.network.status();
                self.respond_with(StatusCode::Ok, format_args!(", {}", status.as_str()));
                Ok(())
            }
            Command::WifiJoin { ssid, password } => self.join(ssid, password),
            Command::LedOn { slot, pattern } => {
                let id = self.physical_slot(slot)?;
                self.sequencer.parse(id, pattern)?;
                self.respond(StatusCode::Ok);
                Ok(())
            }
            Command::LedOff { slot } => {
                let id = slot.map(|s| self.physical_slot(s)).transpose()?;
                self.sequencer.reset(id)?;
                self.respond(StatusCode::Ok);
                Ok(())
            }
            Command::Play { path } => self.play(path),
            Command::Stop => {
                self.stop_playback(None);
                self.respond(StatusCode::Ok);
                Ok(())
            }
            Command::Volume { percent } => {
                let level = Self::native_volume(percent);
                self.audio.set_volume(level);
                self.respond(StatusCode::Ok);
                Ok(())
            }
            Command::Upload { path, size } => self.begin_upload(path, size),
            Command::Remove { path } => self.remove(path),
            Command::List => {
                self.list();
                Ok(())
            }
        }
    }

    /// Maps a host slot number onto the strip; host slot 0 is the last pixel.
    fn physical_slot(&self, logical: i32) -> Result<SlotId, StatusCode> {
        let count = self.sequencer.slot_count();
        match usize::try_from(logical) {
            Ok(index) if index < count => Ok(SlotId(count - index - 1)),
            _ => Err(StatusCode::SlotError),
        }
    }

    /// Scales `0..=100` onto `0..=A::MAX_VOLUME`, never muting a non-zero
    /// request.
    fn native_volume(percent: u32) -> u8 {
        let scaled = percent.min(MAX_VOLUME_PERCENT) * u32::from(A::MAX_VOLUME) / MAX_VOLUME_PERCENT;
        match (scaled, percent) {
            (0, p) if p > 0 => 1,
            (level, _) => level as u8,
        }
    }

    fn join(&mut self, ssid: &str, password: &str) -> Result<(), StatusCode> {
        self.ssid.clear();
        self.password.clear();
        self.ssid
            .push_str(ssid)
            .map_err(|_| StatusCode::StringParse)?;
        self.password
            .push_str(password)
            .map_err(|_| StatusCode::StringParse)?;

        if !self.subscribed {
            self.network.subscribe(self.link.handle());
            self.subscribed = true;
        }
        self.link.begin_join();
        info!("joining network {}", ssid);
        self.network.join(ssid, password)?;
        self.respond(StatusCode::Ok);
        Ok(())
    }

    fn play(&mut self, path: &str) -> Result<(), StatusCode> {
        self.stop_playback(None);
        if path.is_empty() {
            self.respond(StatusCode::Ok);
            return Ok(());
        }

        let mut source: String<PATH_CAPACITY> = String::new();
        if is_url(path) {
            if self.link.wifi_state() != WifiState::Connected {
                return Err(StatusCode::NoWifi);
            }
            source
                .push_str(path)
                .map_err(|_| StatusCode::StringParse)?;
            self.boost();
            self.audio.play_stream(&source)?;
        } else {
            source = normalize(path)?;
            if !self.storage.exists(&source) {
                return Err(StatusCode::FileNotFound);
            }
            self.boost();
            self.audio.play_file(&source)?;
        }

        info!("playing {}", source.as_str());
        self.playing = source;
        self.respond(StatusCode::Ok);
        Ok(())
    }

    fn begin_upload(&mut self, path: &str, size: u32) -> Result<(), StatusCode> {
        let target = normalize(path)?;
        self.stop_playback(Some(target.as_str()));
        let file = self.storage.create(&target)?;

        info!("receiving {} bytes into {}", size, target.as_str());
        self.phase = Phase::Uploading(Upload::new(file, size));
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), StatusCode> {
        let target = normalize(path)?;
        if !self.storage.exists(&target) {
            return Err(StatusCode::FileNotFound);
        }
        self.stop_playback(Some(target.as_str()));
        self.storage.remove(&target)?;
        self.respond(StatusCode::Ok);
        Ok(())
    }

    fn list(&mut self) {
        let usage = self.storage.usage();
        self.respond_body(StatusCode::Ok);

        let link = self.link;
        let Self {
            storage, transport, ..
        } = self;
        emit(
            transport,
            link,
            format_args!("Storage Usage: {}/{}", usage.used, usage.total),
        );
        emit(transport, link, format_args!("Files:"));
        storage.list(&mut |entry| {
            emit(transport, link, format_args!("{} {}", entry.name, entry.size));
        });
        emit(transport, link, format_args!(""));
    }

    /// Stops playback; with `only` set, only if that file is playing.
    fn stop_playback(&mut self, only: Option<&str>) {
        if only.is_some_and(|path| path != self.playing.as_str()) {
            return;
        }
        self.audio.stop();
        self.playing.clear();
    }

    fn boost(&mut self) {
        if !self.boosted {
            self.audio.set_boost(true);
            self.boosted = true;
        }
    }

    // ---------------------------------------------------------------------
    // Output
    // ---------------------------------------------------------------------

    fn flush_notice(&mut self) {
        if !self.link.is_attached() {
            return;
        }
        if let Some(code) = self.link.take_notice() {
            info!("link notice {}", code.code());
            let prefix = self.config.notify_prefix;
            emit(
                &mut self.transport,
                self.link,
                format_args!("{} {}", prefix, code.token()),
            );
        }
    }

    fn respond(&mut self, code: StatusCode) {
        self.respond_with(code, format_args!(""));
    }

    fn respond_body(&mut self, code: StatusCode) {
        let prefix = self.config.response_prefix;
        emit(
            &mut self.transport,
            self.link,
            format_args!("{} {}+", prefix, code.token()),
        );
    }

    fn respond_with(&mut self, code: StatusCode, detail: fmt::Arguments<'_>) {
        let prefix = self.config.response_prefix;
        emit(
            &mut self.transport,
            self.link,
            format_args!("{} {}{}", prefix, code.token(), detail),
        );
    }
}
