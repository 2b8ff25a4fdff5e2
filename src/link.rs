//! Connectivity state shared with the network event context.
//!
//! The network stack reports joins and drops from its own callback, which may
//! run outside the control loop. [`LinkState`] keeps only the latest status
//! plus the code of the notification still to send, so a burst of events
//! collapses into one notification that always reflects the newest status.
//! All fields are atomics. The pending notice is a single code where `0`
//! means none; the reader takes it with one swap, so each published change
//! is delivered exactly once.

use crate::status::StatusCode;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

/// Connection progress as tracked by the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WifiState {
    /// No join has been requested.
    Closed = 0,
    /// Join requested, no event yet.
    Connecting = 1,
    /// Associated with the access point.
    Connected = 2,
    /// Dropped or failed to join.
    Disconnected = 3,
}

impl WifiState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => WifiState::Connecting,
            2 => WifiState::Connected,
            3 => WifiState::Disconnected,
            _ => WifiState::Closed,
        }
    }
}

/// Why the station lost (or never got) its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisconnectReason {
    AuthExpired,
    AssocExpired,
    HandshakeTimeout,
    NoApFound,
    Other(u8),
}

impl DisconnectReason {
    /// Maps an 802.11 / ESP-IDF reason code.
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => DisconnectReason::AuthExpired,
            4 => DisconnectReason::AssocExpired,
            15 => DisconnectReason::HandshakeTimeout,
            201 => DisconnectReason::NoApFound,
            other => DisconnectReason::Other(other),
        }
    }

    /// Status code announced for this reason.
    pub fn status(self) -> StatusCode {
        match self {
            DisconnectReason::AuthExpired
            | DisconnectReason::AssocExpired
            | DisconnectReason::HandshakeTimeout => StatusCode::WifiAuthFailed,
            DisconnectReason::NoApFound => StatusCode::WifiSsidNotFound,
            DisconnectReason::Other(_) => StatusCode::WifiDisconnected,
        }
    }
}

/// An asynchronous connectivity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkEvent {
    Connected,
    Disconnected(DisconnectReason),
}

/// No notification waiting. Never a notice code.
const NO_NOTICE: u8 = StatusCode::Ok as u8;

/// Latest connectivity status, pending notification and transport
/// attachment.
#[derive(Debug)]
pub struct LinkState {
    wifi: AtomicU8,
    notice: AtomicU8,
    attached: AtomicBool,
}

impl LinkState {
    /// Creates a closed, detached link. Usable in a `static`.
    pub const fn new() -> Self {
        Self {
            wifi: AtomicU8::new(WifiState::Closed as u8),
            notice: AtomicU8::new(NO_NOTICE),
            attached: AtomicBool::new(false),
        }
    }

    /// Returns a handle for the network event callback.
    pub fn handle(&self) -> LinkHandle<'_> {
        LinkHandle { state: self }
    }

    /// Returns the latest known connection state.
    pub fn wifi_state(&self) -> WifiState {
        WifiState::from_u8(self.wifi.load(Ordering::Acquire))
    }

    /// Returns true while the command transport is attached.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Returns true if a notification is waiting to be sent.
    pub fn is_pending(&self) -> bool {
        self.notice.load(Ordering::Acquire) != NO_NOTICE
    }

    pub(crate) fn set_attached(&self, attached: bool) {
        self.attached.store(attached, Ordering::Release);
    }

    /// Marks a join as in progress without announcing anything.
    pub(crate) fn begin_join(&self) {
        self.wifi.store(WifiState::Connecting as u8, Ordering::Release);
    }

    /// Records an event. Returns false if it repeats the current state.
    pub fn record(&self, event: NetworkEvent) -> bool {
        let (state, notice) = match event {
            NetworkEvent::Connected => (WifiState::Connected, StatusCode::WifiConnected),
            NetworkEvent::Disconnected(reason) => (WifiState::Disconnected, reason.status()),
        };

        let previous = self.wifi.swap(state as u8, Ordering::AcqRel);
        if previous == state as u8 {
            return false;
        }
        self.notice.store(notice.code(), Ordering::Release);
        true
    }

    /// Takes the notice to send, if any.
    pub(crate) fn take_notice(&self) -> Option<StatusCode> {
        match self.notice.swap(NO_NOTICE, Ordering::AcqRel) {
            NO_NOTICE => None,
            code => Some(StatusCode::from_code(code)),
        }
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap, copyable reference to a [`LinkState`] for event producers.
#[derive(Debug, Clone, Copy)]
pub struct LinkHandle<'l> {
    state: &'l LinkState,
}

impl<'l> LinkHandle<'l> {
    /// Reports a successful join.
    pub fn connected(&self) -> bool {
        self.state.record(NetworkEvent::Connected)
    }

    /// Reports a dropped or failed connection.
    pub fn disconnected(&self, reason: DisconnectReason) -> bool {
        self.state.record(NetworkEvent::Disconnected(reason))
    }

    /// Returns the latest known connection state.
    pub fn wifi_state(&self) -> WifiState {
        self.state.wifi_state()
    }
}
