//! Capacities and runtime settings.
//!
//! Capacities are compile-time constants (or const generic defaults) so the
//! whole core lives in statically sized buffers.

/// Pixels on the indicator strip of the reference board.
pub const DEFAULT_SLOT_COUNT: usize = 6;

/// Segments a single slot pattern may contain.
pub const MAX_SEGMENTS: usize = 16;

/// Longest command line, terminator excluded.
pub const LINE_CAPACITY: usize = 256;

/// Upload bytes staged before each storage write.
pub const CHUNK_CAPACITY: usize = 512;

/// Longest normalized file path, including the leading `/`.
pub const PATH_CAPACITY: usize = 80;

/// Longest SSID accepted by `wifi`.
pub const SSID_CAPACITY: usize = 33;

/// Longest passphrase accepted by `wifi`.
pub const PASSWORD_CAPACITY: usize = 64;

/// Longest outbound line, prefix and detail included.
pub const MESSAGE_CAPACITY: usize = 128;

/// Runtime settings of the protocol engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Text returned for an empty command line.
    pub identity: &'static str,

    /// Leads every command response line.
    pub response_prefix: &'static str,

    /// Leads every unsolicited notification line.
    pub notify_prefix: &'static str,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            identity: concat!("Yonabe Factory / ledbell / ", env!("CARGO_PKG_VERSION")),
            response_prefix: "RES",
            notify_prefix: "NTF",
        }
    }
}
