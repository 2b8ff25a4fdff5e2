//! Result codes and their wire tokens.

/// Result of a command or the subject of a notification.
///
/// The numeric value is stable and is what the host parses; the text after
/// it is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StatusCode {
    Ok = 0,
    CommandError = 10,
    UnknownCommand = 11,
    BadFormat = 12,
    IntegerParse = 13,
    StringParse = 14,
    SlotError = 20,
    BadPattern = 21,
    FileNotFound = 22,
    CommandTooLong = 23,
    StorageFull = 30,
    FileIo = 31,
    NoWifi = 32,
    WifiConnectFailed = 33,
    WifiConnected = 50,
    WifiSsidNotFound = 51,
    WifiAuthFailed = 52,
    WifiDisconnected = 53,
    Error = 90,
}

impl StatusCode {
    /// Returns the numeric code.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns the token written on the wire, e.g. `"21 Bad LED pattern"`.
    pub fn token(self) -> &'static str {
        match self {
            StatusCode::Ok => "00 OK",
            StatusCode::CommandError => "10 Command error",
            StatusCode::UnknownCommand => "11 Unknown command",
            StatusCode::BadFormat => "12 Bad command format",
            StatusCode::IntegerParse => "13 Integer parse error",
            StatusCode::StringParse => "14 String parse error",
            StatusCode::SlotError => "20 Slot error",
            StatusCode::BadPattern => "21 Bad LED pattern",
            StatusCode::FileNotFound => "22 File not found",
            StatusCode::CommandTooLong => "23 Too long command",
            StatusCode::StorageFull => "30 Storage full",
            StatusCode::FileIo => "31 File IO error",
            StatusCode::NoWifi => "32 No Wi-Fi connection",
            StatusCode::WifiConnectFailed => "33 Wi-Fi connect failed",
            StatusCode::WifiConnected => "50 Wi-Fi connected",
            StatusCode::WifiSsidNotFound => "51 Wi-Fi ssid not found",
            StatusCode::WifiAuthFailed => "52 Wi-Fi authentication failed",
            StatusCode::WifiDisconnected => "53 Wi-Fi disconnected",
            StatusCode::Error => "90 Error",
        }
    }

    /// Looks up a numeric code, falling back to [`StatusCode::Error`].
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => StatusCode::Ok,
            10 => StatusCode::CommandError,
            11 => StatusCode::UnknownCommand,
            12 => StatusCode::BadFormat,
            13 => StatusCode::IntegerParse,
            14 => StatusCode::StringParse,
            20 => StatusCode::SlotError,
            21 => StatusCode::BadPattern,
            22 => StatusCode::FileNotFound,
            23 => StatusCode::CommandTooLong,
            30 => StatusCode::StorageFull,
            31 => StatusCode::FileIo,
            32 => StatusCode::NoWifi,
            33 => StatusCode::WifiConnectFailed,
            50 => StatusCode::WifiConnected,
            51 => StatusCode::WifiSsidNotFound,
            52 => StatusCode::WifiAuthFailed,
            53 => StatusCode::WifiDisconnected,
            _ => StatusCode::Error,
        }
    }

    /// Returns true for [`StatusCode::Ok`].
    #[inline]
    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

impl core::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.token())
    }
}
