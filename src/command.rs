//! Host commands and their argument validation.
//!
//! A completed line is turned into a [`Command`] before anything is touched,
//! so a malformed argument list never leaves a half-applied side effect.

use crate::config::{PASSWORD_CAPACITY, PATH_CAPACITY, SSID_CAPACITY};
use crate::scan;
use crate::status::StatusCode;

/// Highest accepted `volume` argument.
pub const MAX_VOLUME_PERCENT: u32 = 100;

/// A parsed host command borrowing its arguments from the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    /// Empty line: identify the device.
    About,
    /// `wifi`: report station status.
    WifiStatus,
    /// `wifi <ssid> <password>`: start joining a network.
    WifiJoin { ssid: &'a str, password: &'a str },
    /// `led-on <slot> <pattern>`: play a pattern on a logical slot.
    LedOn { slot: i32, pattern: &'a str },
    /// `led-off [slot]`: clear one logical slot or all of them.
    LedOff { slot: Option<i32> },
    /// `play "path-or-url"`: start playback (empty path only stops).
    Play { path: &'a str },
    /// `stop`: stop playback.
    Stop,
    /// `volume <0..100>`: set output level in percent.
    Volume { percent: u32 },
    /// `upload "path" <size>`: receive `size` raw bytes into `path`.
    Upload { path: &'a str, size: u32 },
    /// `remove "path"`: delete a stored file.
    Remove { path: &'a str },
    /// `list`: enumerate stored files.
    List,
}

type Parser = for<'a> fn(&'a str) -> Result<Command<'a>, StatusCode>;

/// Keywords in match order. Each is followed by a space or the end of line.
const PARSERS: &[(&str, Parser)] = &[
    ("wifi", parse_wifi),
    ("led-on", parse_led_on),
    ("led-off", parse_led_off),
    ("play", parse_play),
    ("stop", parse_stop),
    ("volume", parse_volume),
    ("upload", parse_upload),
    ("remove", parse_remove),
    ("list", parse_list),
];

impl<'a> Command<'a> {
    /// Parses a completed line (without its terminator).
    ///
    /// # Errors
    /// Returns the status code to answer with: `UnknownCommand` for an
    /// unrecognized keyword, otherwise the code for the first bad argument.
    pub fn parse(line: &'a str) -> Result<Self, StatusCode> {
        let line = scan::skip_ws(line);
        if line.is_empty() {
            return Ok(Command::About);
        }

        PARSERS
            .iter()
            .find_map(|(word, parser)| scan::keyword(line, word).map(|rest| parser(rest)))
            .unwrap_or(Err(StatusCode::UnknownCommand))
    }
}

/// Accepts `command` only if nothing but spaces is left.
fn finish<'a>(rest: &str, command: Command<'a>) -> Result<Command<'a>, StatusCode> {
    if scan::at_end(rest) {
        Ok(command)
    } else {
        Err(StatusCode::BadFormat)
    }
}

/// Reads a string argument no longer than `capacity` bytes.
fn bounded_string(input: &str, capacity: usize) -> Result<(&str, &str), StatusCode> {
    let (value, rest) = scan::string(input).map_err(|_| StatusCode::BadFormat)?;
    if value.len() > capacity {
        return Err(StatusCode::StringParse);
    }
    Ok((value, rest))
}

/// Reads a path argument, leaving room for the leading `/`.
fn path(input: &str) -> Result<(&str, &str), StatusCode> {
    bounded_string(input, PATH_CAPACITY - 1)
}

fn parse_wifi(rest: &str) -> Result<Command<'_>, StatusCode> {
    if scan::at_end(rest) {
        return Ok(Command::WifiStatus);
    }
    let (ssid, rest) = bounded_string(rest, SSID_CAPACITY)?;
    let (password, rest) = bounded_string(rest, PASSWORD_CAPACITY)?;
    finish(rest, Command::WifiJoin { ssid, password })
}

fn parse_led_on(rest: &str) -> Result<Command<'_>, StatusCode> {
    let (slot, pattern) = scan::int(rest).map_err(|_| StatusCode::IntegerParse)?;
    Ok(Command::LedOn { slot, pattern })
}

fn parse_led_off(rest: &str) -> Result<Command<'_>, StatusCode> {
    if scan::at_end(rest) {
        return Ok(Command::LedOff { slot: None });
    }
    let (slot, rest) = scan::int(rest).map_err(|_| StatusCode::IntegerParse)?;
    finish(rest, Command::LedOff { slot: Some(slot) })
}

fn parse_play(rest: &str) -> Result<Command<'_>, StatusCode> {
    let (path, rest) = path(rest)?;
    finish(rest, Command::Play { path })
}

fn parse_stop(rest: &str) -> Result<Command<'_>, StatusCode> {
    finish(rest, Command::Stop)
}

fn parse_volume(rest: &str) -> Result<Command<'_>, StatusCode> {
    let (percent, rest) = scan::uint(rest).map_err(|_| StatusCode::BadFormat)?;
    let command = finish(rest, Command::Volume { percent })?;
    if percent > MAX_VOLUME_PERCENT {
        return Err(StatusCode::CommandError);
    }
    Ok(command)
}

fn parse_upload(rest: &str) -> Result<Command<'_>, StatusCode> {
    let (path, rest) = path(rest)?;
    let (size, rest) = scan::uint(rest).map_err(|_| StatusCode::BadFormat)?;
    let command = finish(rest, Command::Upload { path, size })?;
    if path.is_empty() || size == 0 {
        return Err(StatusCode::CommandError);
    }
    Ok(command)
}

fn parse_remove(rest: &str) -> Result<Command<'_>, StatusCode> {
    let (path, rest) = path(rest)?;
    finish(rest, Command::Remove { path })
}

fn parse_list(rest: &str) -> Result<Command<'_>, StatusCode> {
    finish(rest, Command::List)
}
