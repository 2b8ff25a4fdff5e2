//! Slice-based text scanning for command arguments and LED patterns.
//!
//! Every parser takes the remaining input and hands back the parsed value
//! together with whatever input is left after it. Only the ASCII space counts
//! as whitespace, matching what the line framer passes through.

/// Errors produced while scanning a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanError {
    /// Input ended where a token was expected.
    Missing,

    /// Token was not a decimal integer, or it overflowed.
    Integer,

    /// Unterminated quote or a stray character after an unquoted string.
    String,

    /// Token did not start with a hex digit.
    Hex,
}

impl core::fmt::Display for ScanError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ScanError::Missing => write!(f, "missing token"),
            ScanError::Integer => write!(f, "malformed integer"),
            ScanError::String => write!(f, "malformed string"),
            ScanError::Hex => write!(f, "malformed hex value"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ScanError {}

/// Skips leading spaces.
#[inline]
pub fn skip_ws(input: &str) -> &str {
    input.trim_start_matches(' ')
}

/// Returns true if only spaces remain.
#[inline]
pub fn at_end(input: &str) -> bool {
    skip_ws(input).is_empty()
}

/// Returns true for `0-9`, `a-f` and `A-F`.
#[inline]
pub fn is_hex(byte: u8) -> bool {
    byte.is_ascii_hexdigit()
}

/// Matches `word` at the start of `line` when it is followed by a single
/// space or the end of the line, returning the text after the word.
pub fn keyword<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(word)?;
    if rest.is_empty() || rest.starts_with(' ') {
        Some(rest)
    } else {
        None
    }
}

/// Length of the leading run of ASCII digits.
fn digit_run(input: &str) -> usize {
    input.bytes().take_while(u8::is_ascii_digit).count()
}

/// Parses an unsigned decimal after optional spaces.
pub fn uint(input: &str) -> Result<(u32, &str), ScanError> {
    let input = skip_ws(input);
    if input.is_empty() {
        return Err(ScanError::Missing);
    }
    let len = digit_run(input);
    if len == 0 {
        return Err(ScanError::Integer);
    }
    let (digits, rest) = input.split_at(len);
    let value = digits.parse::<u32>().map_err(|_| ScanError::Integer)?;
    Ok((value, rest))
}

/// Parses a signed decimal (`-` prefix allowed) after optional spaces.
pub fn int(input: &str) -> Result<(i32, &str), ScanError> {
    let input = skip_ws(input);
    if input.is_empty() {
        return Err(ScanError::Missing);
    }
    let sign_len = usize::from(input.starts_with('-'));
    let len = digit_run(&input[sign_len..]);
    if len == 0 {
        return Err(ScanError::Integer);
    }
    let (number, rest) = input.split_at(sign_len + len);
    let value = number.parse::<i32>().map_err(|_| ScanError::Integer)?;
    Ok((value, rest))
}

/// Parses a string argument after optional spaces.
///
/// A leading `"` reads up to the closing quote (which is consumed). Otherwise
/// the string runs to the next space or the end of input. The returned slice
/// borrows from `input`.
pub fn string(input: &str) -> Result<(&str, &str), ScanError> {
    let input = skip_ws(input);
    if input.is_empty() {
        return Err(ScanError::Missing);
    }
    if let Some(quoted) = input.strip_prefix('"') {
        let end = quoted.find('"').ok_or(ScanError::String)?;
        return Ok((&quoted[..end], &quoted[end + 1..]));
    }
    let end = input.find(' ').unwrap_or(input.len());
    Ok(input.split_at(end))
}

/// Parses up to eight hex digits with no leading spaces.
///
/// Returns the value, the number of digits consumed and the remaining input.
pub fn hex(input: &str) -> Result<(u32, usize, &str), ScanError> {
    let len = input.bytes().take(8).take_while(|b| is_hex(*b)).count();
    if len == 0 {
        return Err(ScanError::Hex);
    }
    let (digits, rest) = input.split_at(len);
    let value = u32::from_str_radix(digits, 16).map_err(|_| ScanError::Hex)?;
    Ok((value, len, rest))
}
