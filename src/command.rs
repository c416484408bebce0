//! Serial command protocol
//!
//! One command per line, case-sensitive, surrounding whitespace ignored:
//!
//! | Command | Effect |
//! |---|---|
//! | `start` | start broadcasting |
//! | `stop` | stop broadcasting |
//! | `list` | print the label table |
//! | `status` | print whether broadcasting is active |
//! | `set <index> <text>` | replace the label at `index` (single digit) with `text` |
//! | `help` | print this summary |

use crate::{BeaconError, config};
use heapless::Vec;

/// One raw command line as received from the console
pub type Line = Vec<u8, { config::MAX_LINE_LEN }>;

/// A console line, or the rejection for a line that was thrown away
pub type Input = Result<Line, BeaconError>;

/// Command summary printed at boot and on `help`
pub const HELP: &str = "\
Beacon Spam Tool
Commands:
start - Start broadcasting
stop - Stop broadcasting
list - List current SSIDs
set <position> <name> - Set new SSID (position 0-9)
status - Show current status
help - Show this help";

/// A parsed console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Start,
    Stop,
    List,
    Status,
    Help,
    /// Replace one label; `text` is the rest of the line verbatim
    Set { index: usize, text: &'a str },
}

impl<'a> Command<'a> {
    /// Parse a raw line.
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse_bytes(line: &'a [u8]) -> Result<Option<Self>, BeaconError> {
        let line = core::str::from_utf8(line).map_err(|_| BeaconError::UnknownCommand)?;
        Self::parse(line)
    }

    /// Parse a line of text.
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse(line: &'a str) -> Result<Option<Self>, BeaconError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let command = match line {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "list" => Command::List,
            "status" => Command::Status,
            "help" => Command::Help,
            _ => match line.strip_prefix("set ") {
                Some(args) => Self::parse_set(args)?,
                None => return Err(BeaconError::UnknownCommand),
            },
        };

        Ok(Some(command))
    }

    fn parse_set(args: &'a str) -> Result<Self, BeaconError> {
        let (index, text) = match args.split_once(' ') {
            Some((index, text)) => (index, text),
            None => (args, ""),
        };

        let index = match index.as_bytes() {
            [digit @ b'0'..=b'9'] => (digit - b'0') as usize,
            _ => return Err(BeaconError::InvalidIndex),
        };

        Ok(Command::Set { index, text })
    }
}

/// Accumulates console bytes into lines.
///
/// Both `\r` and `\n` end a line and blank lines are dropped, so `\r\n`,
/// `\n` and `\r` terminated input all work. A line longer than
/// [`config::MAX_LINE_LEN`] is never executed: it comes out as an `Err`
/// carrying the rejection for its verb.
pub struct LineAssembler {
    buffer: Line,
    overflowed: bool,
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            overflowed: false,
        }
    }

    /// Feed one byte, returning the line it completes
    pub fn push(&mut self, byte: u8) -> Option<Input> {
        match byte {
            b'\r' | b'\n' => {
                if self.overflowed {
                    log::warn!(
                        "[SERIAL] Line longer than {} bytes discarded",
                        config::MAX_LINE_LEN
                    );
                    let rejection = overflow_rejection(&self.buffer);
                    self.discard();
                    Some(Err(rejection))
                } else if self.buffer.is_empty() {
                    None
                } else {
                    Some(Ok(core::mem::take(&mut self.buffer)))
                }
            }
            _ => {
                if self.buffer.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }

    /// Feed a chunk of bytes, calling `on_line` for every completed line
    pub fn extend(&mut self, bytes: &[u8], mut on_line: impl FnMut(Input)) {
        for &byte in bytes {
            if let Some(input) = self.push(byte) {
                on_line(input);
            }
        }
    }

    /// Drop the partial line, e.g. after a UART error corrupted it
    pub fn discard(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
    }

    /// Bytes of the line collected so far
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}

/// Rejection for an over-long line, judged from the bytes that fit
fn overflow_rejection(prefix: &[u8]) -> BeaconError {
    let prefix = match core::str::from_utf8(prefix) {
        Ok(prefix) => prefix,
        // a multi-byte character may straddle the cut
        Err(e) => core::str::from_utf8(&prefix[..e.valid_up_to()]).unwrap_or_default(),
    };

    match prefix.trim_start().strip_prefix("set ") {
        Some(args) if !args.trim().is_empty() => match Command::parse_set(args) {
            Err(e) => e,
            Ok(_) => BeaconError::InvalidLabelLength,
        },
        _ => BeaconError::UnknownCommand,
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}
