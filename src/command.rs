//! Host command parsing
//!
//! Grammar, one command per line, words separated by whitespace:
//!
//! ```text
//! send <led count> <RRGGBB> [<RRGGBB> ...]
//! help
//! status
//! ```

use core::fmt;
use core::str::SplitAsciiWhitespace;

use heapless::Vec;

use crate::color::{Rgb, rgb_from_hex};

const COMMAND_SEND: &str = "send";
const COMMAND_HELP: &str = "help";
const COMMAND_STATUS: &str = "status";

/// A parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<const MAX_LEDS: usize> {
    /// Transmit one color per LED
    Send(Vec<Rgb, MAX_LEDS>),
    /// Print usage
    Help,
    /// Print engine state
    Status,
}

/// Reasons a line could not be turned into a [`Command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Line has no words
    Empty,
    /// First word is not a known command
    Unknown,
    /// `send` without a LED count
    MissingCount,
    /// LED count is not a decimal number
    InvalidCount,
    /// LED count exceeds the frame buffer
    TooManyLeds { requested: usize, capacity: usize },
    /// Number of colors differs from the LED count
    CountMismatch { expected: usize, found: usize },
    /// Color at `position` (0-based) is not `RRGGBB` hex
    InvalidColor { position: usize },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty line"),
            Self::Unknown => f.write_str("unknown command"),
            Self::MissingCount => f.write_str("missing led count"),
            Self::InvalidCount => f.write_str("invalid led count"),
            Self::TooManyLeds {
                requested,
                capacity,
            } => write!(f, "{} leds requested, at most {} supported", requested, capacity),
            Self::CountMismatch { expected, found } => {
                write!(f, "expected {} colors, got {}", expected, found)
            }
            Self::InvalidColor { position } => write!(f, "invalid color #{}", position + 1),
        }
    }
}

impl<const MAX_LEDS: usize> Command<MAX_LEDS> {
    /// Parse a submitted line
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_ascii_whitespace();
        let keyword = words.next().ok_or(CommandError::Empty)?;

        if keyword.eq_ignore_ascii_case(COMMAND_SEND) {
            Self::parse_send(words)
        } else if keyword.eq_ignore_ascii_case(COMMAND_HELP) {
            Ok(Self::Help)
        } else if keyword.eq_ignore_ascii_case(COMMAND_STATUS) {
            Ok(Self::Status)
        } else {
            Err(CommandError::Unknown)
        }
    }

    fn parse_send(mut words: SplitAsciiWhitespace<'_>) -> Result<Self, CommandError> {
        let count: usize = words
            .next()
            .ok_or(CommandError::MissingCount)?
            .parse()
            .map_err(|_| CommandError::InvalidCount)?;
        if count > MAX_LEDS {
            return Err(CommandError::TooManyLeds {
                requested: count,
                capacity: MAX_LEDS,
            });
        }

        let mut colors: Vec<Rgb, MAX_LEDS> = Vec::new();
        while let Some(word) = words.next() {
            if colors.len() == count {
                // Extra words are counted, not parsed.
                return Err(CommandError::CountMismatch {
                    expected: count,
                    found: count + 1 + words.count(),
                });
            }
            let position = colors.len();
            let color = rgb_from_hex(word).ok_or(CommandError::InvalidColor { position })?;
            colors.push(color).map_err(|_| CommandError::TooManyLeds {
                requested: count,
                capacity: MAX_LEDS,
            })?;
        }

        if colors.len() != count {
            return Err(CommandError::CountMismatch {
                expected: count,
                found: colors.len(),
            });
        }
        Ok(Self::Send(colors))
    }
}
