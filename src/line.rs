//! Bounded line editor for the host console
//!
//! Collects printable ASCII into a fixed buffer, handles backspace and
//! reports when a line is submitted with CR or LF.

use heapless::Vec;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;

/// Bytes written back to erase the last character on a terminal
pub const ERASE_SEQUENCE: &[u8] = b"\x08 \x08";

/// Result of feeding one byte to the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    /// Nothing to do (ignored byte, full buffer, backspace on empty line)
    None,
    /// Character was appended and should be echoed
    Echo(u8),
    /// Last character was removed, send [`ERASE_SEQUENCE`]
    Erase,
    /// Line terminator received, the line is ready
    Submit,
}

/// Fixed-capacity line buffer
#[derive(Debug, Default)]
pub struct LineEditor<const N: usize> {
    buf: Vec<u8, N>,
    overflowed: bool,
}

impl<const N: usize> LineEditor<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflowed: false,
        }
    }

    /// Process one received byte
    ///
    /// Characters past the capacity are dropped without echo and mark the
    /// line as overflowed until the next [`clear`](Self::clear).
    pub fn feed(&mut self, byte: u8) -> LineEvent {
        match byte {
            b'\r' | b'\n' => LineEvent::Submit,
            BACKSPACE | DELETE => {
                if self.buf.pop().is_some() {
                    LineEvent::Erase
                } else {
                    LineEvent::None
                }
            }
            b' '..=b'~' => match self.buf.push(byte) {
                Ok(()) => LineEvent::Echo(byte),
                Err(_) => {
                    self.overflowed = true;
                    LineEvent::None
                }
            },
            _ => LineEvent::None,
        }
    }

    /// Current line contents
    pub fn line(&self) -> &str {
        // Only printable ASCII is ever stored.
        core::str::from_utf8(&self.buf).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Check if characters were dropped since the last clear
    pub const fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }
}
