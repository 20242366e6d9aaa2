//! Host command console
//!
//! Runs in the foreground context: reads bytes from the host, edits and
//! parses lines, arms the strip and reports latched frames. It never waits
//! on the timing engine except for the bounded busy wait before re-arming.

use core::convert::Infallible;

use embassy_time::{Duration, Instant};
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_io::{Write as _, WriteFmtError};
#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::color::Rgb;
use crate::command::{Command, CommandError};
use crate::frame::ChannelOrder;
use crate::line::{ERASE_SEQUENCE, LineEditor, LineEvent};
use crate::strip::Strip;
use crate::transport::HostLink;

/// Default line buffer size, enough for `send` with 17 colors
pub const DEFAULT_LINE_CAPACITY: usize = 128;

/// Line length needed for a `send` to `max_leds` LEDs, single-spaced
pub const fn send_line_capacity(max_leds: usize) -> usize {
    let mut digits = 1;
    let mut rest = max_leds / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    "send ".len() + digits + max_leds * " RRGGBB".len()
}

pub const HELP_TEXT: &str = "\r\nUSB-WS2812 Gadget, Sends colour bytes to WS2812 chips\r\n\r\n\
Example Commands\r\n  \
send <led count> <RGB1> <RGB2> <RGBn> - Send a command\r\n  \
status                       - Show engine state\r\n  \
help                         - Display this screen\r\n";

const SEND_USAGE: &str = "usage: send <led count> <RGB1> <RGB2> <RGBn>\r\n\
eg:    send 3 FF0000 00FF00 0000FF\r\n";

/// Console behaviour settings
#[derive(Debug, Clone, Copy)]
pub struct ConsoleConfig {
    /// Channel order used when serializing colors
    pub order: ChannelOrder,
    /// How long `send` waits for a running transmission before giving up
    pub busy_timeout: Duration,
    /// Delay before the first session, after the host link comes up
    pub startup_delay: Duration,
    /// Print `.` for every latched frame
    pub notify_latch: bool,
}

impl ConsoleConfig {
    pub const DEFAULT: Self = Self {
        order: ChannelOrder::Rgb,
        busy_timeout: Duration::from_millis(5),
        startup_delay: Duration::from_millis(1000),
        notify_latch: true,
    };
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Error raised while talking to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError<E> {
    /// The host link failed
    Transport(E),
    /// Formatting a response failed
    Format,
}

impl<E> From<WriteFmtError<E>> for ConsoleError<E> {
    fn from(value: WriteFmtError<E>) -> Self {
        match value {
            WriteFmtError::Other(err) => Self::Transport(err),
            _ => Self::Format,
        }
    }
}

/// Indicator placeholder for consoles without a status LED
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndicator;

impl ErrorType for NoIndicator {
    type Error = Infallible;
}

impl OutputPin for NoIndicator {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Whether the host is still attached after a [`Console::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Disconnected,
}

type ConsoleResult<T, H> = Result<T, ConsoleError<<H as embedded_io::ErrorType>::Error>>;

/// Line-oriented command interpreter driving a [`Strip`]
///
/// `I` is an optional status LED: lit while waiting for a host, dark while a
/// session is running.
pub struct Console<
    'a,
    H,
    const MAX_LEDS: usize,
    const LINE: usize = DEFAULT_LINE_CAPACITY,
    I = NoIndicator,
> {
    host: H,
    strip: &'a Strip<MAX_LEDS>,
    editor: LineEditor<LINE>,
    config: ConsoleConfig,
    latched_seen: u32,
    indicator: I,
}

impl<'a, H: HostLink, const MAX_LEDS: usize, const LINE: usize> Console<'a, H, MAX_LEDS, LINE> {
    pub fn new(host: H, strip: &'a Strip<MAX_LEDS>, config: ConsoleConfig) -> Self {
        Self {
            host,
            strip,
            editor: LineEditor::new(),
            config,
            latched_seen: strip.frames_latched(),
            indicator: NoIndicator,
        }
    }

    /// Attach a host-session status LED
    pub fn with_indicator<I: OutputPin>(
        self,
        indicator: I,
    ) -> Console<'a, H, MAX_LEDS, LINE, I> {
        Console {
            host: self.host,
            strip: self.strip,
            editor: self.editor,
            config: self.config,
            latched_seen: self.latched_seen,
            indicator,
        }
    }
}

impl<H: HostLink, I: OutputPin, const MAX_LEDS: usize, const LINE: usize>
    Console<'_, H, MAX_LEDS, LINE, I>
{
    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub const fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub const fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Serve hosts forever
    ///
    /// Waits the configured startup delay once, then runs one session per
    /// host connection.
    pub fn run(&mut self) -> ! {
        self.indicator.set_high().ok();
        embassy_time::block_for(self.config.startup_delay);
        loop {
            self.wait_for_host();
            match self.run_session() {
                Ok(()) => {
                    #[cfg(feature = "esp32-log")]
                    println!("[Console.run] host disconnected");
                }
                Err(_err) => {
                    #[cfg(feature = "esp32-log")]
                    println!("[Console.run] session failed: {:?}", _err);
                }
            }
        }
    }

    /// Spin until a host terminal is attached, with the indicator lit
    pub fn wait_for_host(&mut self) {
        self.indicator.set_high().ok();
        while !self.host.is_connected() {
            core::hint::spin_loop();
        }
    }

    /// Serve one connected host until it goes away
    ///
    /// The indicator is dark for the duration of the session and lit again
    /// when it ends, also on error.
    pub fn run_session(&mut self) -> ConsoleResult<(), H> {
        self.indicator.set_low().ok();
        let result = self.serve();
        self.indicator.set_high().ok();
        result
    }

    fn serve(&mut self) -> ConsoleResult<(), H> {
        self.host.discard_input().map_err(ConsoleError::Transport)?;
        self.editor.clear();
        self.show_help()?;

        while self.poll()? == SessionStatus::Active {}
        Ok(())
    }

    /// Handle at most one received byte without blocking
    pub fn poll(&mut self) -> ConsoleResult<SessionStatus, H> {
        self.report_latched()?;

        if !self.host.read_ready().map_err(ConsoleError::Transport)? {
            if self.host.is_connected() {
                return Ok(SessionStatus::Active);
            }
            return Ok(SessionStatus::Disconnected);
        }

        let mut byte = [0u8; 1];
        if self.host.read(&mut byte).map_err(ConsoleError::Transport)? == 1 {
            self.handle_byte(byte[0])?;
        }
        Ok(SessionStatus::Active)
    }

    fn handle_byte(&mut self, byte: u8) -> ConsoleResult<(), H> {
        match self.editor.feed(byte) {
            LineEvent::None => Ok(()),
            LineEvent::Echo(c) => self.write(&[c]),
            LineEvent::Erase => self.write(ERASE_SEQUENCE),
            LineEvent::Submit => self.submit(),
        }
    }

    fn submit(&mut self) -> ConsoleResult<(), H> {
        if self.editor.is_overflowed() {
            #[cfg(feature = "esp32-log")]
            println!("[Console.submit] dropped line over {} characters", LINE);
            self.editor.clear();
            write!(self.host, "\r\nline too long, at most {} characters\r\n", LINE)?;
            return Ok(());
        }
        if self.editor.is_empty() {
            return Ok(());
        }
        self.write(b"\r\n")?;

        let parsed = Command::<MAX_LEDS>::parse(self.editor.line());
        let result = match parsed {
            Ok(command) => self.execute(command),
            Err(CommandError::Empty) => Ok(()),
            Err(CommandError::Unknown) => {
                let word = self.editor.line().split_ascii_whitespace().next();
                write!(self.host, "Unknown command: {}\r\n", word.unwrap_or_default())
                    .map_err(ConsoleError::from)
            }
            Err(err) => {
                #[cfg(feature = "esp32-log")]
                println!("[Console.submit] rejected send: {:?}", err);
                write!(self.host, "send: {}\r\n", err)?;
                self.write(SEND_USAGE.as_bytes())
            }
        };
        self.editor.clear();
        result
    }

    fn execute(&mut self, command: Command<MAX_LEDS>) -> ConsoleResult<(), H> {
        match command {
            Command::Send(colors) => self.send(&colors),
            Command::Help => self.show_help(),
            Command::Status => self.show_status(),
        }
    }

    fn send(&mut self, colors: &[Rgb]) -> ConsoleResult<(), H> {
        if !self.wait_idle() {
            return self.write(b"send: busy\r\n");
        }

        match self.strip.arm_colors(colors, self.config.order) {
            Ok(()) => Ok(()),
            Err(err) => {
                write!(self.host, "send: {}\r\n", err)?;
                Ok(())
            }
        }
    }

    /// Wait up to `busy_timeout` for the engine to return to idle
    fn wait_idle(&self) -> bool {
        if self.strip.is_idle() {
            return true;
        }

        let started = Instant::now();
        while started.elapsed() < self.config.busy_timeout {
            if self.strip.is_idle() {
                return true;
            }
            core::hint::spin_loop();
        }
        self.strip.is_idle()
    }

    fn show_help(&mut self) -> ConsoleResult<(), H> {
        self.write(HELP_TEXT.as_bytes())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn show_status(&mut self) -> ConsoleResult<(), H> {
        let session = self.strip.session().as_raw();
        let latched = self.strip.frames_latched() as u16;
        write!(self.host, "Status: {:02x}\r\nLatched: {:04x}\r\n", session, latched)?;
        Ok(())
    }

    /// Print a `.` for each frame latched since the last call
    fn report_latched(&mut self) -> ConsoleResult<(), H> {
        let latched = self.strip.frames_latched();
        let pending = latched.wrapping_sub(self.latched_seen);
        self.latched_seen = latched;

        if self.config.notify_latch {
            for _ in 0..pending {
                self.write(b".")?;
            }
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> ConsoleResult<(), H> {
        self.host.write_all(bytes).map_err(ConsoleError::Transport)
    }
}
