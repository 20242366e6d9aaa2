//! Frame buffer shared between the console and the timer interrupt
//!
//! Ownership of the buffer follows the session state. The foreground context
//! claims it by swapping the session from [`SessionState::Idle`] to
//! [`SessionState::Loading`], so only one writer can hold it. Storing
//! [`SessionState::Sending`] publishes the payload, and from then on the
//! interrupt context is the only reader until it stores `Idle` again.
//! No lock is taken on either side.

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

#[cfg(feature = "esp32-log")]
use esp_println::println;
use smart_leds::SmartLedsWrite;

use crate::color::Rgb;
use crate::frame::{ChannelOrder, FrameBuffer, LoadError};

/// Overall transmission phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Sending = 1,
    ResetGap = 2,
    /// A foreground writer holds the buffer; the engine ignores it
    Loading = 3,
}

impl SessionState {
    pub const fn from_raw(value: u8) -> Self {
        match value {
            1 => Self::Sending,
            2 => Self::ResetGap,
            3 => Self::Loading,
            _ => Self::Idle,
        }
    }

    pub const fn as_raw(self) -> u8 {
        self as u8
    }
}

/// Error returned when a transmission cannot be armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmError {
    /// A transmission is still in flight
    Busy,
    /// More LEDs than the frame buffer can hold
    TooManyLeds { requested: usize, capacity: usize },
    /// Fewer color bytes than `led_count * 3`
    ShortPayload { expected: usize, found: usize },
}

impl From<LoadError> for ArmError {
    fn from(value: LoadError) -> Self {
        match value {
            LoadError::TooManyLeds {
                requested,
                capacity,
            } => Self::TooManyLeds {
                requested,
                capacity,
            },
            LoadError::ShortPayload { expected, found } => Self::ShortPayload { expected, found },
        }
    }
}

impl fmt::Display for ArmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => f.write_str("busy"),
            Self::TooManyLeds {
                requested,
                capacity,
            } => write!(f, "{} leds requested, at most {} supported", requested, capacity),
            Self::ShortPayload { expected, found } => {
                write!(f, "expected {} color bytes, got {}", expected, found)
            }
        }
    }
}

/// LED strip state shared by the foreground and the timing engine
pub struct Strip<const MAX_LEDS: usize> {
    session: AtomicU8,
    frames_latched: AtomicU32,
    frame: UnsafeCell<FrameBuffer<MAX_LEDS>>,
}

// SAFETY: `frame` is only written by the caller that moved the session from
// idle to loading with a compare-exchange, and only read by the interrupt
// context once the session is sending. The session flag is stored with
// release ordering after each hand-over.
unsafe impl<const MAX_LEDS: usize> Sync for Strip<MAX_LEDS> {}

impl<const MAX_LEDS: usize> Strip<MAX_LEDS> {
    pub const fn new() -> Self {
        Self {
            session: AtomicU8::new(SessionState::Idle as u8),
            frames_latched: AtomicU32::new(0),
            frame: UnsafeCell::new(FrameBuffer::new()),
        }
    }

    /// Maximum number of LEDs per transmission
    pub const fn capacity(&self) -> usize {
        MAX_LEDS
    }

    /// Current transmission phase
    pub fn session(&self) -> SessionState {
        SessionState::from_raw(self.session.load(Ordering::Acquire))
    }

    /// Check if the engine is ready for a new transmission
    pub fn is_idle(&self) -> bool {
        self.session() == SessionState::Idle
    }

    /// Number of transmissions completed since startup (wrapping)
    pub fn frames_latched(&self) -> u32 {
        self.frames_latched.load(Ordering::Acquire)
    }

    /// Arm a transmission of `led_count` LEDs from raw channel bytes
    ///
    /// Copies `led_count * 3` bytes, sets the bit count to `led_count * 24` and
    /// then publishes [`SessionState::Sending`]. The engine picks it up on its
    /// next tick.
    pub fn arm(&self, led_count: usize, bytes: &[u8]) -> Result<(), ArmError> {
        self.fill(|frame| frame.load(led_count, bytes))
    }

    /// Arm a transmission from colors, serialized in `order`
    pub fn arm_colors(&self, colors: &[Rgb], order: ChannelOrder) -> Result<(), ArmError> {
        self.fill(|frame| frame.load_colors(colors.iter().copied(), order))
    }

    /// `smart-leds` compatible writer arming this strip
    pub const fn writer(&self, order: ChannelOrder) -> StripWriter<'_, MAX_LEDS> {
        StripWriter { strip: self, order }
    }

    fn fill<F>(&self, load: F) -> Result<(), ArmError>
    where
        F: FnOnce(&mut FrameBuffer<MAX_LEDS>) -> Result<(), LoadError>,
    {
        if self
            .session
            .compare_exchange(
                SessionState::Idle as u8,
                SessionState::Loading as u8,
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_err()
        {
            return Err(ArmError::Busy);
        }

        // SAFETY: the compare-exchange above made this call the only owner of
        // the buffer until the session leaves `Loading`.
        let frame = unsafe { &mut *self.frame.get() };
        if let Err(err) = load(frame) {
            self.session.store(SessionState::Idle as u8, Ordering::Release);
            return Err(err.into());
        }

        #[cfg(feature = "esp32-log")]
        println!("[Strip.arm] armed {} leds", frame.led_count());

        self.session
            .store(SessionState::Sending as u8, Ordering::Release);
        Ok(())
    }

    /// Frame buffer as seen by the interrupt context
    ///
    /// # Safety
    /// The session must not be idle for as long as the reference is held.
    pub(crate) unsafe fn frame(&self) -> &FrameBuffer<MAX_LEDS> {
        unsafe { &*self.frame.get() }
    }

    /// Enter the latch gap after the last data bit
    pub(crate) fn begin_reset_gap(&self) {
        self.session
            .store(SessionState::ResetGap as u8, Ordering::Release);
    }

    /// Hand the buffer back to the foreground
    pub(crate) fn finish(&self) {
        // Single writer, so no read-modify-write atomics are needed.
        let latched = self.frames_latched.load(Ordering::Relaxed);
        self.frames_latched
            .store(latched.wrapping_add(1), Ordering::Relaxed);
        self.session.store(SessionState::Idle as u8, Ordering::Release);
    }
}

impl<const MAX_LEDS: usize> Default for Strip<MAX_LEDS> {
    fn default() -> Self {
        Self::new()
    }
}

/// Arms a [`Strip`] through the [`SmartLedsWrite`] trait
///
/// `write` returns as soon as the payload is published. It does not wait for
/// the transmission to finish.
#[derive(Clone, Copy)]
pub struct StripWriter<'a, const MAX_LEDS: usize> {
    strip: &'a Strip<MAX_LEDS>,
    order: ChannelOrder,
}

impl<const MAX_LEDS: usize> SmartLedsWrite for StripWriter<'_, MAX_LEDS> {
    type Error = ArmError;
    type Color = Rgb;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let order = self.order;
        self.strip
            .fill(|frame| frame.load_colors(iterator.into_iter().map(Into::into), order))
    }
}
