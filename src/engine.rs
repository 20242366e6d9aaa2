//! Tick-driven WS2812 bit encoder
//!
//! [`TimingEngine::tick`] runs once per timer interrupt. Every call does a
//! bounded amount of work and drives the data pin at most once, so worst-case
//! latency is fixed by the code, not by the payload.
//!
//! A transmission looks like this on the line, one character per tick:
//!
//! ```text
//! "1" bit: -------___      "0" bit: ---_______      reset: ____ ... ____ (40)
//! ```

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::OutputPin;

use crate::strip::{SessionState, Strip};
use crate::timing::{Bit, Half, PulseTable};

/// Waveform progress of the bit currently on the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitWindow {
    /// Index of the bit in the payload
    pub index: usize,
    pub bit: Bit,
    pub half: Half,
    /// Ticks already spent in `half`
    pub pulse_ticks: u8,
}

impl BitWindow {
    const fn new(index: usize, bit: Bit) -> Self {
        Self {
            index,
            bit,
            half: Half::High,
            pulse_ticks: 0,
        }
    }
}

/// Sub-phase while data bits are streamed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitPhase {
    Idle,
    StartBit,
    Sending(BitWindow),
    NextBit { index: usize },
}

/// Complete engine state
///
/// Only combinations that can actually occur are representable: bit and
/// half-pulse data exist only while sending, the gap counter only during
/// the reset gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Sending { phase: BitPhase, total_bits: usize },
    ResetGap { elapsed: u16 },
}

impl EngineState {
    pub const fn session(&self) -> SessionState {
        match self {
            Self::Idle => SessionState::Idle,
            Self::Sending { .. } => SessionState::Sending,
            Self::ResetGap { .. } => SessionState::ResetGap,
        }
    }
}

enum Shaped {
    Continue(BitWindow),
    Complete { next: usize },
}

/// Bit-bangs armed frames from a [`Strip`] onto a GPIO line
pub struct TimingEngine<'a, P, const MAX_LEDS: usize> {
    strip: &'a Strip<MAX_LEDS>,
    pin: P,
    table: PulseTable,
    state: EngineState,
}

impl<'a, P: OutputPin, const MAX_LEDS: usize> TimingEngine<'a, P, MAX_LEDS> {
    /// Create an engine using the standard WS2812 pulse table
    pub fn new(strip: &'a Strip<MAX_LEDS>, pin: P) -> Self {
        Self::with_table(strip, pin, PulseTable::WS2812)
    }

    /// Create an engine with custom pulse widths
    ///
    /// The pin is driven low immediately.
    pub fn with_table(strip: &'a Strip<MAX_LEDS>, mut pin: P, table: PulseTable) -> Self {
        pin.set_low().ok();
        Self {
            strip,
            pin,
            table,
            state: EngineState::Idle,
        }
    }

    pub const fn state(&self) -> EngineState {
        self.state
    }

    pub const fn table(&self) -> &PulseTable {
        &self.table
    }

    pub const fn pin(&self) -> &P {
        &self.pin
    }

    /// Give the pin back
    pub fn release(self) -> P {
        self.pin
    }

    /// Advance the state machine by one timer tick
    #[inline]
    pub fn tick(&mut self) {
        self.state = match self.state {
            EngineState::Idle => {
                if self.strip.session() != SessionState::Sending {
                    return;
                }
                // SAFETY: the session was published as sending.
                let total_bits = unsafe { self.strip.frame() }.active_bits();
                self.stream(BitPhase::Idle, total_bits)
            }
            EngineState::Sending { phase, total_bits } => self.stream(phase, total_bits),
            EngineState::ResetGap { elapsed } => self.hold_reset(elapsed),
        };
    }

    fn stream(&mut self, phase: BitPhase, total_bits: usize) -> EngineState {
        let Some(window) = self.settle(phase, total_bits) else {
            return self.enter_reset_gap();
        };

        let phase = match self.shape(window) {
            Shaped::Continue(window) => BitPhase::Sending(window),
            Shaped::Complete { next } => {
                match self.settle(BitPhase::NextBit { index: next }, total_bits) {
                    Some(window) => BitPhase::Sending(window),
                    None => return self.enter_reset_gap(),
                }
            }
        };
        EngineState::Sending { phase, total_bits }
    }

    /// Resolve the zero-time phases into the next window to shape
    ///
    /// Returns `None` when every bit has been sent.
    fn settle(&self, mut phase: BitPhase, total_bits: usize) -> Option<BitWindow> {
        // SAFETY: only reached while the engine owns the sending session.
        let frame = unsafe { self.strip.frame() };
        loop {
            phase = match phase {
                BitPhase::Idle => BitPhase::StartBit,
                BitPhase::StartBit => match frame.bit(0) {
                    Some(bit) => return Some(BitWindow::new(0, bit)),
                    None => BitPhase::NextBit { index: 0 },
                },
                BitPhase::Sending(window) => return Some(window),
                BitPhase::NextBit { index } => {
                    if index >= total_bits {
                        return None;
                    }
                    return frame.bit(index).map(|bit| BitWindow::new(index, bit));
                }
            };
        }
    }

    /// Drive one tick of `window`
    fn shape(&mut self, mut window: BitWindow) -> Shaped {
        match window.half {
            Half::High => self.pin.set_high().ok(),
            Half::Low => self.pin.set_low().ok(),
        };

        window.pulse_ticks += 1;
        if window.pulse_ticks < self.table.ticks(window.bit, window.half) {
            return Shaped::Continue(window);
        }

        window.pulse_ticks = 0;
        match window.half {
            Half::High => {
                window.half = Half::Low;
                Shaped::Continue(window)
            }
            Half::Low => Shaped::Complete {
                next: window.index + 1,
            },
        }
    }

    fn enter_reset_gap(&self) -> EngineState {
        self.strip.begin_reset_gap();
        EngineState::ResetGap { elapsed: 0 }
    }

    fn hold_reset(&mut self, elapsed: u16) -> EngineState {
        self.pin.set_low().ok();
        let elapsed = elapsed.saturating_add(1);
        if elapsed < self.table.reset {
            return EngineState::ResetGap { elapsed };
        }
        self.strip.finish();
        EngineState::Idle
    }
}

/// Storage for state owned by the timer interrupt handler
///
/// The firmware installs the engine once from `main`, after which only the
/// interrupt handler touches it:
///
/// ```ignore
/// static STRIP: Strip<32> = Strip::new();
/// static ENGINE: EngineSlot<TimingEngine<'static, DataPin, 32>> = EngineSlot::new();
///
/// ENGINE.install(TimingEngine::new(&STRIP, pin));
/// // compare-match period of one tick: 2 cycles at 16 MHz
/// timer.set_compare(cycles_per_tick(CPU_HZ, TICK_NS));
/// timer.enable_interrupt();
///
/// #[interrupt]
/// fn TIMER0_COMPA() {
///     ENGINE.tick();
/// }
/// ```
pub struct EngineSlot<E> {
    inner: Mutex<RefCell<Option<E>>>,
}

impl<E> EngineSlot<E> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Store the engine, returning the previous one if any
    pub fn install(&self, engine: E) -> Option<E> {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().replace(engine))
    }

    /// Remove the engine from the slot
    pub fn take(&self) -> Option<E> {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().take())
    }

    /// Run `f` on the installed engine
    ///
    /// Returns `None` if nothing is installed.
    pub fn with<R>(&self, f: impl FnOnce(&mut E) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().as_mut().map(f))
    }
}

impl<P: OutputPin, const MAX_LEDS: usize> EngineSlot<TimingEngine<'_, P, MAX_LEDS>> {
    /// Body of the timer interrupt handler
    #[inline]
    pub fn tick(&self) {
        self.with(TimingEngine::tick);
    }
}

impl<E> Default for EngineSlot<E> {
    fn default() -> Self {
        Self::new()
    }
}
