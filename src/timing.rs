//! WS2812 pulse timing expressed in timer ticks
//!
//! The engine never measures time itself. Every duration here is a whole
//! number of timer interrupts, so the timer period must match [`TICK_NS`]
//! for the pulse widths to come out right.

/// Period of one timer interrupt in nanoseconds
pub const TICK_NS: u32 = 125;

/// Nominal "0" code high time
pub const T0H_NS: u32 = 400;
/// Nominal "0" code low time
pub const T0L_NS: u32 = 850;
/// Nominal "1" code high time
pub const T1H_NS: u32 = 800;
/// Nominal "1" code low time
pub const T1L_NS: u32 = 450;
/// Allowed deviation from every nominal half-pulse width
pub const TOLERANCE_NS: u32 = 150;
/// Minimum low time that makes the chain latch the frame
pub const RESET_NS: u32 = 5000;

/// Value of a single data bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Bit {
    Zero = 0,
    One = 1,
}

impl Bit {
    /// Extract bit `offset` of `byte`, counting from the least significant bit
    pub const fn of(byte: u8, offset: usize) -> Self {
        if (byte >> (offset & 7)) & 0x01 == 0 {
            Self::Zero
        } else {
            Self::One
        }
    }
}

/// Half of a bit window currently driven on the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    High,
    Low,
}

/// Durations of every waveform segment, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTable {
    pub zero_high: u8,
    pub zero_low: u8,
    pub one_high: u8,
    pub one_low: u8,
    /// Length of the latch gap after the last bit
    pub reset: u16,
}

impl PulseTable {
    /// 125ns ticks: "0" = 375ns/875ns, "1" = 875ns/375ns, 5us reset gap
    pub const WS2812: Self = Self {
        zero_high: 3,
        zero_low: 7,
        one_high: 7,
        one_low: 3,
        reset: 40,
    };

    /// Ticks spent in `half` of a window carrying `bit`
    pub const fn ticks(&self, bit: Bit, half: Half) -> u8 {
        match (bit, half) {
            (Bit::Zero, Half::High) => self.zero_high,
            (Bit::Zero, Half::Low) => self.zero_low,
            (Bit::One, Half::High) => self.one_high,
            (Bit::One, Half::Low) => self.one_low,
        }
    }

    /// Full window length for `bit`
    pub const fn window(&self, bit: Bit) -> u16 {
        self.ticks(bit, Half::High) as u16 + self.ticks(bit, Half::Low) as u16
    }

    /// Check the table against the protocol limits for a given tick period
    ///
    /// Both windows must have the same length so the bit rate does not depend
    /// on the data, no segment may be zero ticks long, and every half-pulse
    /// must land within [`TOLERANCE_NS`] of its nominal width.
    pub const fn is_compliant(&self, tick_ns: u32) -> bool {
        if self.zero_high == 0 || self.zero_low == 0 || self.one_high == 0 || self.one_low == 0 {
            return false;
        }
        if self.window(Bit::Zero) != self.window(Bit::One) {
            return false;
        }
        within_tolerance(self.zero_high as u32 * tick_ns, T0H_NS)
            && within_tolerance(self.zero_low as u32 * tick_ns, T0L_NS)
            && within_tolerance(self.one_high as u32 * tick_ns, T1H_NS)
            && within_tolerance(self.one_low as u32 * tick_ns, T1L_NS)
            && self.reset as u32 * tick_ns >= RESET_NS
    }
}

impl Default for PulseTable {
    fn default() -> Self {
        Self::WS2812
    }
}

const _: () = assert!(PulseTable::WS2812.is_compliant(TICK_NS));

const fn within_tolerance(actual_ns: u32, nominal_ns: u32) -> bool {
    actual_ns.abs_diff(nominal_ns) <= TOLERANCE_NS
}

/// Number of CPU cycles in one tick, for programming the timer compare period
///
/// A 16 MHz core with 125ns ticks gives 2 cycles per interrupt.
#[allow(clippy::cast_possible_truncation)]
pub const fn cycles_per_tick(cpu_hz: u32, tick_ns: u32) -> u32 {
    (cpu_hz as u64 * tick_ns as u64 / 1_000_000_000) as u32
}
