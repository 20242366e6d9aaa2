#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;

use ws2812_gadget::{Bit, EngineState, HostLink, PulseTable, TimingEngine};

/// Output pin that records every level it is driven to
#[derive(Debug, Default)]
pub struct RecordingPin {
    pub writes: Vec<bool>,
}

impl embedded_hal::digital::ErrorType for RecordingPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.writes.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.writes.push(true);
        Ok(())
    }
}

/// Tick the engine until it is idle again, recording the pin level driven on
/// each tick (`None` when the tick left the pin alone)
pub fn trace_until_idle<const N: usize>(
    engine: &mut TimingEngine<'_, RecordingPin, N>,
    max_ticks: usize,
) -> Vec<Option<bool>> {
    let mut trace = Vec::new();
    for _ in 0..max_ticks {
        let before = engine.pin().writes.len();
        engine.tick();
        let writes = &engine.pin().writes;
        let level = match writes.len() - before {
            0 => None,
            1 => Some(writes[before]),
            n => panic!("pin driven {} times in one tick", n),
        };
        trace.push(level);
        if engine.state() == EngineState::Idle {
            break;
        }
    }
    trace
}

/// Bits of `bytes`, least significant bit of each byte first
pub fn lsb_bits(bytes: &[u8]) -> Vec<Bit> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).map(move |offset| Bit::of(byte, offset)))
        .collect()
}

/// Per-tick levels a correct engine produces for `bytes`
pub fn expected_trace(bytes: &[u8], table: &PulseTable) -> Vec<Option<bool>> {
    let mut trace = Vec::new();
    if bytes.is_empty() {
        // The arming tick goes straight to the reset gap.
        trace.push(None);
    }
    for bit in lsb_bits(bytes) {
        let (high, low) = match bit {
            Bit::Zero => (table.zero_high, table.zero_low),
            Bit::One => (table.one_high, table.one_low),
        };
        trace.extend(std::iter::repeat_n(Some(true), high as usize));
        trace.extend(std::iter::repeat_n(Some(false), low as usize));
    }
    trace.extend(std::iter::repeat_n(Some(false), table.reset as usize));
    trace
}

/// Decode data bits from a trace by the length of each window's high pulse
pub fn decode_bits(trace: &[Option<bool>], table: &PulseTable) -> Vec<Bit> {
    let window = table.window(Bit::Zero) as usize;
    let data = &trace[..trace.len() - table.reset as usize];
    data.chunks(window)
        .map(|chunk| {
            let high = chunk.iter().take_while(|level| **level == Some(true)).count();
            if high == table.one_high as usize {
                Bit::One
            } else {
                assert_eq!(high, table.zero_high as usize, "unexpected high pulse width");
                Bit::Zero
            }
        })
        .collect()
}

/// In-memory host link
#[derive(Debug, Default)]
pub struct MockHost {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
    pub connected: bool,
}

impl MockHost {
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Everything written so far, clearing the buffer
    pub fn take_output(&mut self) -> String {
        let output = String::from_utf8_lossy(&self.output).into_owned();
        self.output.clear();
        output
    }
}

impl embedded_io::ErrorType for MockHost {
    type Error = Infallible;
}

impl embedded_io::Read for MockHost {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            let Some(byte) = self.input.pop_front() else {
                break;
            };
            buf[count] = byte;
            count += 1;
        }
        Ok(count)
    }
}

impl embedded_io::ReadReady for MockHost {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.input.is_empty())
    }
}

impl embedded_io::Write for MockHost {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl HostLink for MockHost {
    fn is_connected(&mut self) -> bool {
        self.connected
    }
}
