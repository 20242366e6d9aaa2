//! Fixed-capacity frame buffer
//!
//! Holds the serialized color payload of one transmission. The storage is a
//! plain array sized at compile time, so nothing on the interrupt path ever
//! allocates.

use crate::color::Rgb;
use crate::timing::Bit;

/// Bytes transmitted per LED
pub const BYTES_PER_LED: usize = 3;

/// Bits transmitted per LED
pub const BITS_PER_LED: usize = BYTES_PER_LED * 8;

/// Order in which color channels are laid into the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    /// Red, green, blue: the order colors arrive from the host
    #[default]
    Rgb,
    /// Green, red, blue: native WS2812 channel order
    Grb,
}

impl ChannelOrder {
    /// Serialize a color in this order
    pub const fn bytes(self, color: Rgb) -> [u8; BYTES_PER_LED] {
        match self {
            Self::Rgb => [color.r, color.g, color.b],
            Self::Grb => [color.g, color.r, color.b],
        }
    }
}

/// Error returned when a payload does not fit the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// More LEDs than the buffer can hold
    TooManyLeds { requested: usize, capacity: usize },
    /// Fewer bytes than `led_count * 3`
    ShortPayload { expected: usize, found: usize },
}

/// Serialized color payload plus the number of bits to send
#[derive(Debug, Clone)]
pub struct FrameBuffer<const MAX_LEDS: usize> {
    leds: [[u8; BYTES_PER_LED]; MAX_LEDS],
    led_count: usize,
}

impl<const MAX_LEDS: usize> FrameBuffer<MAX_LEDS> {
    pub const fn new() -> Self {
        Self {
            leds: [[0; BYTES_PER_LED]; MAX_LEDS],
            led_count: 0,
        }
    }

    /// Maximum number of LEDs one transmission can carry
    pub const fn capacity(&self) -> usize {
        MAX_LEDS
    }

    /// Number of LEDs in the current payload
    pub const fn led_count(&self) -> usize {
        self.led_count
    }

    /// Total bits to transmit: `led_count * 24`
    pub const fn active_bits(&self) -> usize {
        self.led_count * BITS_PER_LED
    }

    /// Payload bytes in transmission order
    pub fn bytes(&self) -> &[u8] {
        self.leds[..self.led_count].as_flattened()
    }

    /// Copy `led_count * 3` raw bytes into the buffer
    ///
    /// Extra bytes past `led_count * 3` are ignored.
    pub fn load(&mut self, led_count: usize, bytes: &[u8]) -> Result<(), LoadError> {
        if led_count > MAX_LEDS {
            return Err(LoadError::TooManyLeds {
                requested: led_count,
                capacity: MAX_LEDS,
            });
        }
        let expected = led_count * BYTES_PER_LED;
        if bytes.len() < expected {
            return Err(LoadError::ShortPayload {
                expected,
                found: bytes.len(),
            });
        }

        let chunks = bytes[..expected].chunks_exact(BYTES_PER_LED);
        for (led, chunk) in self.leds.iter_mut().zip(chunks) {
            led.copy_from_slice(chunk);
        }
        self.led_count = led_count;
        Ok(())
    }

    /// Serialize colors into the buffer using `order`
    ///
    /// On error the previous payload length is kept, but the leading LEDs may
    /// already have been overwritten.
    pub fn load_colors<I>(&mut self, colors: I, order: ChannelOrder) -> Result<(), LoadError>
    where
        I: IntoIterator<Item = Rgb>,
    {
        let mut count = 0;
        for color in colors {
            let Some(led) = self.leds.get_mut(count) else {
                return Err(LoadError::TooManyLeds {
                    requested: count + 1,
                    capacity: MAX_LEDS,
                });
            };
            *led = order.bytes(color);
            count += 1;
        }
        self.led_count = count;
        Ok(())
    }

    /// Bit `index` of the payload, least significant bit of each byte first
    ///
    /// Returns `None` once `index` reaches [`active_bits`](Self::active_bits),
    /// so nothing past the payload is ever read.
    pub fn bit(&self, index: usize) -> Option<Bit> {
        if index >= self.active_bits() {
            return None;
        }
        let byte = index / 8;
        let led = &self.leds[byte / BYTES_PER_LED];
        Some(Bit::of(led[byte % BYTES_PER_LED], index % 8))
    }
}

impl<const MAX_LEDS: usize> Default for FrameBuffer<MAX_LEDS> {
    fn default() -> Self {
        Self::new()
    }
}
