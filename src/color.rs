use smart_leds::RGB8;

pub type Rgb = RGB8;

/// Build a color from a `0xRRGGBB` value
#[allow(clippy::cast_possible_truncation)]
pub const fn rgb_from_u32(color: u32) -> Rgb {
    Rgb {
        r: ((color >> 16) & 0xFF) as u8,
        g: ((color >> 8) & 0xFF) as u8,
        b: (color & 0xFF) as u8,
    }
}

/// Parse a six digit `RRGGBB` hex color, either case
pub fn rgb_from_hex(text: &str) -> Option<Rgb> {
    if text.len() != 6 || !text.bytes().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(text, 16).ok().map(rgb_from_u32)
}
