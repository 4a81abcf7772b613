use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{ReelError, ReelResult};

/// Parse a CSS-style color string used by text styling.
///
/// Accepts `#RGB`, `#RRGGBB`, `#RRGGBBAA` and a handful of named colors. The result is
/// premultiplied.
pub fn parse_color(s: &str) -> ReelResult<Rgba8Premul> {
    let s = s.trim();
    if let Some(c) = named(s) {
        return Ok(c);
    }
    let (r, g, b, a) = parse_hex(s).map_err(ReelError::validation)?;
    Ok(Rgba8Premul::from_straight_rgba(r, g, b, a))
}

fn named(s: &str) -> Option<Rgba8Premul> {
    let rgba = match s.to_ascii_lowercase().as_str() {
        "transparent" => [0, 0, 0, 0],
        "black" => [0, 0, 0, 255],
        "white" => [255, 255, 255, 255],
        "red" => [255, 0, 0, 255],
        "green" => [0, 128, 0, 255],
        "lime" => [0, 255, 0, 255],
        "blue" => [0, 0, 255, 255],
        "yellow" => [255, 255, 0, 255],
        "gray" | "grey" => [128, 128, 128, 255],
        _ => return None,
    };
    Some(Rgba8Premul::from_straight_rgba(
        rgba[0], rgba[1], rgba[2], rgba[3],
    ))
}

fn parse_hex(s: &str) -> Result<(u8, u8, u8, u8), String> {
    let Some(hex) = s.strip_prefix('#') else {
        return Err(format!("unsupported color \"{s}\""));
    };

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    fn hex_nibble(c: &str) -> Result<u8, String> {
        let v = hex_byte(c)?;
        Ok(v * 17)
    }

    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("invalid hex color \"{s}\""));
    }

    match hex.len() {
        3 => Ok((
            hex_nibble(&hex[0..1])?,
            hex_nibble(&hex[1..2])?,
            hex_nibble(&hex[2..3])?,
            255,
        )),
        6 => Ok((
            hex_byte(&hex[0..2])?,
            hex_byte(&hex[2..4])?,
            hex_byte(&hex[4..6])?,
            255,
        )),
        8 => Ok((
            hex_byte(&hex[0..2])?,
            hex_byte(&hex[2..4])?,
            hex_byte(&hex[4..6])?,
            hex_byte(&hex[6..8])?,
        )),
        _ => Err("hex color must be #RGB, #RRGGBB or #RRGGBBAA".to_owned()),
    }
}
