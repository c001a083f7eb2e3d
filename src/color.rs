use crate::error::{MarkupError, Result};
use crate::types::Color;

/// Parses `#RRGGBB` or `#RRGGBBAA` (leading `#` optional, case-insensitive).
pub fn parse_color(literal: &str) -> Result<Color> {
    let hex = literal.strip_prefix('#').unwrap_or(literal);
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(MarkupError::MalformedColorLiteral {
            literal: literal.to_string(),
        });
    }
    let digits = hex.len();
    if digits != 6 && digits != 8 {
        return Err(MarkupError::InvalidColorFormat {
            literal: literal.to_string(),
            digits,
        });
    }
    let value =
        u32::from_str_radix(hex, 16).map_err(|_| MarkupError::MalformedColorLiteral {
            literal: literal.to_string(),
        })?;
    match value.to_be_bytes() {
        [_, r, g, b] if digits == 6 => Ok(Color::rgb(r, g, b)),
        [r, g, b, a] => Ok(Color::rgba(r, g, b, a)),
    }
}
