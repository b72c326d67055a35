//! RGB colors and hex color string parsing
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    combinator::{all_consuming, map, map_res},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// An sRGB-encoded color with components in `[0, 1]`.
///
/// Components are the hex bytes divided by 255; no linearization happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parse `#rrggbb` or `#rgb`
    pub fn from_hex(input: &str) -> Result<Self> {
        match all_consuming(hex_color)(input) {
            Ok((_, (r, g, b))) => Ok(Self::from_rgb8(r, g, b)),
            Err(e) => Err(Error::InvalidColor {
                input: input.to_string(),
                reason: format!("{:?}", e),
            }),
        }
    }

    /// Multiply every component by `factor`
    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }

    /// Component-wise product
    pub fn tinted(self, tint: Color) -> Self {
        Self::new(self.r * tint.r, self.g * tint.g, self.b * tint.b)
    }

    /// Quantize to 8-bit channels, saturating out-of-range values
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (q(self.r), q(self.g), q(self.b))
    }
}

fn is_hex(c: char) -> bool {
    c.is_ascii_hexdigit()
}

fn hex_byte(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, is_hex), |s: &str| u8::from_str_radix(s, 16))(input)
}

/// Single hex digit `x` expands to `xx`
fn hex_nibble(input: &str) -> IResult<&str, u8> {
    map(
        map_res(take_while_m_n(1, 1, is_hex), |s: &str| u8::from_str_radix(s, 16)),
        |v| v * 17,
    )(input)
}

fn hex_color(input: &str) -> IResult<&str, (u8, u8, u8)> {
    preceded(
        tag("#"),
        alt((
            all_consuming(tuple((hex_byte, hex_byte, hex_byte))),
            all_consuming(tuple((hex_nibble, hex_nibble, hex_nibble))),
        )),
    )(input)
}
