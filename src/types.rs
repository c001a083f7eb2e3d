use fixed::types::I32F32;
use std::fmt;

/// Layout unit. Every value is snapped to a whole millipoint, so repeated
/// layouts of the same input produce identical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Pt(I32F32);

const FRAC_ONE: i128 = 1 << 32;

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    /// Non-finite input maps to zero.
    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        Pt::from_milli((value as f64 * 1000.0).round() as i128)
    }

    pub fn from_i32(value: i32) -> Pt {
        Pt::from_milli(value as i128 * 1000)
    }

    pub fn from_u32(value: u32) -> Pt {
        Pt::from_milli(value as i128 * 1000)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn max(self, other: Pt) -> Pt {
        if other > self { other } else { self }
    }

    /// `self * num / denom`, rounded to the nearest millipoint. Converts font
    /// units to points.
    pub fn mul_ratio(self, num: i32, denom: i32) -> Pt {
        Pt::from_milli(round_div(self.milli().saturating_mul(num as i128), denom as i128))
    }

    fn milli(self) -> i128 {
        round_div(self.0.to_bits() as i128 * 1000, FRAC_ONE)
    }

    fn from_milli(milli: i128) -> Pt {
        let bits = round_div(milli.saturating_mul(FRAC_ONE), 1000);
        Pt(I32F32::from_bits(bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64))
    }
}

/// Integer division rounding half away from zero. Division by zero yields 0.
fn round_div(num: i128, den: i128) -> i128 {
    if den == 0 {
        return 0;
    }
    let half = den.abs() / 2;
    if (num >= 0) == (den > 0) {
        (num.abs() + half) / den.abs()
    } else {
        -((num.abs() + half) / den.abs())
    }
}

impl fmt::Display for Pt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let milli = self.milli();
        let sign = if milli < 0 { "-" } else { "" };
        let milli = milli.unsigned_abs();
        write!(f, "{sign}{}.{:03}", milli / 1000, milli % 1000)
    }
}

impl std::ops::Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt::from_milli(self.milli() + rhs.milli())
    }
}

impl std::ops::AddAssign for Pt {
    fn add_assign(&mut self, rhs: Pt) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Pt {
    type Output = Pt;
    fn sub(self, rhs: Pt) -> Pt {
        Pt::from_milli(self.milli() - rhs.milli())
    }
}

impl std::ops::Mul<i32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: i32) -> Pt {
        Pt::from_milli(self.milli().saturating_mul(rhs as i128))
    }
}

/// Rounds half away from zero; dividing by zero gives zero.
impl std::ops::Div<i32> for Pt {
    type Output = Pt;
    fn div(self, rhs: i32) -> Pt {
        Pt::from_milli(round_div(self.milli(), rhs as i128))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: Pt,
    pub height: Pt,
}

impl Size {
    pub fn new(width: Pt, height: Pt) -> Self {
        Self { width, height }
    }

    pub fn from_f32(width: f32, height: f32) -> Self {
        Self {
            width: Pt::from_f32(width),
            height: Pt::from_f32(height),
        }
    }

    /// Component-wise maximum, i.e. the bounding size of two layouts sharing an origin.
    pub fn union(self, other: Size) -> Size {
        Size {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: Pt,
    pub y: Pt,
}

impl Point {
    pub const ORIGIN: Point = Point {
        x: Pt::ZERO,
        y: Pt::ZERO,
    };

    pub fn new(x: Pt, y: Pt) -> Self {
        Self { x, y }
    }

    pub fn from_f32(x: f32, y: f32) -> Self {
        Self {
            x: Pt::from_f32(x),
            y: Pt::from_f32(y),
        }
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}
