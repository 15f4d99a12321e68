//! Fixed-point units used throughout the board model
//!
//! Lengths are integer nanometres and angles integer micro-degrees, so every
//! coordinate that reaches the fragment output is exactly reproducible.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A length in nanometres
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Length(i64);

impl Length {
    pub const ZERO: Length = Length(0);

    pub const fn from_nm(nm: i64) -> Self {
        Length(nm)
    }

    /// Convert millimetres, rounding to the nearest nanometre
    pub fn from_mm(mm: f64) -> Self {
        Length((mm * 1_000_000.0).round() as i64)
    }

    pub const fn nm(self) -> i64 {
        self.0
    }

    pub fn to_mm(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    pub fn abs(self) -> Self {
        Length(self.0.abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add for Length {
    type Output = Length;
    fn add(self, rhs: Length) -> Length {
        Length(self.0 + rhs.0)
    }
}

impl Sub for Length {
    type Output = Length;
    fn sub(self, rhs: Length) -> Length {
        Length(self.0 - rhs.0)
    }
}

impl Neg for Length {
    type Output = Length;
    fn neg(self) -> Length {
        Length(-self.0)
    }
}

impl Mul<i64> for Length {
    type Output = Length;
    fn mul(self, rhs: i64) -> Length {
        Length(self.0 * rhs)
    }
}

impl Div<i64> for Length {
    type Output = Length;
    fn div(self, rhs: i64) -> Length {
        Length(self.0 / rhs)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}mm", self.to_mm())
    }
}

/// An angle in micro-degrees, counter-clockwise positive
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Angle(i64);

impl Angle {
    pub const ZERO: Angle = Angle(0);

    pub const fn from_micro_deg(udeg: i64) -> Self {
        Angle(udeg)
    }

    pub fn from_deg(deg: f64) -> Self {
        Angle((deg * 1_000_000.0).round() as i64)
    }

    pub const fn deg90() -> Self {
        Angle(90_000_000)
    }

    pub const fn deg180() -> Self {
        Angle(180_000_000)
    }

    pub const fn micro_deg(self) -> i64 {
        self.0
    }

    pub fn to_deg(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    pub fn to_rad(self) -> f64 {
        self.to_deg().to_radians()
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Angle {
    type Output = Angle;
    fn add(self, rhs: Angle) -> Angle {
        Angle(self.0 + rhs.0)
    }
}

impl Neg for Angle {
    type Output = Angle;
    fn neg(self) -> Angle {
        Angle(-self.0)
    }
}

/// A 2D point on the nanometre grid
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Point {
    pub x: Length,
    pub y: Length,
}

impl Point {
    pub const fn new(x: Length, y: Length) -> Self {
        Self { x, y }
    }

    pub const fn from_nm(x: i64, y: i64) -> Self {
        Self { x: Length(x), y: Length(y) }
    }

    pub fn from_mm(x: f64, y: f64) -> Self {
        Self { x: Length::from_mm(x), y: Length::from_mm(y) }
    }

    /// Round floating point nanometre coordinates onto the grid
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self::from_nm(x.round() as i64, y.round() as i64)
    }

    pub fn to_f64(self) -> (f64, f64) {
        (self.x.nm() as f64, self.y.nm() as f64)
    }

    pub fn translated(self, offset: Point) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        self.translated(rhs)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}
