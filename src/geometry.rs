/// Shared geometric and color primitives used across the surface and editor modules.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A position in display space (pixels of the fitted surface, not of the source photo).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned box in display space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        Bounds {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    pub fn expanded(&self, padding: f64) -> Bounds {
        Bounds {
            x: self.x - padding,
            y: self.y - padding,
            width: self.width + padding * 2.0,
            height: self.height + padding * 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn rgb(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex color: {0:?}")]
pub struct ColorParseError(pub String);

impl FromStr for Color {
    type Err = ColorParseError;

    /// Accepts `#rgb` and `#rrggbb`, case-insensitive.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ColorParseError(value.to_string());
        let digits = value.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        match digits.len() {
            3 => {
                let channel = |index: usize| {
                    u8::from_str_radix(&digits[index..=index], 16)
                        .map(|nibble| nibble * 17)
                        .map_err(|_| invalid())
                };
                Ok(Self::new(channel(0)?, channel(1)?, channel(2)?))
            }
            6 => {
                let channel = |index: usize| {
                    u8::from_str_radix(&digits[index..index + 2], 16).map_err(|_| invalid())
                };
                Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Fits `natural` inside `viewport` keeping the aspect ratio. Never upscales.
///
/// Returns the display size and the scale factor `display.width / natural.width`.
pub fn fit_within(natural: Size, viewport: Size) -> (Size, f64) {
    if natural.is_empty() || viewport.is_empty() {
        return (Size::new(0, 0), 0.0);
    }

    let scale_x = f64::from(viewport.width) / f64::from(natural.width);
    let scale_y = f64::from(viewport.height) / f64::from(natural.height);
    let scale = scale_x.min(scale_y).min(1.0);

    let width = (f64::from(natural.width) * scale).round().max(1.0) as u32;
    let height = (f64::from(natural.height) * scale).round().max(1.0) as u32;
    let display = Size::new(width.min(viewport.width), height.min(viewport.height));
    let scale = f64::from(display.width) / f64::from(natural.width);
    (display, scale)
}

/// Shortest distance from `point` to the segment `start..end`.
pub fn distance_to_segment(point: Point, start: Point, end: Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq < 1e-9 {
        return point.distance_to(start);
    }

    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq).clamp(0.0, 1.0);
    point.distance_to(Point::new(start.x + dx * t, start.y + dy * t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parses_long_and_short_hex() {
        assert_eq!("#ef4444".parse::<Color>(), Ok(Color::new(0xef, 0x44, 0x44)));
        assert_eq!("#FFF".parse::<Color>(), Ok(Color::new(255, 255, 255)));
        assert_eq!(Color::new(0xef, 0x44, 0x44).to_hex(), "#ef4444");
    }

    #[test]
    fn color_rejects_malformed_hex() {
        for value in ["ef4444", "#ef44", "#gg0000", "", "#"] {
            assert!(value.parse::<Color>().is_err(), "{value:?} should fail");
        }
    }

    #[test]
    fn fit_within_shrinks_landscape_photo_and_keeps_ratio() {
        let (display, scale) = fit_within(Size::new(4000, 3000), Size::new(1200, 800));
        assert_eq!(display, Size::new(1067, 800));
        assert!((scale - 1067.0 / 4000.0).abs() < 1e-9);
    }

    #[test]
    fn fit_within_does_not_upscale_small_photo() {
        let (display, scale) = fit_within(Size::new(320, 240), Size::new(1200, 800));
        assert_eq!(display, Size::new(320, 240));
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn fit_within_handles_empty_input() {
        let (display, scale) = fit_within(Size::new(0, 10), Size::new(100, 100));
        assert!(display.is_empty());
        assert_eq!(scale, 0.0);
    }

    #[test]
    fn distance_to_segment_clamps_to_endpoints() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Point::new(5.0, 3.0), start, end), 3.0);
        assert_eq!(distance_to_segment(Point::new(14.0, 3.0), start, end), 5.0);
    }
}
