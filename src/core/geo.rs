use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a point in world pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    /// Rounds to the nearest whole pixel, half away from zero.
    pub fn round(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x as f64, y as f64)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Width and height in pixels (or tiles, depending on context)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer rectangle, used for world pixels, screen pixels and tile units alike.
///
/// `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A rectangle measured in tiles rather than pixels.
pub type TileRect = Rect;

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Center of the rectangle, rounded towards the top-left.
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Moves the rectangle so that `center()` returns `(cx, cy)`.
    pub fn set_center(&mut self, cx: i32, cy: i32) {
        self.x = cx - (self.width / 2) as i32;
        self.y = cy - (self.height / 2) as i32;
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// True when `other` lies completely inside this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Overlapping area of two rectangles, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(Rect::new(x, y, (right - x) as u32, (bottom - y) as u32))
    }

    /// Moves this rectangle inside `container`.
    ///
    /// An axis on which the rectangle is larger than the container is
    /// centered on the container instead.
    pub fn clamp_within(&self, container: &Rect) -> Rect {
        let x = if self.width >= container.width {
            container.x + (container.width as i32 - self.width as i32) / 2
        } else {
            self.x.clamp(container.x, container.right() - self.width as i32)
        };
        let y = if self.height >= container.height {
            container.y + (container.height as i32 - self.height as i32) / 2
        } else {
            self.y.clamp(container.y, container.bottom() - self.height as i32)
        };
        Rect::new(x, y, self.width, self.height)
    }

    /// Iterates over every integer cell of the rectangle, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let (left, right) = (self.x, self.right());
        (self.y..self.bottom()).flat_map(move |row| (left..right).map(move |column| (column, row)))
    }

    /// Number of integer cells covered by the rectangle.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}x{})", self.x, self.y, self.width, self.height)
    }
}

/// Position of a single tile: column, row and layer ordinal (back to front).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub column: i32,
    pub row: i32,
    pub layer: usize,
}

impl TileCoord {
    pub const fn new(column: i32, row: i32, layer: usize) -> Self {
        Self { column, row, layer }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, layer {})", self.column, self.row, self.layer)
    }
}

/// Integer division rounding towards negative infinity.
///
/// Returns the quotient and a remainder in `0..divisor`.
pub fn floor_div(value: i32, divisor: u32) -> (i32, i32) {
    let divisor = divisor as i32;
    (value.div_euclid(divisor), value.rem_euclid(divisor))
}

/// Integer division rounding up, for non-negative values.
pub fn ceil_div(value: u32, divisor: u32) -> u32 {
    (value + divisor - 1) / divisor
}
