//! Row/column positions and spans inside a text buffer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in a buffer.
///
/// Rows are zero-based line indices. Columns are zero-based and count
/// Unicode scalar values (chars) from the start of the line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    /// Zero-based line index.
    pub row: u32,
    /// Zero-based char offset within the line.
    pub column: u32,
}

impl Point {
    /// The start of every buffer.
    pub const ZERO: Point = Point { row: 0, column: 0 };

    /// Create a new point.
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// A half-open span `[start, end)` between two points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Inclusive start.
    pub start: Point,
    /// Exclusive end.
    pub end: Point,
}

impl Range {
    /// Create a new range.
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Shorthand for a range given as `(row, column)` pairs.
    pub const fn from_coords(start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            start: Point::new(start.0, start.1),
            end: Point::new(end.0, end.1),
        }
    }

    /// An empty range at `point` (an insertion point).
    pub const fn empty_at(point: Point) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    /// True if the range covers no text.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `start` does not come after `end`.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_order_by_row_then_column() {
        assert!(Point::new(0, 9) < Point::new(1, 0));
        assert!(Point::new(2, 1) < Point::new(2, 3));
    }

    #[test]
    fn empty_and_ordered_ranges() {
        let insert = Range::empty_at(Point::new(3, 4));
        assert!(insert.is_empty());
        assert!(insert.is_ordered());

        let reversed = Range::from_coords((1, 0), (0, 5));
        assert!(!reversed.is_ordered());
    }

    #[test]
    fn display_is_half_open() {
        assert_eq!(Range::from_coords((0, 0), (0, 5)).to_string(), "[0:0, 0:5)");
    }
}
