//! 2D vertex type shared by the rasteriser and the contour extractors.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A 2D point in image coordinates, `x` to the right and `y` down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub const ZERO: Vertex = Vertex { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vertex) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 2D cross product.
    pub fn cross(self, other: Vertex) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Calculate distance to another vertex.
    pub fn distance_to(self, other: Vertex) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `None` for the zero vector.
    pub fn normalized(self) -> Option<Vertex> {
        let len = self.length();
        if len > 0.0 { Some(self / len) } else { None }
    }

    pub fn min(self, other: Vertex) -> Vertex {
        Vertex::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Vertex) -> Vertex {
        Vertex::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// True if both coordinates are within `tolerance` of `other`.
    pub fn approx_eq(self, other: Vertex, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    /// Nearest pixel coordinate.
    pub fn to_pixel(self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }
}

impl From<(f64, f64)> for Vertex {
    fn from((x, y): (f64, f64)) -> Self {
        Vertex::new(x, y)
    }
}

impl Add for Vertex {
    type Output = Vertex;
    fn add(self, rhs: Vertex) -> Vertex {
        Vertex::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vertex {
    fn add_assign(&mut self, rhs: Vertex) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vertex {
    type Output = Vertex;
    fn sub(self, rhs: Vertex) -> Vertex {
        Vertex::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vertex {
    fn sub_assign(&mut self, rhs: Vertex) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vertex {
    type Output = Vertex;
    fn mul(self, rhs: f64) -> Vertex {
        Vertex::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vertex {
    type Output = Vertex;
    fn div(self, rhs: f64) -> Vertex {
        Vertex::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vertex {
    type Output = Vertex;
    fn neg(self) -> Vertex {
        Vertex::new(-self.x, -self.y)
    }
}

/// Signed area of a closed ring via the shoelace formula.
///
/// Positive for rings that run clockwise on screen (y down).
pub fn signed_area(ring: &[Vertex]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        acc += a.cross(b);
    }
    acc * 0.5
}

/// Enclosed area of a closed ring, regardless of winding.
pub fn ring_area(ring: &[Vertex]) -> f64 {
    signed_area(ring).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_arithmetic() {
        let a = Vertex::new(1.0, 2.0);
        let b = Vertex::new(3.0, -1.0);
        assert_eq!(a + b, Vertex::new(4.0, 1.0));
        assert_eq!(b - a, Vertex::new(2.0, -3.0));
        assert_eq!(a * 2.0, Vertex::new(2.0, 4.0));
        assert_eq!(-a, Vertex::new(-1.0, -2.0));
        assert_eq!(a.dot(b), 1.0);
    }

    #[test]
    fn test_distance_and_normalize() {
        let v = Vertex::new(3.0, 4.0);
        assert_eq!(v.length(), 5.0);
        assert_eq!(Vertex::ZERO.distance_to(v), 5.0);
        let n = v.normalized().unwrap();
        assert!(n.approx_eq(Vertex::new(0.6, 0.8), 1e-12));
        assert!(Vertex::ZERO.normalized().is_none());
    }

    #[test]
    fn test_ring_area() {
        let square = [
            Vertex::new(0.0, 0.0),
            Vertex::new(4.0, 0.0),
            Vertex::new(4.0, 3.0),
            Vertex::new(0.0, 3.0),
        ];
        assert_eq!(signed_area(&square), 12.0);
        let mut reversed = square;
        reversed.reverse();
        assert_eq!(signed_area(&reversed), -12.0);
        assert_eq!(ring_area(&reversed), 12.0);
        assert_eq!(ring_area(&square[..2]), 0.0);
    }

    #[test]
    fn test_to_pixel_rounds() {
        assert_eq!(Vertex::new(2.4, 2.6).to_pixel(), (2, 3));
        assert_eq!(Vertex::new(-0.6, 0.4).to_pixel(), (-1, 0));
    }
}
