//! Geometry utilities: bounding boxes, point transforms and affine maps.
//!
//! Transforms are injected as a "map N points to N points" function so the
//! label model never depends on a particular transform representation.

use imlabel_raster::Vertex;

// ============================================================================
// Bounding boxes
// ============================================================================

/// An axis-aligned bounding box given by its inclusive corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum x/y corner
    pub lower: Vertex,
    /// Maximum x/y corner
    pub upper: Vertex,
}

impl BoundingBox {
    pub fn new(lower: Vertex, upper: Vertex) -> Self {
        Self { lower, upper }
    }

    /// Create a bounding box from a centre and full extent.
    pub fn from_centre_size(centre: Vertex, size: Vertex) -> Self {
        let half = size * 0.5;
        Self::new(centre - half, centre + half)
    }

    /// Tight box around a set of points, `None` if there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vertex>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self::new(first, first), |b, p| {
            Self::new(b.lower.min(*p), b.upper.max(*p))
        }))
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(self.lower.min(other.lower), self.upper.max(other.upper))
    }

    /// Grow the box by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> BoundingBox {
        let m = Vertex::new(margin, margin);
        BoundingBox::new(self.lower - m, self.upper + m)
    }

    pub fn centre(&self) -> Vertex {
        (self.lower + self.upper) * 0.5
    }

    pub fn size(&self) -> Vertex {
        self.upper - self.lower
    }

    /// Integer pixel window `(x0, y0, x1, y1)` covering the box, clamped to an
    /// image of the given size. The window is end-exclusive and may be empty.
    pub fn pixel_window(&self, width: usize, height: usize) -> (usize, usize, usize, usize) {
        let clamp = |v: f64, limit: usize| v.max(0.0).min(limit as f64) as usize;
        (
            clamp(self.lower.x.floor(), width),
            clamp(self.lower.y.floor(), height),
            clamp(self.upper.x.ceil(), width),
            clamp(self.upper.y.ceil(), height),
        )
    }
}

/// Union of a sequence of optional boxes, ignoring `None`.
pub fn union_all(boxes: impl IntoIterator<Item = Option<BoundingBox>>) -> Option<BoundingBox> {
    boxes
        .into_iter()
        .flatten()
        .reduce(|acc, b| acc.union(&b))
}

/// Half extents of an ellipse with radii `r1` (along `orientation`) and `r2`.
pub fn rotated_ellipse_half_extents(radius1: f64, radius2: f64, orientation: f64) -> Vertex {
    let (s, c) = orientation.sin_cos();
    Vertex::new(
        ((radius1 * c).powi(2) + (radius2 * s).powi(2)).sqrt(),
        ((radius1 * s).powi(2) + (radius2 * c).powi(2)).sqrt(),
    )
}

// ============================================================================
// Point transforms
// ============================================================================

/// A mapping from N points to N points.
pub trait PointTransform {
    fn transform_points(&self, points: &[Vertex]) -> Vec<Vertex>;

    fn transform_point(&self, point: Vertex) -> Vertex {
        self.transform_points(&[point])
            .first()
            .copied()
            .unwrap_or(point)
    }
}

impl<F> PointTransform for F
where
    F: Fn(&[Vertex]) -> Vec<Vertex>,
{
    fn transform_points(&self, points: &[Vertex]) -> Vec<Vertex> {
        self(points)
    }
}

/// A 2D affine transform `p' = A p + t`, stored as a 2x3 row-major matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    pub m: [[f64; 3]; 2],
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine2 {
    pub const fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }
    }

    pub const fn translation(dx: f64, dy: f64) -> Self {
        Self {
            m: [[1.0, 0.0, dx], [0.0, 1.0, dy]],
        }
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self {
            m: [[sx, 0.0, 0.0], [0.0, sy, 0.0]],
        }
    }

    /// Counter-clockwise rotation about the origin (clockwise on screen with y down).
    pub fn rotation(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            m: [[c, -s, 0.0], [s, c, 0.0]],
        }
    }

    /// Apply `self` first, then `next`.
    pub fn then(&self, next: &Affine2) -> Affine2 {
        let a = &next.m;
        let b = &self.m;
        let mut m = [[0.0; 3]; 2];
        for (r, row) in m.iter_mut().enumerate() {
            row[0] = a[r][0] * b[0][0] + a[r][1] * b[1][0];
            row[1] = a[r][0] * b[0][1] + a[r][1] * b[1][1];
            row[2] = a[r][0] * b[0][2] + a[r][1] * b[1][2] + a[r][2];
        }
        Affine2 { m }
    }

    /// Inverse transform, `None` if the linear part is singular.
    pub fn inverse(&self) -> Option<Affine2> {
        let [[a, b, tx], [c, d, ty]] = self.m;
        let det = a * d - b * c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let (ia, ib, ic, id) = (d / det, -b / det, -c / det, a / det);
        Some(Affine2 {
            m: [
                [ia, ib, -(ia * tx + ib * ty)],
                [ic, id, -(ic * tx + id * ty)],
            ],
        })
    }

    pub fn apply(&self, p: Vertex) -> Vertex {
        let [[a, b, tx], [c, d, ty]] = self.m;
        Vertex::new(a * p.x + b * p.y + tx, c * p.x + d * p.y + ty)
    }
}

impl PointTransform for Affine2 {
    fn transform_points(&self, points: &[Vertex]) -> Vec<Vertex> {
        points.iter().map(|p| self.apply(*p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_from_points() {
        let pts = [
            Vertex::new(3.0, 1.0),
            Vertex::new(-1.0, 4.0),
            Vertex::new(2.0, 2.0),
        ];
        let b = BoundingBox::from_points(&pts).unwrap();
        assert_eq!(b.lower, Vertex::new(-1.0, 1.0));
        assert_eq!(b.upper, Vertex::new(3.0, 4.0));
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_union_all_ignores_none() {
        let a = BoundingBox::new(Vertex::new(0.0, 0.0), Vertex::new(1.0, 1.0));
        let b = BoundingBox::new(Vertex::new(5.0, -2.0), Vertex::new(6.0, 0.5));
        let u = union_all([Some(a), None, Some(b)]).unwrap();
        assert_eq!(u.lower, Vertex::new(0.0, -2.0));
        assert_eq!(u.upper, Vertex::new(6.0, 1.0));
        assert!(union_all([None, None]).is_none());
    }

    #[test]
    fn test_pixel_window_clamps() {
        let b = BoundingBox::new(Vertex::new(-3.5, 2.2), Vertex::new(7.1, 30.0));
        assert_eq!(b.pixel_window(10, 20), (0, 2, 8, 20));
        let outside = BoundingBox::new(Vertex::new(50.0, 50.0), Vertex::new(60.0, 60.0));
        let (x0, _, x1, _) = outside.pixel_window(10, 10);
        assert_eq!(x0, x1);
    }

    #[test]
    fn test_rotated_ellipse_extents() {
        let e = rotated_ellipse_half_extents(4.0, 6.0, 0.0);
        assert!(e.approx_eq(Vertex::new(4.0, 6.0), 1e-12));
        let e = rotated_ellipse_half_extents(4.0, 6.0, 30f64.to_radians());
        assert!((15.0 - e.x - 10.41742430504416).abs() < 1e-9);
        assert!((25.0 - e.y - 19.432235637169978).abs() < 1e-9);
    }

    #[test]
    fn test_closure_transform() {
        let shift = |pts: &[Vertex]| -> Vec<Vertex> {
            pts.iter().map(|p| *p + Vertex::new(7.0, 7.0)).collect()
        };
        assert_eq!(
            shift.transform_point(Vertex::new(-1.0, 1.0)),
            Vertex::new(6.0, 8.0)
        );
    }

    #[test]
    fn test_affine_inverse_round_trip() {
        let t = Affine2::rotation(0.3)
            .then(&Affine2::scale(2.0, 0.5))
            .then(&Affine2::translation(4.0, -1.0));
        let inv = t.inverse().unwrap();
        let p = Vertex::new(3.0, 8.0);
        assert!(inv.apply(t.apply(p)).approx_eq(p, 1e-9));
        assert!(Affine2::scale(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn test_affine_then_order() {
        let t = Affine2::translation(1.0, 0.0).then(&Affine2::scale(2.0, 2.0));
        assert_eq!(t.apply(Vertex::new(1.0, 1.0)), Vertex::new(4.0, 2.0));
    }
}
