//! Shape rasterisation.
//!
//! Every pixel is sampled at its integer coordinate. Filled shapes set each
//! pixel whose sample point lies inside the shape or exactly on its boundary;
//! outlined shapes set the pixels along the boundary only.

use std::f64::consts::TAU;

use crate::mask::{Mask, set_pixel};
use crate::vertex::Vertex;

/// Tolerance used when deciding whether a sample point lies on an edge.
const EDGE_EPSILON: f64 = 1.0e-9;

/// Upper bound on the vertices of an ellipse ring.
pub const MAX_ELLIPSE_VERTICES: usize = 4096;

// ============================================================================
// Polygons
// ============================================================================

/// Fill a closed ring with the even-odd rule.
///
/// Rings with fewer than 3 vertices leave the mask untouched.
pub fn fill_polygon(mask: &mut Mask, ring: &[Vertex]) {
    if ring.len() < 3 {
        return;
    }
    let (h, w) = mask.dim();
    if h == 0 || w == 0 {
        return;
    }

    let (lo, hi) = ring
        .iter()
        .fold((ring[0], ring[0]), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let y_start = lo.y.ceil().max(0.0) as i64;
    let y_end = hi.y.floor().min((h - 1) as f64) as i64;

    let mut crossings: Vec<f64> = Vec::with_capacity(ring.len());
    for y in y_start..=y_end {
        let yc = y as f64;
        crossings.clear();

        for (i, &a) in ring.iter().enumerate() {
            let b = ring[(i + 1) % ring.len()];

            if a.y == b.y {
                // Horizontal edges lie on the boundary of the row they sit on
                if a.y == yc {
                    fill_span(mask, y, a.x.min(b.x), a.x.max(b.x));
                }
                continue;
            }

            let t = (yc - a.y) / (b.y - a.y);
            let x = a.x + t * (b.x - a.x);

            // Half-open rule so vertices shared by two edges count once
            if (a.y <= yc && yc < b.y) || (b.y <= yc && yc < a.y) {
                crossings.push(x);
            }

            // Boundary points are inside regardless of the crossing rule
            let (ey0, ey1) = (a.y.min(b.y), a.y.max(b.y));
            if ey0 <= yc && yc <= ey1 && (x - x.round()).abs() <= EDGE_EPSILON {
                set_pixel(mask, x.round() as i64, y);
            }
        }

        crossings.sort_by(|a, b| a.total_cmp(b));
        for pair in crossings.chunks_exact(2) {
            fill_span(mask, y, pair[0], pair[1]);
        }
    }
}

/// Draw the closed chain of a ring with straight pixel lines.
pub fn outline_polygon(mask: &mut Mask, ring: &[Vertex]) {
    match ring.len() {
        0 => {}
        1 => {
            let (x, y) = ring[0].to_pixel();
            set_pixel(mask, x, y);
        }
        n => {
            for i in 0..n {
                draw_segment(mask, ring[i], ring[(i + 1) % n]);
            }
        }
    }
}

/// Set every pixel in row `y` whose integer x lies within `[x0, x1]`.
fn fill_span(mask: &mut Mask, y: i64, x0: f64, x1: f64) {
    let w = mask.ncols() as f64;
    let start = x0.ceil().max(0.0);
    let end = x1.floor().min(w - 1.0);
    if start > end {
        return;
    }
    for x in start as i64..=end as i64 {
        set_pixel(mask, x, y);
    }
}

/// Bresenham line between two pixels, both endpoints included.
///
/// Only the part of the line inside the mask is walked.
pub fn draw_line(mask: &mut Mask, from: (i64, i64), to: (i64, i64)) {
    draw_segment(
        mask,
        Vertex::new(from.0 as f64, from.1 as f64),
        Vertex::new(to.0 as f64, to.1 as f64),
    );
}

/// Draw the segment `a..=b` between the pixels nearest its ends, clipped to the mask.
fn draw_segment(mask: &mut Mask, a: Vertex, b: Vertex) {
    let (h, w) = mask.dim();
    let Some((a, b)) = clip_segment(a, b, w, h) else {
        return;
    };
    bresenham(mask, a.to_pixel(), b.to_pixel());
}

/// Liang-Barsky clip of `a..=b` to the pixel area `[-0.5, w - 0.5] x [-0.5, h - 0.5]`.
fn clip_segment(a: Vertex, b: Vertex, w: usize, h: usize) -> Option<(Vertex, Vertex)> {
    if w == 0 || h == 0 || !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
        return None;
    }
    let (x_min, x_max) = (-0.5, w as f64 - 0.5);
    let (y_min, y_max) = (-0.5, h as f64 - 0.5);
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    if !(dx.is_finite() && dy.is_finite()) {
        // Too long to represent; halve it around its midpoint and retry
        let mid = a * 0.5 + b * 0.5;
        let lo = clip_segment(a, mid, w, h);
        let hi = clip_segment(mid, b, w, h);
        return match (lo, hi) {
            (Some((p, _)), Some((_, q))) => Some((p, q)),
            (one, None) | (None, one) => one,
        };
    }

    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-dx, a.x - x_min),
        (dx, x_max - a.x),
        (-dy, a.y - y_min),
        (dy, y_max - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    let start = if t0 > 0.0 { a + Vertex::new(dx, dy) * t0 } else { a };
    let end = if t1 < 1.0 { a + Vertex::new(dx, dy) * t1 } else { b };
    // Rounding on very long segments can land slightly outside the area
    let lower = Vertex::new(x_min, y_min);
    let upper = Vertex::new(x_max, y_max);
    Some((start.max(lower).min(upper), end.max(lower).min(upper)))
}

fn bresenham(mask: &mut Mask, from: (i64, i64), to: (i64, i64)) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        set_pixel(mask, x, y);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

// ============================================================================
// Rectangles, discs and ellipses
// ============================================================================

/// Fill the axis-aligned rectangle spanning `lower..=upper`.
pub fn fill_rect(mask: &mut Mask, lower: Vertex, upper: Vertex) {
    let (h, w) = mask.dim();
    let Some(r) = RectPixels::new(lower, upper) else {
        return;
    };
    let Some((x0, x1)) = clamp_range(r.x0, r.x1, w) else {
        return;
    };
    let Some((y0, y1)) = clamp_range(r.y0, r.y1, h) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            set_pixel(mask, x, y);
        }
    }
}

/// Draw the border of the axis-aligned rectangle spanning `lower..=upper`.
pub fn outline_rect(mask: &mut Mask, lower: Vertex, upper: Vertex) {
    let (h, w) = mask.dim();
    let Some(r) = RectPixels::new(lower, upper) else {
        return;
    };
    if let Some((x0, x1)) = clamp_range(r.x0, r.x1, w) {
        for y in [r.y0, r.y1] {
            if let Some(y) = pixel_index(y, h) {
                for x in x0..=x1 {
                    set_pixel(mask, x, y);
                }
            }
        }
    }
    if let Some((y0, y1)) = clamp_range(r.y0, r.y1, h) {
        for x in [r.x0, r.x1] {
            if let Some(x) = pixel_index(x, w) {
                for y in y0..=y1 {
                    set_pixel(mask, x, y);
                }
            }
        }
    }
}

/// Sample-point range covered by a rectangle, kept in `f64` until clamped.
struct RectPixels {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl RectPixels {
    /// `None` if no sample point falls inside.
    fn new(lower: Vertex, upper: Vertex) -> Option<Self> {
        let r = Self {
            x0: lower.x.ceil(),
            y0: lower.y.ceil(),
            x1: upper.x.floor(),
            y1: upper.y.floor(),
        };
        // Also rejects NaN
        (r.x0 <= r.x1 && r.y0 <= r.y1).then_some(r)
    }
}

/// Intersect the integer range `lo..=hi` with `0..len`.
fn clamp_range(lo: f64, hi: f64, len: usize) -> Option<(i64, i64)> {
    if len == 0 {
        return None;
    }
    let lo = lo.max(0.0);
    let hi = hi.min((len - 1) as f64);
    (lo <= hi).then_some((lo as i64, hi as i64))
}

/// `v` as a pixel index if it lies within `0..len`.
fn pixel_index(v: f64, len: usize) -> Option<i64> {
    (v >= 0.0 && v < len as f64).then_some(v as i64)
}

/// Fill a disc. A zero radius sets the single nearest pixel.
pub fn fill_disc(mask: &mut Mask, centre: Vertex, radius: f64) {
    if radius <= 0.0 {
        let (x, y) = centre.to_pixel();
        set_pixel(mask, x, y);
        return;
    }
    let (h, w) = mask.dim();
    for_disc_pixels(centre, radius, w, h, |x, y| set_pixel(mask, x, y));
}

/// Draw the 4-connected boundary of a disc.
pub fn outline_disc(mask: &mut Mask, centre: Vertex, radius: f64) {
    if radius <= 0.0 {
        fill_disc(mask, centre, radius);
        return;
    }
    let inside = |x: i64, y: i64| {
        let d = Vertex::new(x as f64, y as f64) - centre;
        d.dot(d) <= radius * radius
    };
    let (h, w) = mask.dim();
    for_disc_pixels(centre, radius, w, h, |x, y| {
        let interior =
            inside(x - 1, y) && inside(x + 1, y) && inside(x, y - 1) && inside(x, y + 1);
        if !interior {
            set_pixel(mask, x, y);
        }
    });
}

/// Visit the pixels of a disc that lie within a `w` x `h` mask.
fn for_disc_pixels(centre: Vertex, radius: f64, w: usize, h: usize, mut f: impl FnMut(i64, i64)) {
    let r2 = radius * radius;
    let Some((x0, x1)) = clamp_range((centre.x - radius).ceil(), (centre.x + radius).floor(), w) else {
        return;
    };
    let Some((y0, y1)) = clamp_range((centre.y - radius).ceil(), (centre.y + radius).floor(), h) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            let d = Vertex::new(x as f64, y as f64) - centre;
            if d.dot(d) <= r2 {
                f(x, y);
            }
        }
    }
}

/// Polygonal approximation of an oriented ellipse.
///
/// Uses one vertex per unit of circumference of the larger radius, never
/// fewer than 8 and never more than [`MAX_ELLIPSE_VERTICES`].
pub fn ellipse_ring(centre: Vertex, radius1: f64, radius2: f64, orientation: f64) -> Vec<Vertex> {
    let n = ((TAU * radius1.abs().max(radius2.abs())).ceil() as usize).clamp(8, MAX_ELLIPSE_VERTICES);
    let u = Vertex::new(orientation.cos(), orientation.sin());
    let v = Vertex::new(-orientation.sin(), orientation.cos());
    (0..n)
        .map(|i| {
            let theta = TAU * i as f64 / n as f64;
            centre + u * (radius1 * theta.cos()) + v * (radius2 * theta.sin())
        })
        .collect()
}
