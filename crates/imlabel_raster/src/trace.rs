//! Outer-border tracing backed by `imageproc`.

use imageproc::contours::{BorderType, Contour, find_contours};

use crate::mask::{Mask, mask_to_gray, pad};
use crate::vertex::Vertex;

/// Trace the outer borders of the set regions.
///
/// Holes are not reported. Vertices lie on the centres of the boundary
/// pixels. Borders with fewer than 3 points are dropped.
pub fn trace_external(mask: &Mask) -> Vec<Vec<Vertex>> {
    if mask.is_empty() {
        return Vec::new();
    }
    // Padding keeps regions that touch the image edge from being clipped
    let gray = mask_to_gray(&pad(mask, 1));
    let contours: Vec<Contour<u32>> = find_contours(&gray);

    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 3)
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Vertex::new(f64::from(p.x) - 1.0, f64::from(p.y) - 1.0))
                .collect()
        })
        .collect()
}
