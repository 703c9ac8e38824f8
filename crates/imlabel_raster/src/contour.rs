//! Mask to polygon conversion.
//!
//! [`ContourAlgorithm`] selects between the two extraction strategies; both
//! return simplified closed rings in image `(x, y)` order and yield nothing for
//! empty or degenerate masks.

use serde::{Deserialize, Serialize};

use crate::marching::marching_squares;
use crate::mask::Mask;
use crate::simplify::simplify_ring;
use crate::trace::trace_external;
use crate::vertex::{Vertex, ring_area};

/// Selects which contour extraction algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourAlgorithm {
    /// Sub-pixel 0.5 iso-contours, including hole boundaries.
    #[default]
    MarchingSquares,
    /// Outer borders only, traced through boundary pixel centres.
    ExternalBorder,
}

/// Trait for contour extraction strategies.
pub trait ContourExtractor {
    /// Extract raw closed rings from a mask.
    fn extract(&self, mask: &Mask) -> Vec<Vec<Vertex>>;
}

impl ContourExtractor for ContourAlgorithm {
    fn extract(&self, mask: &Mask) -> Vec<Vec<Vertex>> {
        match *self {
            Self::MarchingSquares => marching_squares(mask),
            Self::ExternalBorder => trace_external(mask),
        }
    }
}

/// Options for [`extract_contours`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContourOptions {
    pub algorithm: ContourAlgorithm,
    /// Order rings by descending enclosed area.
    #[serde(default)]
    pub sort_by_area: bool,
}

impl ContourOptions {
    pub fn new(algorithm: ContourAlgorithm) -> Self {
        Self {
            algorithm,
            sort_by_area: false,
        }
    }

    /// Builder: sort rings by descending area.
    pub fn with_sort_by_area(mut self, sort: bool) -> Self {
        self.sort_by_area = sort;
        self
    }
}

/// Extract simplified contours from a mask.
pub fn extract_contours(mask: &Mask, options: &ContourOptions) -> Vec<Vec<Vertex>> {
    let mut rings: Vec<Vec<Vertex>> = options
        .algorithm
        .extract(mask)
        .iter()
        .filter_map(|ring| simplify_ring(ring))
        .filter(|ring| ring.len() >= 3)
        .collect();

    if options.sort_by_area {
        rings.sort_by(|a, b| ring_area(b).total_cmp(&ring_area(a)));
    }
    rings
}

/// Shift rings by a constant offset.
pub fn translate_rings(rings: &mut [Vec<Vertex>], offset: Vertex) {
    for v in rings.iter_mut().flatten() {
        *v += offset;
    }
}
