//! Raster and vector conversion for image labels.
//!
//! This crate knows nothing about labels. It provides:
//! - [`Vertex`] arithmetic and ring areas
//! - boolean [`Mask`]s and shape rasterisation ([`draw`])
//! - mask to polygon extraction ([`extract_contours`]) using either marching
//!   squares or outer-border tracing, followed by ring simplification

pub mod contour;
pub mod draw;
pub mod marching;
pub mod mask;
pub mod simplify;
pub mod trace;
pub mod vertex;

pub use contour::{ContourAlgorithm, ContourExtractor, ContourOptions, extract_contours, translate_rings};
pub use mask::{Mask, empty_mask};
pub use simplify::simplify_ring;
pub use vertex::{Vertex, ring_area, signed_area};
