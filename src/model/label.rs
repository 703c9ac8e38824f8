//! Label variants and their shared capabilities.
//!
//! A [`Label`] carries the fields common to every annotation (id, class,
//! provenance, free-form metadata) plus a [`LabelShape`] holding the
//! variant-specific geometry. Composite labels refer to other labels by id;
//! group labels own their children.

use std::collections::BTreeMap;
use std::fmt;

use imlabel_raster::draw::{
    ellipse_ring, fill_disc, fill_polygon, fill_rect, outline_disc, outline_polygon, outline_rect,
};
use imlabel_raster::mask::{empty_mask, union_into, xor_into};
use imlabel_raster::{ContourOptions, Mask, Vertex, extract_contours};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::{BoundingBox, PointTransform, rotated_ellipse_half_extents, union_all};

/// Free-form annotation fields attached to a label.
pub type Metadata = Map<String, Value>;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier of a label within one annotation set.
///
/// Allocated ids have the form `<prefix>__<index>`; ids read from storage are
/// kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(String);

impl LabelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an id from a table prefix and counter value.
    pub fn from_parts(prefix: &str, index: u64) -> Self {
        Self(format!("{prefix}__{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(prefix, index)` if the id has the allocated form.
    pub fn parts(&self) -> Option<(&str, u64)> {
        let (prefix, index) = self.0.rsplit_once("__")?;
        Some((prefix, index.parse().ok()?))
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LabelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// Context
// ============================================================================

/// Rendering and measurement parameters shared by all labels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LabelContext {
    /// Radius used for point labels; 0 renders a single pixel.
    pub point_radius: f64,
}

impl LabelContext {
    pub fn new(point_radius: f64) -> Self {
        Self { point_radius }
    }
}

// ============================================================================
// Shapes
// ============================================================================

/// Variant-specific label geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelShape {
    Point {
        position: Vertex,
    },
    /// One or more closed rings; rings of opposite winding describe holes.
    Polygon {
        regions: Vec<Vec<Vertex>>,
    },
    Box {
        centre: Vertex,
        size: Vertex,
    },
    OrientedEllipse {
        centre: Vertex,
        radius1: f64,
        radius2: f64,
        /// Direction of `radius1`, in radians
        orientation: f64,
    },
    /// References to other labels in the same table. No ownership.
    Composite {
        components: Vec<LabelId>,
    },
    /// Owned child labels.
    Group {
        children: Vec<Label>,
    },
}

impl LabelShape {
    /// The wire discriminator for this variant.
    pub fn label_type(&self) -> &'static str {
        match self {
            LabelShape::Point { .. } => "point",
            LabelShape::Polygon { .. } => "polygon",
            LabelShape::Box { .. } => "box",
            LabelShape::OrientedEllipse { .. } => "oriented_ellipse",
            LabelShape::Composite { .. } => "composite",
            LabelShape::Group { .. } => "group",
        }
    }

    /// Transform the geometry of a leaf shape.
    ///
    /// Returns `None` for composites and groups, whose warping involves other
    /// labels and is handled by [`crate::model::WarpBatch`].
    pub fn warp_geometry(&self, transform: &dyn PointTransform) -> Option<LabelShape> {
        let shape = match self {
            LabelShape::Point { position } => LabelShape::Point {
                position: transform.transform_point(*position),
            },
            LabelShape::Polygon { regions } => LabelShape::Polygon {
                regions: regions
                    .iter()
                    .map(|ring| transform.transform_points(ring))
                    .collect(),
            },
            LabelShape::Box { centre, size } => {
                let bounds = BoundingBox::from_centre_size(*centre, *size);
                let corners = [
                    bounds.lower,
                    Vertex::new(bounds.upper.x, bounds.lower.y),
                    bounds.upper,
                    Vertex::new(bounds.lower.x, bounds.upper.y),
                ];
                let warped = transform.transform_points(&corners);
                let bounds = BoundingBox::from_points(&warped).unwrap_or(bounds);
                LabelShape::Box {
                    centre: bounds.centre(),
                    size: bounds.size(),
                }
            }
            LabelShape::OrientedEllipse {
                centre,
                radius1,
                radius2,
                orientation,
            } => {
                let uv = ellipse_uv_points(*centre, *radius1, *radius2, *orientation);
                let warped = transform.transform_points(&uv);
                if warped.len() < 3 {
                    return Some(self.clone());
                }
                let (centre, radius1, radius2, orientation) =
                    ellipse_params_from_uv(warped[0], warped[1], warped[2]);
                LabelShape::OrientedEllipse {
                    centre,
                    radius1,
                    radius2,
                    orientation,
                }
            }
            LabelShape::Composite { .. } | LabelShape::Group { .. } => return None,
        };
        Some(shape)
    }
}

/// The two ends of the first axis and one end of the second axis of an ellipse.
pub fn ellipse_uv_points(centre: Vertex, radius1: f64, radius2: f64, orientation: f64) -> [Vertex; 3] {
    let (s, c) = orientation.sin_cos();
    let u = Vertex::new(c, s);
    let v = Vertex::new(-s, c);
    [centre - u * radius1, centre + u * radius1, centre + v * radius2]
}

/// Ellipse parameters `(centre, radius1, radius2, orientation)` from UV points.
///
/// `u0` and `u1` are the ends of the first axis; `v` is any point whose
/// distance from that axis gives the second radius.
pub fn ellipse_params_from_uv(u0: Vertex, u1: Vertex, v: Vertex) -> (Vertex, f64, f64, f64) {
    let centre = (u0 + u1) * 0.5;
    let axis = u1 - u0;
    let radius1 = axis.length() * 0.5;
    let orientation = axis.y.atan2(axis.x);
    let radius2 = match axis.normalized() {
        Some(dir) => dir.cross(v - centre).abs(),
        None => (v - centre).length(),
    };
    (centre, radius1, radius2, orientation)
}

// ============================================================================
// Label
// ============================================================================

/// An annotation label.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub id: Option<LabelId>,
    pub classification: Option<String>,
    /// Provenance tag, e.g. `"manual"` or `"auto:model"`
    pub source: Option<String>,
    pub metadata: Metadata,
    pub shape: LabelShape,
}

impl Label {
    pub fn new(shape: LabelShape) -> Self {
        Self {
            id: None,
            classification: None,
            source: None,
            metadata: Metadata::new(),
            shape,
        }
    }

    pub fn point(position: Vertex) -> Self {
        Self::new(LabelShape::Point { position })
    }

    pub fn polygon(regions: Vec<Vec<Vertex>>) -> Self {
        Self::new(LabelShape::Polygon { regions })
    }

    pub fn bbox(centre: Vertex, size: Vertex) -> Self {
        Self::new(LabelShape::Box { centre, size })
    }

    pub fn oriented_ellipse(centre: Vertex, radius1: f64, radius2: f64, orientation: f64) -> Self {
        Self::new(LabelShape::OrientedEllipse {
            centre,
            radius1,
            radius2,
            orientation,
        })
    }

    /// Oriented ellipse from the ends of its first axis and a point on the second.
    pub fn oriented_ellipse_from_uv(u0: Vertex, u1: Vertex, v: Vertex) -> Self {
        let (centre, radius1, radius2, orientation) = ellipse_params_from_uv(u0, u1, v);
        Self::oriented_ellipse(centre, radius1, radius2, orientation)
    }

    pub fn composite(components: Vec<LabelId>) -> Self {
        Self::new(LabelShape::Composite { components })
    }

    pub fn group(children: Vec<Label>) -> Self {
        Self::new(LabelShape::Group { children })
    }

    /// Polygon label whose regions are the contours of `mask`.
    pub fn polygon_from_mask(mask: &Mask, options: &ContourOptions) -> Self {
        Self::polygon(extract_contours(mask, options))
    }

    /// Builder: set the id.
    pub fn with_id(mut self, id: impl Into<LabelId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder: set the classification.
    pub fn with_class(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    /// Builder: set the source tag.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Builder: add a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn label_type(&self) -> &'static str {
        self.shape.label_type()
    }

    /// Ids this label refers to without owning.
    pub fn dependencies(&self) -> &[LabelId] {
        match &self.shape {
            LabelShape::Composite { components } => components,
            _ => &[],
        }
    }

    /// Owned child labels, empty for everything but groups.
    pub fn children(&self) -> &[Label] {
        match &self.shape {
            LabelShape::Group { children } => children,
            _ => &[],
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.shape, LabelShape::Group { .. })
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.shape, LabelShape::Composite { .. })
    }

    /// This label followed by its group descendants, depth first.
    pub fn flatten(&self) -> Vec<&Label> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    pub(crate) fn flatten_into<'a>(&'a self, out: &mut Vec<&'a Label>) {
        out.push(self);
        for child in self.children() {
            child.flatten_into(out);
        }
    }

    /// Add this label and its group descendants to a class histogram.
    pub fn accumulate_class_histogram(&self, histogram: &mut BTreeMap<Option<String>, usize>) {
        for label in self.flatten() {
            *histogram.entry(label.classification.clone()).or_insert(0) += 1;
        }
    }

    /// Axis-aligned extent in image coordinates.
    ///
    /// Composites have no box of their own. Groups return the union of their
    /// children's boxes.
    pub fn bounding_box(&self, ctx: &LabelContext) -> Option<BoundingBox> {
        match &self.shape {
            LabelShape::Point { position } => {
                Some(BoundingBox::new(*position, *position).expanded(ctx.point_radius))
            }
            LabelShape::Polygon { regions } => BoundingBox::from_points(regions.iter().flatten()),
            LabelShape::Box { centre, size } => Some(BoundingBox::from_centre_size(*centre, *size)),
            LabelShape::OrientedEllipse {
                centre,
                radius1,
                radius2,
                orientation,
            } => {
                let half = rotated_ellipse_half_extents(*radius1, *radius2, *orientation);
                Some(BoundingBox::new(*centre - half, *centre + half))
            }
            LabelShape::Composite { .. } => None,
            LabelShape::Group { children } => {
                union_all(children.iter().map(|c| c.bounding_box(ctx)))
            }
        }
    }

    /// Rasterise into a `(height, width)` mask, shifted by `offset`.
    ///
    /// Returns `None` for composites, and for groups without any renderable
    /// child.
    pub fn render_mask(
        &self,
        width: usize,
        height: usize,
        fill: bool,
        offset: Vertex,
        ctx: &LabelContext,
    ) -> Option<Mask> {
        let mut mask = empty_mask(width, height);
        match &self.shape {
            LabelShape::Point { position } => {
                let centre = *position + offset;
                if fill {
                    fill_disc(&mut mask, centre, ctx.point_radius);
                } else {
                    outline_disc(&mut mask, centre, ctx.point_radius);
                }
            }
            LabelShape::Polygon { regions } => {
                for ring in regions.iter().filter(|r| r.len() >= 3) {
                    let shifted: Vec<Vertex> = ring.iter().map(|v| *v + offset).collect();
                    let mut ring_mask = empty_mask(width, height);
                    if fill {
                        fill_polygon(&mut ring_mask, &shifted);
                        xor_into(&mut mask, &ring_mask);
                    } else {
                        outline_polygon(&mut ring_mask, &shifted);
                        union_into(&mut mask, &ring_mask);
                    }
                }
            }
            LabelShape::Box { centre, size } => {
                let bounds = BoundingBox::from_centre_size(*centre + offset, *size);
                let lower = bounds.lower.min(bounds.upper);
                let upper = bounds.lower.max(bounds.upper);
                if fill {
                    fill_rect(&mut mask, lower, upper);
                } else {
                    outline_rect(&mut mask, lower, upper);
                }
            }
            LabelShape::OrientedEllipse {
                centre,
                radius1,
                radius2,
                orientation,
            } => {
                let ring = ellipse_ring(*centre + offset, *radius1, *radius2, *orientation);
                if fill {
                    fill_polygon(&mut mask, &ring);
                } else {
                    outline_polygon(&mut mask, &ring);
                }
            }
            LabelShape::Composite { .. } => return None,
            LabelShape::Group { children } => {
                let mut any = false;
                for child in children {
                    if let Some(child_mask) = child.render_mask(width, height, fill, offset, ctx) {
                        union_into(&mut mask, &child_mask);
                        any = true;
                    }
                }
                if !any {
                    return None;
                }
            }
        }
        Some(mask)
    }
}
