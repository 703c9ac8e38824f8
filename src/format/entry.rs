//! Wire structures for label JSON.
//!
//! These mirror the JSON layout field for field. Conversion to and from the
//! label model lives in [`super::codec`].

use imlabel_raster::Vertex;
use serde::{Deserialize, Serialize};

use crate::model::Metadata;

/// An `object_id` as stored: current string ids or legacy integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawObjectId {
    Text(String),
    Legacy(i64),
}

/// One label as it appears in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEntry {
    #[serde(default)]
    pub object_id: Option<RawObjectId>,

    #[serde(default)]
    pub label_class: Option<String>,

    #[serde(default)]
    pub source: Option<String>,

    /// Free-form annotation fields; `null` reads as empty
    #[serde(default)]
    pub anno_data: Option<Metadata>,

    #[serde(flatten)]
    pub shape: ShapeEntry,
}

/// Variant fields, discriminated by `label_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label_type", rename_all = "snake_case")]
pub enum ShapeEntry {
    Point {
        position: Vertex,
    },
    Polygon {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        regions: Option<Vec<Vec<Vertex>>>,
        /// Single-ring layout written by older versions
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vertices: Option<Vec<Vertex>>,
    },
    Box {
        centre: Vertex,
        size: Vertex,
    },
    OrientedEllipse {
        centre: Vertex,
        radius1: f64,
        radius2: f64,
        orientation_radians: f64,
    },
    Composite {
        #[serde(default)]
        components: Vec<RawObjectId>,
    },
    Group {
        #[serde(default)]
        component_models: Vec<LabelEntry>,
    },
}

/// Every `label_type` this crate understands.
pub const LABEL_TYPES: [&str; 6] = ["point", "polygon", "box", "oriented_ellipse", "composite", "group"];
