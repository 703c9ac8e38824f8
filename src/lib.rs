//! imlabel - vector labels for image annotation
//!
//! Labels are points, polygons, boxes, oriented ellipses and composites or
//! groups of them. A [`LabelCollection`] holds the labels of one image with an
//! [`ObjectTable`] of their ids, and can be rendered to class or instance
//! rasters, rebuilt from label images, warped, filtered and merged. The JSON
//! format in [`format`] reads the older layouts as well as the current one.

pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod geometry;
pub mod lock;
pub mod model;
pub mod render;
pub mod session;

pub use config::ToolConfig;
pub use error::{LabelError, Result, StaleTimeElapsed};
pub use geometry::{Affine2, BoundingBox, PointTransform};
pub use lock::{Clock, LockState, SystemClock, UpdateReport};
pub use model::{
    Label, LabelCollection, LabelContext, LabelId, LabelSelector, LabelShape, ObjectTable, WrappedLabelCollection,
};
pub use render::{ClassMapping, InstanceRender, LabelRaster, RenderOptions};
pub use session::AnnotationRecord;

pub use imlabel_raster::{ContourAlgorithm, ContourOptions, Mask, Vertex};
