//! Vector label model: labels, their id table and collections of them.

mod collection;
mod label;
mod label_class;
mod object_table;
mod warp;
mod wrapped;

pub use collection::{LabelCollection, LabelSelector};
pub use label::{
    Label, LabelContext, LabelId, LabelShape, Metadata, ellipse_params_from_uv, ellipse_uv_points,
};
pub use label_class::{
    ColourScheme, Colours, DEFAULT_SCHEME, LabelClass, LabelClassGroup, LabellingSchema, Rgb,
};
pub use object_table::{LabelPath, ObjectTable, new_prefix};
pub use warp::WarpBatch;
pub use wrapped::{TASK_FINISHED, WrappedLabelCollection};
