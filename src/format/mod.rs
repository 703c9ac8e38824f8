//! Label JSON encoding and decoding.
//!
//! Labels are stored as JSON objects discriminated by `label_type`:
//!
//! - **point**: `position`
//! - **polygon**: `regions` (or the older single-ring `vertices`)
//! - **box**: `centre`, `size`
//! - **oriented_ellipse**: `centre`, `radius1`, `radius2`, `orientation_radians`
//! - **composite**: `components`, a list of object ids
//! - **group**: `component_models`, nested labels
//!
//! Every label also carries `object_id`, `label_class`, `source` and
//! `anno_data`. Integer object ids from older files are upgraded on load.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use imlabel::LabelCollection;
//!
//! let labels = LabelCollection::from_json(&value)?;
//! let value = labels.to_json()?;
//! ```

mod codec;
mod entry;

pub use entry::{LABEL_TYPES, LabelEntry, RawObjectId, ShapeEntry};

#[cfg(test)]
mod tests;
