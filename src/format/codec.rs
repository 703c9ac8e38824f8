//! Conversion between labels and their JSON representation.

use serde_json::Value;

use crate::error::{LabelError, Result};
use crate::format::entry::{LABEL_TYPES, LabelEntry, RawObjectId, ShapeEntry};
use crate::model::{Label, LabelCollection, LabelId, LabelShape, ObjectTable};

// ============================================================================
// Encoding
// ============================================================================

impl From<&Label> for LabelEntry {
    fn from(label: &Label) -> Self {
        let shape = match &label.shape {
            LabelShape::Point { position } => ShapeEntry::Point {
                position: *position,
            },
            LabelShape::Polygon { regions } => ShapeEntry::Polygon {
                regions: Some(regions.clone()),
                vertices: None,
            },
            LabelShape::Box { centre, size } => ShapeEntry::Box {
                centre: *centre,
                size: *size,
            },
            LabelShape::OrientedEllipse {
                centre,
                radius1,
                radius2,
                orientation,
            } => ShapeEntry::OrientedEllipse {
                centre: *centre,
                radius1: *radius1,
                radius2: *radius2,
                orientation_radians: *orientation,
            },
            LabelShape::Composite { components } => ShapeEntry::Composite {
                components: components
                    .iter()
                    .map(|id| RawObjectId::Text(id.as_str().to_string()))
                    .collect(),
            },
            LabelShape::Group { children } => ShapeEntry::Group {
                component_models: children.iter().map(LabelEntry::from).collect(),
            },
        };

        LabelEntry {
            object_id: label
                .id
                .as_ref()
                .map(|id| RawObjectId::Text(id.as_str().to_string())),
            label_class: label.classification.clone(),
            source: label.source.clone(),
            anno_data: Some(label.metadata.clone()),
            shape,
        }
    }
}

impl Label {
    /// Encode as label JSON.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(LabelEntry::from(self))?)
    }

    /// Decode label JSON.
    ///
    /// Legacy integer ids are rewritten under `table`'s prefix; the label is
    /// not registered.
    pub fn from_json(value: &Value, table: &mut ObjectTable) -> Result<Label> {
        validate_label_types(value)?;
        let entry: LabelEntry =
            serde_json::from_value(value.clone()).map_err(|e| LabelError::malformed(e.to_string()))?;
        entry.into_label(table)
    }
}

// ============================================================================
// Decoding
// ============================================================================

impl LabelEntry {
    /// Build the label, upgrading legacy ids against `table`.
    pub fn into_label(self, table: &mut ObjectTable) -> Result<Label> {
        let shape = match self.shape {
            ShapeEntry::Point { position } => LabelShape::Point { position },
            ShapeEntry::Polygon { regions, vertices } => {
                let regions = match (regions, vertices) {
                    (Some(regions), _) => regions,
                    (None, Some(vertices)) => vec![vertices],
                    (None, None) => {
                        return Err(LabelError::malformed("polygon label without regions"));
                    }
                };
                LabelShape::Polygon { regions }
            }
            ShapeEntry::Box { centre, size } => LabelShape::Box { centre, size },
            ShapeEntry::OrientedEllipse {
                centre,
                radius1,
                radius2,
                orientation_radians,
            } => LabelShape::OrientedEllipse {
                centre,
                radius1,
                radius2,
                orientation: orientation_radians,
            },
            ShapeEntry::Composite { components } => LabelShape::Composite {
                components: components
                    .into_iter()
                    .map(|raw| resolve_raw_id(raw, table))
                    .collect(),
            },
            ShapeEntry::Group { component_models } => LabelShape::Group {
                children: component_models
                    .into_iter()
                    .map(|entry| entry.into_label(table))
                    .collect::<Result<Vec<_>>>()?,
            },
        };

        Ok(Label {
            id: self.object_id.map(|raw| resolve_raw_id(raw, table)),
            classification: self.label_class,
            source: self.source,
            metadata: self.anno_data.unwrap_or_default(),
            shape,
        })
    }
}

fn resolve_raw_id(raw: RawObjectId, table: &mut ObjectTable) -> LabelId {
    match raw {
        RawObjectId::Text(s) => LabelId::new(s),
        RawObjectId::Legacy(n) => table.normalize_legacy(n),
    }
}

/// Check discriminators before decoding so unknown types are reported as such.
fn validate_label_types(value: &Value) -> Result<()> {
    let Some(object) = value.as_object() else {
        return Err(LabelError::malformed("label must be a JSON object"));
    };
    let label_type = match object.get("label_type") {
        Some(Value::String(t)) => t.as_str(),
        Some(_) => return Err(LabelError::malformed("label_type must be a string")),
        None => return Err(LabelError::malformed("missing label_type")),
    };
    if !LABEL_TYPES.contains(&label_type) {
        return Err(LabelError::unknown_label_type(label_type));
    }
    if label_type == "group"
        && let Some(Value::Array(children)) = object.get("component_models")
    {
        for child in children {
            validate_label_types(child)?;
        }
    }
    Ok(())
}

// ============================================================================
// Collections
// ============================================================================

impl LabelCollection {
    /// Encode as a JSON array of labels.
    pub fn to_json(&self) -> Result<Value> {
        let entries: Vec<LabelEntry> = self.iter().map(LabelEntry::from).collect();
        Ok(serde_json::to_value(entries)?)
    }

    /// Decode a JSON array of labels into a collection with a fresh table.
    ///
    /// Components that do not resolve to a label in the array are dropped.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Some(items) = value.as_array() else {
            return Err(LabelError::malformed("labels must be a JSON array"));
        };
        let mut table = ObjectTable::new();
        let labels = items
            .iter()
            .map(|item| Label::from_json(item, &mut table))
            .collect::<Result<Vec<_>>>()?;
        let collection = Self::from_labels_in(labels, table)?;
        log::info!(
            "Loaded {} labels ({} including group children)",
            collection.len(),
            collection.table().len()
        );
        Ok(collection)
    }
}
