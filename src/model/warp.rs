//! Warping labels into a fresh object table.

use std::collections::HashMap;

use crate::error::Result;
use crate::geometry::PointTransform;
use crate::model::label::{Label, LabelId, LabelShape};
use crate::model::object_table::ObjectTable;

/// State shared by every label warped in one batch.
///
/// Each source id is mapped to exactly one new id, so composites that refer to
/// the same dependent keep sharing it after the warp. A dependent that has not
/// been warped yet has its new id reserved at its own path; the label placed
/// there later picks that id up.
pub struct WarpBatch<'a> {
    transform: &'a dyn PointTransform,
    source: Option<&'a ObjectTable>,
    target: &'a mut ObjectTable,
    remap: HashMap<LabelId, LabelId>,
}

impl<'a> WarpBatch<'a> {
    /// Warp labels of the collection owning `source` into `target`.
    ///
    /// Warped labels keep the paths they had in the source collection.
    pub fn new(
        transform: &'a dyn PointTransform,
        source: &'a ObjectTable,
        target: &'a mut ObjectTable,
    ) -> Self {
        Self {
            transform,
            source: Some(source),
            target,
            remap: HashMap::new(),
        }
    }

    /// Warp labels that do not belong to any collection.
    ///
    /// Composite components can only be resolved against labels already warped
    /// in this batch; others are dropped.
    pub fn detached(transform: &'a dyn PointTransform, target: &'a mut ObjectTable) -> Self {
        Self {
            transform,
            source: None,
            target,
            remap: HashMap::new(),
        }
    }

    /// Produce the warped copy of `label`, registered at `path` in the target table.
    pub fn warp_label(&mut self, label: &Label, path: &[usize]) -> Result<Label> {
        let id = label.id.as_ref().map(|old| self.mapped_id(old, path));

        let shape = match &label.shape {
            LabelShape::Composite { components } => LabelShape::Composite {
                components: components
                    .iter()
                    .filter_map(|c| self.resolve_dependency(c))
                    .collect(),
            },
            LabelShape::Group { children } => {
                let mut child_path = path.to_vec();
                let mut warped = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    child_path.push(i);
                    warped.push(self.warp_label(child, &child_path)?);
                    child_path.pop();
                }
                LabelShape::Group { children: warped }
            }
            leaf => leaf
                .warp_geometry(self.transform)
                .unwrap_or_else(|| leaf.clone()),
        };

        let mut warped = Label {
            id,
            classification: label.classification.clone(),
            source: label.source.clone(),
            metadata: label.metadata.clone(),
            shape,
        };
        self.target.register(&mut warped, path)?;
        Ok(warped)
    }

    /// New id for a source id, reserving one at `path` on first sight.
    fn mapped_id(&mut self, old: &LabelId, path: &[usize]) -> LabelId {
        if let Some(new) = self.remap.get(old) {
            return new.clone();
        }
        let new = self.target.reserve(path);
        self.remap.insert(old.clone(), new.clone());
        new
    }

    fn resolve_dependency(&mut self, old: &LabelId) -> Option<LabelId> {
        if let Some(new) = self.remap.get(old) {
            return Some(new.clone());
        }
        let path = self.source.and_then(|s| s.get(old))?.to_vec();
        Some(self.mapped_id(old, &path))
    }
}

impl Label {
    /// Warp a single label into `target`, where it will sit at `path`.
    pub fn warped(
        &self,
        transform: &dyn PointTransform,
        target: &mut ObjectTable,
        path: &[usize],
    ) -> Result<Label> {
        WarpBatch::detached(transform, target).warp_label(self, path)
    }
}
