//! Ordered label collections and their composing operations.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;

use imlabel_raster::mask::{pad, set_extent};
use imlabel_raster::{ContourOptions, Vertex, extract_contours, translate_rings};
use ndarray::{Array2, s};

use crate::error::Result;
use crate::geometry::PointTransform;
use crate::model::label::{Label, LabelId, LabelShape};
use crate::model::object_table::ObjectTable;
use crate::model::warp::WarpBatch;

/// Chooses which top-level labels [`LabelCollection::retain`] keeps.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelSelector {
    /// A contiguous run of top-level indices; out-of-range parts are ignored.
    Range(Range<usize>),
    /// Explicit top-level indices, in output order.
    Indices(Vec<usize>),
    /// Top-level labels by id, in output order.
    Ids(Vec<LabelId>),
}

/// An ordered sequence of top-level labels plus the table resolving their ids.
///
/// Every label reachable by flattening (group children included) is
/// registered in the table. Composite components always resolve.
#[derive(Debug, Clone, Default)]
pub struct LabelCollection {
    labels: Vec<Label>,
    table: ObjectTable,
}

impl LabelCollection {
    /// Create an empty collection with a fresh table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from labels, registering them in a fresh table.
    pub fn from_labels(labels: impl IntoIterator<Item = Label>) -> Result<Self> {
        Self::from_labels_in(labels, ObjectTable::new())
    }

    /// Build a collection from labels using an existing table.
    ///
    /// Composite components that do not resolve are dropped.
    pub fn from_labels_in(labels: impl IntoIterator<Item = Label>, table: ObjectTable) -> Result<Self> {
        let mut collection = Self {
            labels: Vec::new(),
            table,
        };
        for mut label in labels {
            let path = [collection.labels.len()];
            collection.table.register_tree(&mut label, &path)?;
            collection.labels.push(label);
        }
        let table = &collection.table;
        for label in &mut collection.labels {
            prune_dangling(label, table);
        }
        Ok(collection)
    }

    /// Append a label, registering it and its group descendants.
    pub fn push(&mut self, mut label: Label) -> Result<LabelId> {
        let path = [self.labels.len()];
        let id = self.table.register_tree(&mut label, &path)?;
        prune_dangling(&mut label, &self.table);
        self.labels.push(label);
        Ok(id)
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<Label> {
        self.labels
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn table(&self) -> &ObjectTable {
        &self.table
    }

    /// Resolve an id to its label, wherever it sits.
    pub fn get(&self, id: &LabelId) -> Option<&Label> {
        self.label_at(self.table.get(id)?)
    }

    /// Label at a path of top-level then group child indices.
    pub fn label_at(&self, path: &[usize]) -> Option<&Label> {
        let (first, rest) = path.split_first()?;
        let mut label = self.labels.get(*first)?;
        for &i in rest {
            label = label.children().get(i)?;
        }
        Some(label)
    }

    /// Resolve a composite's components, skipping ids that no longer resolve.
    pub fn components_of<'a>(&'a self, label: &'a Label) -> impl Iterator<Item = &'a Label> + 'a {
        label.dependencies().iter().filter_map(|id| self.get(id))
    }

    /// Depth-first expansion of groups in document order.
    ///
    /// Group labels appear before their children.
    pub fn flatten(&self) -> Vec<&Label> {
        let mut out = Vec::new();
        for label in &self.labels {
            label.flatten_into(&mut out);
        }
        out
    }

    /// Count of flattened labels per classification.
    pub fn label_class_histogram(&self) -> BTreeMap<Option<String>, usize> {
        let mut histogram = BTreeMap::new();
        for label in &self.labels {
            label.accumulate_class_histogram(&mut histogram);
        }
        histogram
    }

    /// Deep copy of the selected labels in a new, independent collection.
    ///
    /// Ids are kept; components referring to labels that were not selected
    /// are dropped.
    pub fn retain(&self, selector: &LabelSelector) -> Result<Self> {
        let selected: Vec<Label> = match selector {
            LabelSelector::Range(range) => {
                let end = range.end.min(self.labels.len());
                let start = range.start.min(end);
                self.labels[start..end].to_vec()
            }
            LabelSelector::Indices(indices) => indices
                .iter()
                .filter_map(|&i| {
                    let label = self.labels.get(i);
                    if label.is_none() {
                        log::warn!("Ignoring out-of-range label index {}", i);
                    }
                    label.cloned()
                })
                .collect(),
            LabelSelector::Ids(ids) => ids
                .iter()
                .filter_map(|id| {
                    let label = self.labels.iter().find(|l| l.id.as_ref() == Some(id));
                    if label.is_none() {
                        log::warn!("Ignoring unknown top-level label id {}", id);
                    }
                    label.cloned()
                })
                .collect(),
        };
        log::debug!("Retained {} of {} labels", selected.len(), self.labels.len());
        Self::from_labels(selected)
    }

    /// Warp every label into a new collection with freshly allocated ids.
    pub fn warp(&self, transform: &dyn PointTransform) -> Result<Self> {
        let mut table = ObjectTable::new();
        let labels = {
            let mut batch = WarpBatch::new(transform, &self.table, &mut table);
            self.labels
                .iter()
                .enumerate()
                .map(|(i, label)| batch.warp_label(label, &[i]))
                .collect::<Result<Vec<_>>>()?
        };
        Ok(Self { labels, table })
    }

    /// Concatenate collections into a new one.
    ///
    /// When an id is already taken by an earlier input, the later label gets a
    /// new id and composites from the same input follow it.
    pub fn merge(collections: &[&LabelCollection]) -> Result<Self> {
        let mut table = ObjectTable::new();
        let mut labels: Vec<Label> = Vec::new();

        for collection in collections {
            let start = labels.len();
            let mut remap = HashMap::new();
            for label in &collection.labels {
                let mut copy = label.clone();
                let path = [labels.len()];
                register_merged(&mut table, &mut copy, &path, &mut remap)?;
                labels.push(copy);
            }
            if !remap.is_empty() {
                log::debug!("Reassigned {} colliding ids while merging", remap.len());
                for label in &mut labels[start..] {
                    remap_components(label, &remap);
                }
            }
        }

        Ok(Self { labels, table })
    }

    /// One polygon label per contour, all sharing `classification`.
    pub fn from_contours(contours: Vec<Vec<Vertex>>, classification: Option<&str>) -> Result<Self> {
        Self::from_labels(contours.into_iter().map(|ring| {
            let mut label = Label::polygon(vec![ring]);
            label.classification = classification.map(str::to_string);
            label
        }))
    }

    /// One polygon label per positive value of an integer label image, in
    /// ascending value order.
    ///
    /// Each value is cropped to its extent, padded by one pixel and traced;
    /// every contour of that value becomes a region of its label.
    pub fn from_label_image(image: &Array2<i32>, options: &ContourOptions) -> Result<Self> {
        let values: BTreeSet<i32> = image.iter().copied().filter(|&v| v > 0).collect();
        let mut labels = Vec::new();
        for value in values {
            let mask = image.mapv(|v| v == value);
            let Some((x0, y0, x1, y1)) = set_extent(&mask) else {
                continue;
            };
            let cropped = pad(&mask.slice(s![y0..y1, x0..x1]).to_owned(), 1);
            let mut rings = extract_contours(&cropped, options);
            translate_rings(&mut rings, Vertex::new(x0 as f64 - 1.0, y0 as f64 - 1.0));
            if !rings.is_empty() {
                labels.push(Label::polygon(rings));
            }
        }
        log::info!("Extracted {} polygon labels from label image", labels.len());
        Self::from_labels(labels)
    }
}

impl<'a> IntoIterator for &'a LabelCollection {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

fn prune_dangling(label: &mut Label, table: &ObjectTable) {
    match &mut label.shape {
        LabelShape::Composite { components } => {
            let before = components.len();
            components.retain(|c| table.contains(c));
            if components.len() < before {
                log::debug!(
                    "Dropped {} unresolved components from composite {:?}",
                    before - components.len(),
                    label.id
                );
            }
        }
        LabelShape::Group { children } => {
            for child in children {
                prune_dangling(child, table);
            }
        }
        _ => {}
    }
}

fn register_merged(
    table: &mut ObjectTable,
    label: &mut Label,
    path: &[usize],
    remap: &mut HashMap<LabelId, LabelId>,
) -> Result<()> {
    match label.id.clone() {
        Some(old) if table.contains(&old) => {
            label.id = None;
            let new = table.register(label, path)?;
            remap.insert(old, new);
        }
        _ => {
            table.register(label, path)?;
        }
    }
    if let LabelShape::Group { children } = &mut label.shape {
        let mut child_path = path.to_vec();
        for (i, child) in children.iter_mut().enumerate() {
            child_path.push(i);
            register_merged(table, child, &child_path, remap)?;
            child_path.pop();
        }
    }
    Ok(())
}

fn remap_components(label: &mut Label, remap: &HashMap<LabelId, LabelId>) {
    match &mut label.shape {
        LabelShape::Composite { components } => {
            for c in components.iter_mut() {
                if let Some(new) = remap.get(c) {
                    *c = new.clone();
                }
            }
        }
        LabelShape::Group { children } => {
            for child in children {
                remap_components(child, remap);
            }
        }
        _ => {}
    }
}
