//! Identifier registry for the labels of one collection.
//!
//! The table owns no labels. It maps each [`LabelId`] to the [`LabelPath`] of
//! the label inside the owning collection, so labels refer to each other by id
//! and lookups go through the collection.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{LabelError, Result};
use crate::model::label::{Label, LabelId, LabelShape};

/// Position of a label in a collection: the top-level index followed by the
/// child index at each nested group.
pub type LabelPath = Vec<usize>;

/// Allocates and resolves label ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTable {
    prefix: String,
    next_index: u64,
    entries: HashMap<LabelId, LabelPath>,
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectTable {
    /// Create a table with a fresh random prefix.
    pub fn new() -> Self {
        Self::with_prefix(new_prefix())
    }

    /// Create a table with a fixed prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next_index: 1,
            entries: HashMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Counter value the next allocated id will use, unless taken.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &LabelId) -> bool {
        self.entries.contains_key(id)
    }

    /// Path of the label registered under `id`.
    pub fn get(&self, id: &LabelId) -> Option<&[usize]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    pub fn ids(&self) -> impl Iterator<Item = &LabelId> {
        self.entries.keys()
    }

    /// Produce an unused id of the form `<prefix>__<n>`.
    pub fn allocate(&mut self) -> LabelId {
        loop {
            let id = LabelId::from_parts(&self.prefix, self.next_index);
            self.next_index += 1;
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    /// Allocate an id and bind it to `path` ahead of the label being placed there.
    pub fn reserve(&mut self, path: &[usize]) -> LabelId {
        let id = self.allocate();
        self.entries.insert(id.clone(), path.to_vec());
        id
    }

    /// Upgrade a legacy integer id to `<prefix>__<index>`.
    ///
    /// The counter advances past `index` so later allocations cannot collide.
    pub fn normalize_legacy(&mut self, index: i64) -> LabelId {
        if let Ok(n) = u64::try_from(index) {
            self.next_index = self.next_index.max(n + 1);
        }
        log::debug!("Upgrading legacy object id {} under prefix {}", index, self.prefix);
        LabelId::new(format!("{}__{}", self.prefix, index))
    }

    /// Register a label found at `path`.
    ///
    /// A label without an id is given a fresh one. Registering the same id at
    /// the same path again is a no-op; the same id at a different path is a
    /// [`LabelError::DuplicateId`].
    pub fn register(&mut self, label: &mut Label, path: &[usize]) -> Result<LabelId> {
        let Some(id) = label.id.clone() else {
            let id = self.allocate();
            self.entries.insert(id.clone(), path.to_vec());
            label.id = Some(id.clone());
            return Ok(id);
        };

        match self.entries.get(&id) {
            Some(existing) if existing.as_slice() == path => Ok(id),
            Some(_) => Err(LabelError::duplicate_id(id.as_str())),
            None => {
                self.observe(&id);
                self.entries.insert(id.clone(), path.to_vec());
                Ok(id)
            }
        }
    }

    /// Register a label and, for groups, all of its descendants.
    ///
    /// Returns the id of `label` itself.
    pub fn register_tree(&mut self, label: &mut Label, path: &[usize]) -> Result<LabelId> {
        let id = self.register(label, path)?;
        if let LabelShape::Group { children } = &mut label.shape {
            let mut child_path = path.to_vec();
            for (i, child) in children.iter_mut().enumerate() {
                child_path.push(i);
                self.register_tree(child, &child_path)?;
                child_path.pop();
            }
        }
        Ok(id)
    }

    /// Keep the counter ahead of ids that already use this table's prefix.
    fn observe(&mut self, id: &LabelId) {
        if let Some((prefix, index)) = id.parts() {
            if prefix == self.prefix {
                self.next_index = self.next_index.max(index + 1);
            }
        }
    }
}

/// A collision-resistant id prefix for a new edit session.
pub fn new_prefix() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use imlabel_raster::Vertex;

    fn blank() -> Label {
        Label::point(Vertex::ZERO)
    }

    #[test]
    fn test_simple() {
        let mut tbl = ObjectTable::new();
        let mut a = blank();
        tbl.register(&mut a, &[0]).unwrap();
        assert_eq!(a.id, Some(LabelId::new(format!("{}__1", tbl.prefix()))));
    }

    #[test]
    fn test_fresh_prefixes_differ() {
        assert_ne!(ObjectTable::new().prefix(), ObjectTable::new().prefix());
    }

    #[test]
    fn test_prefix_autoinc() {
        let mut tbl = ObjectTable::with_prefix("testprefix");
        let mut a = blank();
        let mut b = blank();
        tbl.register(&mut a, &[0]).unwrap();
        tbl.register(&mut b, &[1]).unwrap();
        assert_eq!(a.id.unwrap().as_str(), "testprefix__1");
        assert_eq!(b.id.unwrap().as_str(), "testprefix__2");
        assert_eq!(tbl.next_index(), 3);
    }

    #[test]
    fn test_reregister_is_noop() {
        let mut tbl = ObjectTable::with_prefix("testprefix");
        let mut a = blank();
        let mut b = blank();
        tbl.register(&mut a, &[0]).unwrap();
        tbl.register(&mut b, &[1]).unwrap();
        let before = tbl.clone();
        tbl.register(&mut b, &[1]).unwrap();
        assert_eq!(b.id.unwrap().as_str(), "testprefix__2");
        assert_eq!(tbl, before);
    }

    #[test]
    fn test_legacy_conversion() {
        let mut tbl = ObjectTable::with_prefix("pqr");
        let id = tbl.normalize_legacy(12345);
        assert_eq!(id.as_str(), "pqr__12345");
        assert_eq!(tbl.next_index(), 12346);
        assert_eq!(tbl.allocate().as_str(), "pqr__12346");
    }

    #[test]
    fn test_register_duplicate() {
        let mut tbl = ObjectTable::new();
        let mut a = blank().with_id("abc_123");
        let mut b = blank().with_id("abc_1234");
        let mut c = blank().with_id("abc_1234");
        tbl.register(&mut a, &[0]).unwrap();
        tbl.register(&mut b, &[1]).unwrap();
        assert_eq!(a.id.as_ref().unwrap().as_str(), "abc_123");
        assert_eq!(b.id.as_ref().unwrap().as_str(), "abc_1234");
        let err = tbl.register(&mut c, &[2]).unwrap_err();
        assert!(matches!(err, LabelError::DuplicateId { ref id } if id == "abc_1234"));
    }

    #[test]
    fn test_accessors() {
        let mut tbl = ObjectTable::with_prefix("xyz");
        let mut a = blank().with_id("abc_123");
        let mut b = blank().with_id("abc_1234");
        tbl.register(&mut a, &[0]).unwrap();
        tbl.register(&mut b, &[1, 2]).unwrap();
        assert_eq!(tbl.get(&LabelId::new("abc_123")), Some(&[0][..]));
        assert_eq!(tbl.get(&LabelId::new("abc_1234")), Some(&[1, 2][..]));
        assert!(tbl.get(&LabelId::new("xyz_789")).is_none());
        assert!(tbl.contains(&LabelId::new("abc_123")));
        assert!(!tbl.contains(&LabelId::new("xyz_789")));
        assert_eq!(tbl.len(), 2);
    }

    #[test]
    fn test_own_prefix_ids_advance_counter() {
        let mut tbl = ObjectTable::with_prefix("abc");
        let mut a = blank().with_id("abc__7");
        tbl.register(&mut a, &[0]).unwrap();
        assert_eq!(tbl.next_index(), 8);
        let mut other = blank().with_id("zzz__50");
        tbl.register(&mut other, &[1]).unwrap();
        assert_eq!(tbl.next_index(), 8);
    }

    #[test]
    fn test_allocate_skips_taken_ids() {
        let mut tbl = ObjectTable::with_prefix("abc");
        let mut a = blank().with_id("abc__1");
        tbl.register(&mut a, &[0]).unwrap();
        let mut b = blank();
        tbl.register(&mut b, &[1]).unwrap();
        assert_eq!(b.id.unwrap().as_str(), "abc__2");
    }

    #[test]
    fn test_register_tree() {
        let mut tbl = ObjectTable::with_prefix("g");
        let mut group = Label::group(vec![blank(), Label::group(vec![blank()])]);
        let id = tbl.register_tree(&mut group, &[3]).unwrap();
        assert_eq!(group.id.as_ref(), Some(&id));
        assert_eq!(tbl.get(&id), Some(&[3][..]));
        assert_eq!(tbl.len(), 4);
        let inner = &group.children()[1].children()[0];
        assert_eq!(tbl.get(inner.id.as_ref().unwrap()), Some(&[3, 1, 0][..]));
    }

    #[test]
    fn test_reserve() {
        let mut tbl = ObjectTable::with_prefix("r");
        let id = tbl.reserve(&[4]);
        let mut a = blank().with_id(id.as_str());
        tbl.register(&mut a, &[4]).unwrap();
        assert_eq!(tbl.len(), 1);
        assert!(tbl.register(&mut a.clone(), &[5]).is_err());
    }
}
