//! Label collections together with their per-image session metadata.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::{LabelError, Result};
use crate::model::collection::LabelCollection;
use crate::model::label::Metadata;

/// Task name recorded for files that used the older `complete` flag.
pub const TASK_FINISHED: &str = "finished";

const KEY_IMAGE_FILENAME: &str = "image_filename";
const KEY_COMPLETED_TASKS: &str = "completed_tasks";
const KEY_LABELS: &str = "labels";
const KEY_COMPLETE: &str = "complete";

/// The labels of one image plus the metadata stored alongside them.
#[derive(Debug, Clone, Default)]
pub struct WrappedLabelCollection {
    pub image_filename: Option<String>,
    pub completed_tasks: BTreeSet<String>,
    pub labels: LabelCollection,
    /// Other top-level fields, written back unchanged
    pub metadata: Metadata,
}

impl WrappedLabelCollection {
    pub fn new(labels: LabelCollection) -> Self {
        Self {
            labels,
            ..Default::default()
        }
    }

    pub fn with_image_filename(mut self, filename: impl Into<String>) -> Self {
        self.image_filename = Some(filename.into());
        self
    }

    pub fn with_completed_tasks<S: Into<String>>(mut self, tasks: impl IntoIterator<Item = S>) -> Self {
        self.completed_tasks = tasks.into_iter().map(Into::into).collect();
        self
    }

    /// Same session metadata around different labels.
    pub fn with_labels(&self, labels: LabelCollection) -> Self {
        Self {
            image_filename: self.image_filename.clone(),
            completed_tasks: self.completed_tasks.clone(),
            labels,
            metadata: self.metadata.clone(),
        }
    }

    /// No labels and no completed tasks.
    pub fn is_blank(&self) -> bool {
        self.labels.is_empty() && self.completed_tasks.is_empty()
    }

    pub fn is_task_complete(&self, task: &str) -> bool {
        self.completed_tasks.contains(task)
    }

    /// Decode a wrapped collection.
    ///
    /// A bare array is read as the labels with no completed tasks. A boolean
    /// `complete` field is read as the [`TASK_FINISHED`] task when
    /// `completed_tasks` is absent.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = match value {
            Value::Array(_) => {
                log::debug!("Reading bare label array as wrapped labels");
                return Ok(Self::new(LabelCollection::from_json(value)?));
            }
            Value::Object(object) => object,
            _ => return Err(LabelError::malformed("wrapped labels must be an object or an array")),
        };

        let labels = match object.get(KEY_LABELS) {
            Some(labels) => LabelCollection::from_json(labels)?,
            None => return Err(LabelError::malformed("missing labels")),
        };

        let image_filename = match object.get(KEY_IMAGE_FILENAME) {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(_) => return Err(LabelError::malformed("image_filename must be a string")),
        };

        let completed_tasks = match (object.get(KEY_COMPLETED_TASKS), object.get(KEY_COMPLETE)) {
            (Some(tasks), _) => parse_tasks(tasks)?,
            (None, Some(Value::Bool(true))) => BTreeSet::from([TASK_FINISHED.to_string()]),
            (None, _) => BTreeSet::new(),
        };

        let metadata: Map<String, Value> = object
            .iter()
            .filter(|(k, _)| {
                ![KEY_LABELS, KEY_IMAGE_FILENAME, KEY_COMPLETED_TASKS, KEY_COMPLETE].contains(&k.as_str())
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            image_filename,
            completed_tasks,
            labels,
            metadata,
        })
    }

    /// Encode as an object; metadata fields never shadow the fixed ones.
    pub fn to_json(&self) -> Result<Value> {
        let mut object = self.metadata.clone();
        if let Some(name) = &self.image_filename {
            object.insert(KEY_IMAGE_FILENAME.to_string(), Value::String(name.clone()));
        }
        object.insert(
            KEY_COMPLETED_TASKS.to_string(),
            self.completed_tasks
                .iter()
                .map(|t| Value::String(t.clone()))
                .collect(),
        );
        object.insert(KEY_LABELS.to_string(), self.labels.to_json()?);
        Ok(Value::Object(object))
    }
}

fn parse_tasks(value: &Value) -> Result<BTreeSet<String>> {
    let Some(items) = value.as_array() else {
        return Err(LabelError::malformed("completed_tasks must be an array"));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| LabelError::malformed("completed task names must be strings"))
        })
        .collect()
}
