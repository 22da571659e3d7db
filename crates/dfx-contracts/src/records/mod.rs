//! Fixed-shape records the model's JSON replies are projected into.
//!
//! Projection is all-or-nothing: every field is looked up by its exact name,
//! a missing key or a value of the wrong JSON type rejects the whole record.
//! Nothing is defaulted and nothing is coerced. Extra keys are ignored.

mod brainstorming;
mod object_description;
mod specification;

pub use brainstorming::{DesignBrainstorming, MarketAnalysis, TopicGroup};
pub use object_description::ObjectDescription;
pub use specification::{
    project_specifications, DfXSpecification, RejectedCategory, SpecificationSet,
};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("{record}: expected a JSON object")]
    NotAnObject { record: &'static str },

    #[error("{record}: missing required field '{field}'")]
    MissingField { record: &'static str, field: String },

    #[error("{record}: field '{field}' {detail}")]
    Shape {
        record: &'static str,
        field: String,
        detail: String,
    },
}

/// Field lookups scoped to one record, so errors name where they happened.
pub(crate) struct Projector<'a> {
    record: &'static str,
    object: &'a Map<String, Value>,
}

impl<'a> Projector<'a> {
    pub(crate) fn new(record: &'static str, value: &'a Value) -> Result<Self, ProjectionError> {
        let object = value
            .as_object()
            .ok_or(ProjectionError::NotAnObject { record })?;
        Ok(Self { record, object })
    }

    fn field(&self, name: &str) -> Result<&'a Value, ProjectionError> {
        self.object
            .get(name)
            .ok_or_else(|| ProjectionError::MissingField {
                record: self.record,
                field: name.to_string(),
            })
    }

    fn shape(&self, field: &str, detail: impl Into<String>) -> ProjectionError {
        ProjectionError::Shape {
            record: self.record,
            field: field.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn text(&self, name: &str) -> Result<String, ProjectionError> {
        self.field(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.shape(name, "must be a string"))
    }

    pub(crate) fn text_list(&self, name: &str) -> Result<Vec<String>, ProjectionError> {
        let value = self.field(name)?;
        self.text_list_value(name, value)
    }

    fn text_list_value(&self, name: &str, value: &Value) -> Result<Vec<String>, ProjectionError> {
        let rows = value
            .as_array()
            .ok_or_else(|| self.shape(name, "must be a list of strings"))?;
        rows.iter()
            .enumerate()
            .map(|(idx, row)| {
                row.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.shape(name, format!("item {idx} must be a string")))
            })
            .collect()
    }

    pub(crate) fn text_map(&self, name: &str) -> Result<IndexMap<String, String>, ProjectionError> {
        let object = self
            .field(name)?
            .as_object()
            .ok_or_else(|| self.shape(name, "must be a mapping of strings"))?;
        let mut out = IndexMap::with_capacity(object.len());
        for (key, value) in object {
            let text = value
                .as_str()
                .ok_or_else(|| self.shape(name, format!("entry '{key}' must be a string")))?;
            out.insert(key.clone(), text.to_string());
        }
        Ok(out)
    }

    pub(crate) fn nested(&self, name: &str, record: &'static str) -> Result<Projector<'a>, ProjectionError> {
        let value = self.field(name)?;
        if !value.is_object() {
            return Err(self.shape(name, "must be a mapping"));
        }
        Projector::new(record, value)
    }

    pub(crate) fn topic_groups(&self, name: &str) -> Result<Vec<TopicGroup>, ProjectionError> {
        let rows = self
            .field(name)?
            .as_array()
            .ok_or_else(|| self.shape(name, "must be a list of single-key mappings"))?;
        let mut groups = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            let object = row
                .as_object()
                .ok_or_else(|| self.shape(name, format!("item {idx} must be a mapping")))?;
            let mut entries = object.iter();
            let (Some((topic, items)), None) = (entries.next(), entries.next()) else {
                return Err(self.shape(
                    name,
                    format!("item {idx} must have exactly one key, found {}", object.len()),
                ));
            };
            groups.push(TopicGroup {
                topic: topic.clone(),
                items: self.text_list_value(name, items)?,
            });
        }
        Ok(groups)
    }
}
