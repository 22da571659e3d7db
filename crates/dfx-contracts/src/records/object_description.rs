use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::{ProjectionError, Projector};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectDescription {
    pub general_description: String,
    pub components: Vec<String>,
    pub dimensions: IndexMap<String, String>,
    pub materials: Vec<String>,
    pub key_features: Vec<String>,
    pub intended_use: Vec<String>,
}

impl ObjectDescription {
    pub const FIELDS: [&'static str; 6] = [
        "general_description",
        "components",
        "dimensions",
        "materials",
        "key_features",
        "intended_use",
    ];

    pub fn project(value: &Value) -> Result<Self, ProjectionError> {
        let p = Projector::new("ObjectDescription", value)?;
        Ok(Self {
            general_description: p.text("general_description")?,
            components: p.text_list("components")?,
            dimensions: p.text_map("dimensions")?,
            materials: p.text_list("materials")?,
            key_features: p.text_list("key_features")?,
            intended_use: p.text_list("intended_use")?,
        })
    }
}
