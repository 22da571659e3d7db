use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::categories::{AnalysisCategory, CategorySelection};

use super::{ProjectionError, Projector};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DfXSpecification {
    /// Key the entry is filed under. Keys naming one of the ten
    /// categories are stored in canonical lowercase form; names the model
    /// inferred itself are kept as written.
    #[serde(skip)]
    pub category: String,
    pub specifications: Vec<String>,
    pub requirements: Vec<String>,
    pub constraints: Vec<String>,
    pub recommendations: Vec<String>,
}

impl DfXSpecification {
    pub const FIELDS: [&'static str; 4] = [
        "specifications",
        "requirements",
        "constraints",
        "recommendations",
    ];

    pub fn project(category: &str, value: &Value) -> Result<Self, ProjectionError> {
        let p = Projector::new("DfXSpecification", value)?;
        Ok(Self {
            category: category.to_string(),
            specifications: p.text_list("specifications")?,
            requirements: p.text_list("requirements")?,
            constraints: p.text_list("constraints")?,
            recommendations: p.text_list("recommendations")?,
        })
    }

    pub fn known_category(&self) -> Option<AnalysisCategory> {
        AnalysisCategory::lookup(&self.category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedCategory {
    pub category: String,
    pub reason: String,
}

/// Result of a multi-category specification reply.
///
/// Entries that fail projection are moved to `rejected`; they never fail
/// the entries next to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecificationSet {
    pub specifications: IndexMap<String, DfXSpecification>,
    pub rejected: Vec<RejectedCategory>,
}

impl SpecificationSet {
    pub fn get(&self, category: AnalysisCategory) -> Option<&DfXSpecification> {
        self.specifications.get(category.as_str())
    }

    pub fn len(&self) -> usize {
        self.specifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specifications.is_empty()
    }

    /// Requested categories the reply produced no usable entry for.
    pub fn missing(&self, selection: &CategorySelection) -> Vec<AnalysisCategory> {
        selection
            .iter()
            .filter(|category| {
                !self
                    .specifications
                    .values()
                    .any(|spec| spec.known_category() == Some(*category))
            })
            .collect()
    }

    /// Entries filed under names outside the selection.
    pub fn unrequested(&self, selection: &CategorySelection) -> Vec<&str> {
        self.specifications
            .keys()
            .filter(|name| !selection.contains_name(name))
            .map(String::as_str)
            .collect()
    }
}

pub fn project_specifications(value: &Value) -> Result<SpecificationSet, ProjectionError> {
    let object = value.as_object().ok_or(ProjectionError::NotAnObject {
        record: "SpecificationSet",
    })?;
    let mut set = SpecificationSet::default();
    for (key, entry) in object {
        let category = canonical_key(key);
        match DfXSpecification::project(&category, entry) {
            Ok(spec) => {
                set.specifications.insert(category, spec);
            }
            Err(err) => set.rejected.push(RejectedCategory {
                category,
                reason: err.to_string(),
            }),
        }
    }
    Ok(set)
}

fn canonical_key(key: &str) -> String {
    match AnalysisCategory::lookup(key) {
        Some(category) => category.as_str().to_string(),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(tag: &str) -> Value {
        json!({
            "specifications": [format!("{tag} spec 1"), format!("{tag} spec 2")],
            "requirements": [format!("{tag} requirement")],
            "constraints": [],
            "recommendations": [format!("{tag} recommendation")]
        })
    }

    #[test]
    fn reply_with_only_some_requested_categories_is_partial() {
        let selection = CategorySelection::parse(&["safety", "cost"]).unwrap();
        let set = project_specifications(&json!({"safety": entry("safety")})).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get(AnalysisCategory::Safety).is_some());
        assert!(set.get(AnalysisCategory::Cost).is_none());
        assert_eq!(set.missing(&selection), vec![AnalysisCategory::Cost]);
        assert!(set.rejected.is_empty());
    }

    #[test]
    fn malformed_entry_is_rejected_alone() {
        let reply = json!({
            "safety": entry("safety"),
            "cost": {"specifications": ["cheap"]},
            "usability": "not an object"
        });
        let set = project_specifications(&reply).unwrap();
        assert_eq!(set.specifications.keys().collect::<Vec<_>>(), vec!["safety"]);
        assert_eq!(set.rejected.len(), 2);
        assert_eq!(set.rejected[0].category, "cost");
        assert!(set.rejected[0].reason.contains("requirements"));
        assert_eq!(set.rejected[1].category, "usability");
    }

    #[test]
    fn inferred_category_names_are_kept() {
        let selection = CategorySelection::parse(&["safety"]).unwrap();
        let reply = json!({"safety": entry("safety"), "ergonomics": entry("ergonomics")});
        let set = project_specifications(&reply).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.unrequested(&selection), vec!["ergonomics"]);
        assert_eq!(set.specifications["ergonomics"].known_category(), None);
        assert_eq!(
            set.specifications["safety"].known_category(),
            Some(AnalysisCategory::Safety)
        );
    }

    #[test]
    fn known_category_keys_are_canonicalized() {
        let selection = CategorySelection::parse(&["safety", "cost"]).unwrap();
        let reply = json!({
            "Safety": entry("safety"),
            " COST ": {"specifications": []},
            "Ergonomics": entry("ergonomics")
        });
        let set = project_specifications(&reply).unwrap();
        assert_eq!(
            set.specifications.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["safety", "Ergonomics"]
        );
        assert_eq!(set.get(AnalysisCategory::Safety).unwrap().category, "safety");
        assert_eq!(set.missing(&selection), vec![AnalysisCategory::Cost]);
        assert_eq!(set.rejected[0].category, "cost");
        assert_eq!(set.unrequested(&selection), vec!["Ergonomics"]);
    }

    #[test]
    fn reply_order_is_kept() {
        let reply = json!({"cost": entry("cost"), "compliance": entry("compliance"), "safety": entry("safety")});
        let set = project_specifications(&reply).unwrap();
        assert_eq!(
            set.specifications.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["cost", "compliance", "safety"]
        );
    }

    #[test]
    fn non_object_reply_fails() {
        assert!(project_specifications(&json!([entry("safety")])).is_err());
    }

    #[test]
    fn category_is_not_serialized() {
        let spec = DfXSpecification::project("safety", &entry("safety")).unwrap();
        let value = serde_json::to_value(&spec).unwrap();
        assert!(value.get("category").is_none());
        assert_eq!(value["requirements"], json!(["safety requirement"]));
    }
}
