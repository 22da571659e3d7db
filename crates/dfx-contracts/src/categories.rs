use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One Design-for-X concern a specification can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisCategory {
    Manufacturability,
    Reliability,
    Sustainability,
    Usability,
    Cost,
    Safety,
    Performance,
    Maintainability,
    Scalability,
    Compliance,
}

/// Names and descriptions of every category, in display order.
///
/// Both prompt construction and input validation read from this table.
pub static CATEGORY_TABLE: [(AnalysisCategory, &str, &str); 10] = [
    (
        AnalysisCategory::Manufacturability,
        "manufacturability",
        "Manufacturing process and production specifications",
    ),
    (
        AnalysisCategory::Reliability,
        "reliability",
        "Product reliability and durability specifications",
    ),
    (
        AnalysisCategory::Sustainability,
        "sustainability",
        "Environmental and resource efficiency specifications",
    ),
    (
        AnalysisCategory::Usability,
        "usability",
        "User interaction and accessibility specifications",
    ),
    (
        AnalysisCategory::Cost,
        "cost",
        "Cost-related specifications and requirements",
    ),
    (
        AnalysisCategory::Safety,
        "safety",
        "Safety standards and requirements",
    ),
    (
        AnalysisCategory::Performance,
        "performance",
        "Performance specifications and benchmarks",
    ),
    (
        AnalysisCategory::Maintainability,
        "maintainability",
        "Maintenance and serviceability specifications",
    ),
    (
        AnalysisCategory::Scalability,
        "scalability",
        "Growth and adaptation specifications",
    ),
    (
        AnalysisCategory::Compliance,
        "compliance",
        "Regulatory and standards compliance specifications",
    ),
];

impl AnalysisCategory {
    pub const ALL: [AnalysisCategory; 10] = [
        AnalysisCategory::Manufacturability,
        AnalysisCategory::Reliability,
        AnalysisCategory::Sustainability,
        AnalysisCategory::Usability,
        AnalysisCategory::Cost,
        AnalysisCategory::Safety,
        AnalysisCategory::Performance,
        AnalysisCategory::Maintainability,
        AnalysisCategory::Scalability,
        AnalysisCategory::Compliance,
    ];

    fn row(self) -> &'static (AnalysisCategory, &'static str, &'static str) {
        // Table rows are declared in enum order.
        &CATEGORY_TABLE[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        self.row().1
    }

    pub fn description(self) -> &'static str {
        self.row().2
    }

    pub fn lookup(name: &str) -> Option<Self> {
        let needle = name.trim().to_ascii_lowercase();
        CATEGORY_TABLE
            .iter()
            .find(|(_, known, _)| *known == needle)
            .map(|(category, _, _)| *category)
    }
}

impl fmt::Display for AnalysisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisCategory {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| CategoryError::Unknown(s.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("unknown DfX category '{0}' (run `dfx categories` for the list)")]
    Unknown(String),

    #[error("select at least one DfX category")]
    Empty,
}

/// Non-empty, de-duplicated set of categories in the order they were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySelection {
    categories: Vec<AnalysisCategory>,
}

impl CategorySelection {
    pub fn new(categories: impl IntoIterator<Item = AnalysisCategory>) -> Result<Self, CategoryError> {
        let mut unique = Vec::new();
        for category in categories {
            if !unique.contains(&category) {
                unique.push(category);
            }
        }
        if unique.is_empty() {
            return Err(CategoryError::Empty);
        }
        Ok(Self { categories: unique })
    }

    /// Parses raw names; each item may itself be a comma separated list.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, CategoryError> {
        let mut parsed = Vec::new();
        for raw in names {
            for part in raw.as_ref().split(',') {
                if part.trim().is_empty() {
                    continue;
                }
                parsed.push(part.parse::<AnalysisCategory>()?);
            }
        }
        Self::new(parsed)
    }

    pub fn all() -> Self {
        Self {
            categories: AnalysisCategory::ALL.to_vec(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = AnalysisCategory> + '_ {
        self.categories.iter().copied()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        AnalysisCategory::lookup(name)
            .map(|category| self.categories.contains(&category))
            .unwrap_or(false)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(AnalysisCategory::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
