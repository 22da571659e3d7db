//! Assembles analysis results into the exportable document.
//!
//! Export is only offered once every requested analysis produced a record;
//! [`AnalysisReport::export_document`] refuses a partial report instead of
//! writing holes into the file.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::categories::CategorySelection;
use crate::records::{DesignBrainstorming, DfXSpecification, ObjectDescription, SpecificationSet};

pub const DEFAULT_EXPORT_FILE_NAME: &str = "dfx_complete_analysis.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportSection {
    ObjectDescription,
    Brainstorming,
    Specifications,
}

impl ReportSection {
    pub const ALL: [ReportSection; 3] = [
        ReportSection::ObjectDescription,
        ReportSection::Brainstorming,
        ReportSection::Specifications,
    ];

    /// Key of the section in the export document.
    pub fn export_key(self) -> &'static str {
        match self {
            ReportSection::ObjectDescription => "object_description",
            ReportSection::Brainstorming => "brainstorming_analysis",
            ReportSection::Specifications => "specifications",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportSection::ObjectDescription => "Object Description",
            ReportSection::Brainstorming => "Design Brainstorming",
            ReportSection::Specifications => "DfX Specifications",
        }
    }
}

impl fmt::Display for ReportSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("export unavailable until every analysis completes (missing: {})", join_sections(.missing))]
    Incomplete { missing: Vec<ReportSection> },

    #[error("failed to serialize export document")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write export file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn join_sections(sections: &[ReportSection]) -> String {
    sections
        .iter()
        .map(|section| section.export_key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Results of one session. Any section may be absent when its analysis
/// failed or was skipped.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub categories: CategorySelection,
    pub object_description: Option<ObjectDescription>,
    pub brainstorming: Option<DesignBrainstorming>,
    pub specifications: Option<SpecificationSet>,
}

impl AnalysisReport {
    pub fn new(categories: CategorySelection) -> Self {
        Self {
            categories,
            object_description: None,
            brainstorming: None,
            specifications: None,
        }
    }

    pub fn missing_sections(&self) -> Vec<ReportSection> {
        ReportSection::ALL
            .into_iter()
            .filter(|section| match section {
                ReportSection::ObjectDescription => self.object_description.is_none(),
                ReportSection::Brainstorming => self.brainstorming.is_none(),
                ReportSection::Specifications => self.specifications.is_none(),
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_sections().is_empty()
    }

    pub fn export_document(&self) -> Result<ExportDocument<'_>, ReportError> {
        match (
            &self.object_description,
            &self.brainstorming,
            &self.specifications,
        ) {
            (Some(object_description), Some(brainstorming_analysis), Some(specs)) => {
                Ok(ExportDocument {
                    object_description,
                    brainstorming_analysis,
                    specifications: specs
                        .specifications
                        .iter()
                        .map(|(category, spec)| (category.as_str(), spec))
                        .collect(),
                })
            }
            _ => Err(ReportError::Incomplete {
                missing: self.missing_sections(),
            }),
        }
    }
}

/// Borrowed view of a complete report in its export shape.
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub object_description: &'a ObjectDescription,
    pub brainstorming_analysis: &'a DesignBrainstorming,
    pub specifications: IndexMap<&'a str, &'a DfXSpecification>,
}

impl ExportDocument<'_> {
    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn write_export(path: &Path, document: &ExportDocument<'_>) -> Result<(), ReportError> {
    let body = document.to_json_pretty()?;
    let io_err = |source| ReportError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    std::fs::write(path, body).map_err(io_err)?;
    Ok(())
}
