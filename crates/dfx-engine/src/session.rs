use std::panic;
use std::path::Path;
use std::thread::{self, ScopedJoinHandle};

use dfx_contracts::categories::CategorySelection;
use dfx_contracts::report::AnalysisReport;

use crate::{AnalysisError, AnalysisKind, DfxAnalyzer};

/// Which analyses a session runs and whether they may overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub describe: bool,
    pub brainstorm: bool,
    pub specifications: bool,
    pub parallel: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            describe: true,
            brainstorm: true,
            specifications: true,
            parallel: false,
        }
    }
}

#[derive(Debug)]
pub struct SessionOutcome {
    pub report: AnalysisReport,
    pub failures: Vec<(AnalysisKind, AnalysisError)>,
}

impl SessionOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the selected analyses for one staged image.
///
/// A failed analysis leaves its report section empty and is listed in
/// `failures`; the remaining analyses still run.
pub fn run_session(
    analyzer: &DfxAnalyzer<'_>,
    image: &Path,
    categories: &CategorySelection,
    options: &SessionOptions,
) -> SessionOutcome {
    let (describe, brainstorm, specifications) = if options.parallel {
        thread::scope(|scope| {
            let describe = options
                .describe
                .then(|| scope.spawn(|| analyzer.describe_object(image)));
            let brainstorm = options
                .brainstorm
                .then(|| scope.spawn(|| analyzer.brainstorm(image)));
            let specifications = options
                .specifications
                .then(|| scope.spawn(|| analyzer.analyze_specifications(image, categories)));
            (join(describe), join(brainstorm), join(specifications))
        })
    } else {
        (
            options.describe.then(|| analyzer.describe_object(image)),
            options.brainstorm.then(|| analyzer.brainstorm(image)),
            options
                .specifications
                .then(|| analyzer.analyze_specifications(image, categories)),
        )
    };

    let mut outcome = SessionOutcome {
        report: AnalysisReport::new(categories.clone()),
        failures: Vec::new(),
    };
    outcome.report.object_description = settle(AnalysisKind::Describe, describe, &mut outcome.failures);
    outcome.report.brainstorming = settle(AnalysisKind::Brainstorm, brainstorm, &mut outcome.failures);
    outcome.report.specifications =
        settle(AnalysisKind::Specifications, specifications, &mut outcome.failures);
    outcome
}

fn join<T>(handle: Option<ScopedJoinHandle<'_, T>>) -> Option<T> {
    handle.map(|handle| {
        handle
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload))
    })
}

fn settle<T>(
    kind: AnalysisKind,
    result: Option<Result<T, AnalysisError>>,
    failures: &mut Vec<(AnalysisKind, AnalysisError)>,
) -> Option<T> {
    match result? {
        Ok(record) => Some(record),
        Err(err) => {
            failures.push((kind, err));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use dfx_contracts::report::ReportSection;

    use super::*;
    use crate::providers::DryrunVisionProvider;
    use crate::settings::AnalyzerSettings;
    use crate::testing::{write_test_image, ScriptedProvider};

    #[test]
    fn dryrun_session_completes_every_section() {
        let temp = tempfile::tempdir().unwrap();
        let image = write_test_image(temp.path());
        let analyzer = DfxAnalyzer::new(&DryrunVisionProvider, AnalyzerSettings::default());
        let categories = CategorySelection::parse(&["safety", "cost"]).unwrap();

        let outcome = run_session(&analyzer, &image, &categories, &SessionOptions::default());
        assert!(outcome.all_succeeded(), "failures: {:?}", outcome.failures);
        assert!(outcome.report.is_complete());
        let specs = outcome.report.specifications.as_ref().unwrap();
        assert_eq!(
            specs.specifications.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["safety", "cost"]
        );
        assert!(outcome.report.export_document().is_ok());
    }

    #[test]
    fn parallel_session_matches_sequential_result() {
        let temp = tempfile::tempdir().unwrap();
        let image = write_test_image(temp.path());
        let analyzer = DfxAnalyzer::new(&DryrunVisionProvider, AnalyzerSettings::default());
        let categories = CategorySelection::all();

        let sequential = run_session(&analyzer, &image, &categories, &SessionOptions::default());
        let parallel = run_session(
            &analyzer,
            &image,
            &categories,
            &SessionOptions {
                parallel: true,
                ..SessionOptions::default()
            },
        );
        assert!(parallel.all_succeeded());
        assert_eq!(
            sequential.report.object_description,
            parallel.report.object_description
        );
        assert_eq!(sequential.report.brainstorming, parallel.report.brainstorming);
        assert_eq!(sequential.report.specifications, parallel.report.specifications);
    }

    #[test]
    fn one_failed_analysis_does_not_stop_the_others() {
        let temp = tempfile::tempdir().unwrap();
        let image = write_test_image(temp.path());
        let provider = ScriptedProvider::default()
            .reply(
                AnalysisKind::Describe,
                r#"{"general_description": "A cup", "components": [], "dimensions": {}, "materials": [], "key_features": [], "intended_use": []}"#,
            )
            .fail(AnalysisKind::Brainstorm, "503 service unavailable")
            .reply(AnalysisKind::Specifications, "no json here");
        let analyzer = DfxAnalyzer::new(&provider, AnalyzerSettings::default());
        let categories = CategorySelection::parse(&["safety"]).unwrap();

        let outcome = run_session(&analyzer, &image, &categories, &SessionOptions::default());
        assert!(outcome.report.object_description.is_some());
        assert_eq!(
            outcome
                .failures
                .iter()
                .map(|(kind, err)| (*kind, err.kind()))
                .collect::<Vec<_>>(),
            vec![
                (AnalysisKind::Brainstorm, "transport"),
                (AnalysisKind::Specifications, "sanitize"),
            ]
        );
        assert_eq!(
            outcome.report.missing_sections(),
            vec![ReportSection::Brainstorming, ReportSection::Specifications]
        );
        assert!(outcome.report.export_document().is_err());
    }

    #[test]
    fn skipped_analyses_send_no_request() {
        let temp = tempfile::tempdir().unwrap();
        let image = write_test_image(temp.path());
        let provider = ScriptedProvider::default().reply(AnalysisKind::Brainstorm, "{}");
        let analyzer = DfxAnalyzer::new(&provider, AnalyzerSettings::default());
        let options = SessionOptions {
            describe: false,
            specifications: false,
            ..SessionOptions::default()
        };

        let outcome = run_session(&analyzer, &image, &CategorySelection::all(), &options);
        assert_eq!(provider.requests().len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].1.kind(), "projection");
        assert_eq!(outcome.report.missing_sections().len(), 3);
    }
}
