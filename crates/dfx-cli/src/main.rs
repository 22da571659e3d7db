mod render;
mod staging;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use dfx_contracts::categories::{CategorySelection, CATEGORY_TABLE};
use dfx_contracts::events::EventWriter;
use dfx_contracts::report::{write_export, AnalysisReport, ReportError};
use dfx_engine::providers::default_provider_registry;
use dfx_engine::settings::{AnalyzerSettings, OpenAiSettings};
use dfx_engine::{run_session, DfxAnalyzer, SessionOptions, SessionOutcome};
use serde_json::{json, Value};

use crate::staging::StagedImage;

#[derive(Debug, Parser)]
#[command(name = "dfx", version, about = "Design for X analysis of product design images")]
struct Cli {
    /// Log debug diagnostics to stderr.
    #[arg(long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log errors.
    #[arg(long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Describe, brainstorm and specify the design in an image.
    Analyze(AnalyzeArgs),
    /// List the DfX categories.
    Categories,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    #[arg(long)]
    image: PathBuf,
    /// DfX category to specify; repeat or separate with commas.
    #[arg(long = "category", value_delimiter = ',')]
    categories: Vec<String>,
    #[arg(long, conflicts_with = "categories")]
    all_categories: bool,
    #[arg(long, env = "DFX_PROVIDER", default_value = "openai")]
    provider: String,
    /// Overrides DFX_MODEL for the OpenAI provider.
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    skip_describe: bool,
    #[arg(long)]
    skip_brainstorm: bool,
    #[arg(long)]
    skip_specifications: bool,
    /// Run the analyses concurrently.
    #[arg(long)]
    parallel: bool,
    /// Write the complete analysis here once every analysis succeeded.
    #[arg(long)]
    export: Option<PathBuf>,
    /// Append session events as JSON lines.
    #[arg(long)]
    events: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("dfx error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;
    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Categories => {
            print_categories();
            Ok(0)
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("DFX_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn print_categories() {
    for (_, name, description) in CATEGORY_TABLE {
        println!("{name:<18} {description}");
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let categories = resolve_categories(&args)?;
    let options = SessionOptions {
        describe: !args.skip_describe,
        brainstorm: !args.skip_brainstorm,
        specifications: !args.skip_specifications,
        parallel: args.parallel,
    };

    let mut openai = OpenAiSettings::from_env();
    if let Some(model) = args.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        openai.model = model.to_string();
    }
    let registry = default_provider_registry(openai)?;
    let provider = registry.get(&args.provider).ok_or_else(|| {
        anyhow!(
            "unknown provider '{}' (available: {})",
            args.provider,
            registry.names().join(", ")
        )
    })?;

    let staged = StagedImage::stage(&args.image)?;
    let session_id = uuid::Uuid::new_v4().to_string();
    let events = args
        .events
        .as_ref()
        .map(|path| EventWriter::new(path, session_id.clone()));
    let mut analyzer = DfxAnalyzer::new(provider, AnalyzerSettings::from_env());
    if let Some(events) = &events {
        analyzer = analyzer.with_events(events.clone());
    }
    let settings = analyzer.settings();
    emit(
        events.as_ref(),
        "session_started",
        json!({
            "image": args.image.display().to_string(),
            "provider": provider.name(),
            "categories": categories.names(),
            "parallel": options.parallel,
            "describe_max_output_tokens": settings.describe_max_output_tokens,
            "analysis_max_output_tokens": settings.analysis_max_output_tokens,
            "image_max_dim": settings.image_max_dim,
        }),
    );
    tracing::info!(%session_id, provider = provider.name(), ?settings, "starting analysis session");
    let outcome = run_session(&analyzer, staged.path(), &categories, &options);

    print!("{}", render::render_report(&outcome.report));
    report_failures(&outcome);
    if let Some(note) = missing_categories_note(&outcome.report) {
        eprintln!("dfx: {note}");
    }

    let mut exit_code = if outcome.all_succeeded() { 0 } else { 2 };
    if let Some(path) = args.export.as_deref() {
        match export_report(&outcome.report, path) {
            Ok(()) => {
                println!("Exported to {}", path.display());
                emit(
                    events.as_ref(),
                    "report_exported",
                    json!({"path": path.display().to_string()}),
                );
            }
            Err(err @ ReportError::Incomplete { .. }) => {
                eprintln!("dfx: {err}");
                exit_code = 2;
            }
            Err(err) => return Err(err).context("export failed"),
        }
    }

    emit(
        events.as_ref(),
        "session_finished",
        json!({
            "failures": outcome.failures.len(),
            "missing_sections": outcome
                .report
                .missing_sections()
                .iter()
                .map(|section| section.export_key())
                .collect::<Vec<_>>(),
        }),
    );
    drop(staged);
    Ok(exit_code)
}

fn resolve_categories(args: &AnalyzeArgs) -> Result<CategorySelection> {
    if args.all_categories {
        return Ok(CategorySelection::all());
    }
    if args.skip_specifications && args.categories.is_empty() {
        return Ok(CategorySelection::all());
    }
    if args.categories.is_empty() {
        bail!("select at least one DfX category with --category or use --all-categories");
    }
    Ok(CategorySelection::parse(&args.categories)?)
}

fn report_failures(outcome: &SessionOutcome) {
    for (kind, err) in &outcome.failures {
        eprintln!("dfx: {} failed ({}): {err}", kind.section(), err.kind());
        if let Some(raw) = err.raw_reply() {
            eprintln!("--- reply text ---\n{raw}\n------------------");
        }
    }
}

/// Names requested categories the specification reply did not cover.
fn missing_categories_note(report: &AnalysisReport) -> Option<String> {
    let set = report.specifications.as_ref()?;
    let missing = set.missing(&report.categories);
    if missing.is_empty() {
        return None;
    }
    let names = missing
        .iter()
        .map(|category| category.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "no usable specification for {} of {} requested categories: {names}",
        missing.len(),
        report.categories.len()
    ))
}

fn export_report(report: &AnalysisReport, path: &Path) -> Result<(), ReportError> {
    let document = report.export_document()?;
    write_export(path, &document)
}

fn emit(events: Option<&EventWriter>, event_type: &str, payload: Value) {
    let Some(events) = events else {
        return;
    };
    if let Err(err) = events.record(event_type, payload) {
        tracing::warn!(error = %err, event_type, "failed to write event");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::CommandFactory;
    use dfx_contracts::records::project_specifications;

    use super::*;

    fn analyze_args(argv: &[&str]) -> AnalyzeArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Analyze(args) => args,
            Command::Categories => panic!("expected analyze"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn categories_accept_repeats_and_commas() {
        let args = analyze_args(&[
            "dfx", "analyze", "--image", "cup.png", "--category", "safety,cost", "--category",
            "usability",
        ]);
        let selection = resolve_categories(&args).unwrap();
        assert_eq!(selection.names(), vec!["safety", "cost", "usability"]);
    }

    #[test]
    fn categories_are_required_for_specifications() {
        let args = analyze_args(&["dfx", "analyze", "--image", "cup.png"]);
        let err = resolve_categories(&args).unwrap_err();
        assert!(err.to_string().contains("--category"));

        let args = analyze_args(&["dfx", "analyze", "--image", "cup.png", "--skip-specifications"]);
        assert_eq!(resolve_categories(&args).unwrap().len(), 10);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let args = analyze_args(&["dfx", "analyze", "--image", "cup.png", "--category", "vibes"]);
        let err = resolve_categories(&args).unwrap_err();
        assert!(err.to_string().contains("unknown DfX category 'vibes'"));
    }

    #[test]
    fn all_categories_conflicts_with_explicit_list() {
        let result = Cli::try_parse_from([
            "dfx",
            "analyze",
            "--image",
            "cup.png",
            "--all-categories",
            "--category",
            "safety",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn dryrun_analysis_exports_complete_document() {
        let temp = tempfile::tempdir().unwrap();
        let image = temp.path().join("design.jpg");
        fs::write(&image, b"not decodable, sent raw").unwrap();
        let export = temp.path().join("out").join("analysis.json");
        let events = temp.path().join("events.jsonl");

        let args = analyze_args(&[
            "dfx",
            "analyze",
            "--image",
            image.to_str().unwrap(),
            "--category",
            "safety,cost",
            "--provider",
            "dryrun",
            "--export",
            export.to_str().unwrap(),
            "--events",
            events.to_str().unwrap(),
        ]);
        assert_eq!(run_analyze(args).unwrap(), 0);

        let document: Value = serde_json::from_str(&fs::read_to_string(&export).unwrap()).unwrap();
        assert!(document["object_description"]["components"].is_array());
        assert!(document["brainstorming_analysis"]["market_analysis"]["competitors"].is_array());
        assert!(document["specifications"]["safety"]["requirements"].is_array());
        assert!(document["specifications"]["cost"]["requirements"].is_array());

        let log = fs::read_to_string(&events).unwrap();
        let first: Value = serde_json::from_str(log.lines().next().unwrap()).unwrap();
        let last: Value = serde_json::from_str(log.lines().last().unwrap()).unwrap();
        assert_eq!(first["type"], json!("session_started"));
        assert_eq!(first["describe_max_output_tokens"], json!(1000));
        assert_eq!(first["analysis_max_output_tokens"], json!(4000));
        assert_eq!(last["type"], json!("session_finished"));
        assert!(log.contains("\"report_exported\""));
    }

    #[test]
    fn missing_categories_are_noted() {
        let categories = CategorySelection::parse(&["safety", "cost", "usability"]).unwrap();
        let mut report = AnalysisReport::new(categories);
        assert_eq!(missing_categories_note(&report), None);

        report.specifications = Some(
            project_specifications(&json!({
                "Safety": {
                    "specifications": [],
                    "requirements": [],
                    "constraints": [],
                    "recommendations": []
                }
            }))
            .unwrap(),
        );
        assert_eq!(
            missing_categories_note(&report).as_deref(),
            Some("no usable specification for 2 of 3 requested categories: cost, usability")
        );

        report.specifications = Some(project_specifications(&json!({})).unwrap());
        assert_eq!(
            missing_categories_note(&report).as_deref(),
            Some("no usable specification for 3 of 3 requested categories: safety, cost, usability")
        );
    }

    #[test]
    fn skipped_analysis_refuses_export() {
        let temp = tempfile::tempdir().unwrap();
        let image = temp.path().join("design.png");
        fs::write(&image, b"raw").unwrap();
        let export = temp.path().join("analysis.json");

        let args = analyze_args(&[
            "dfx",
            "analyze",
            "--image",
            image.to_str().unwrap(),
            "--skip-brainstorm",
            "--all-categories",
            "--provider",
            "dryrun",
            "--export",
            export.to_str().unwrap(),
        ]);
        assert_eq!(run_analyze(args).unwrap(), 2);
        assert!(!export.exists());
    }

    #[test]
    fn unknown_provider_is_a_usage_error() {
        let temp = tempfile::tempdir().unwrap();
        let image = temp.path().join("design.png");
        fs::write(&image, b"raw").unwrap();
        let args = analyze_args(&[
            "dfx",
            "analyze",
            "--image",
            image.to_str().unwrap(),
            "--all-categories",
            "--provider",
            "nope",
        ]);
        let err = run_analyze(args).unwrap_err();
        assert!(err.to_string().contains("unknown provider 'nope' (available: dryrun, openai)"));
    }
}
