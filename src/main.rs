mod config;
mod kissflow;
mod report;
mod wizard;

use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span};
use tracing_subscriber::EnvFilter;

use kissflow::{FetchError, ItemId, ItemSource};
use report::types::ReportField;
use report::{Defect, ExportFormat, ReportContext, ReportError, ReportRecord};
use wizard::{Action, BuildCounts, Step, Wizard};

/// Item used by `--mock` when no item id is given.
const MOCK_ITEM_ID: &str = "KFF-0111";

/// QSR Report: CLI tool that fetches Kissflow feature items, checks them for
/// missing metadata, and exports Test Summary Reports as HTML, PDF, or DOCX.
#[derive(Parser, Debug)]
#[command(name = "qsr-report", version, about)]
struct Cli {
    /// Kissflow item IDs (e.g., KFF-0111); each one gets its own report
    ///
    /// Not required when --mock is used. With several items, each report is
    /// written to a subdirectory named after its item.
    item_ids: Vec<String>,

    /// Use built-in mock item data (no backend or Kissflow credentials needed)
    #[arg(long)]
    r#mock: bool,

    /// TOML file of field values, test builds, and defects to merge into the fetched record
    #[arg(short, long)]
    edits: Option<PathBuf>,

    /// Set one report field, e.g. --set ReviewedBy="Jane Doe" (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    set: Vec<(ReportField, String)>,

    /// Append a test build, e.g. --build 40,38,35 or --build 40,38,35,2 (repeatable)
    #[arg(
        long = "build",
        value_name = "DESIGNED,EXECUTED,PASSED[,DEFECTS]",
        value_parser = parse_build
    )]
    builds: Vec<BuildCounts>,

    /// Remove the Nth test build, counting from 1 (repeatable)
    #[arg(long = "remove-build", value_name = "N", value_parser = parse_position)]
    remove_builds: Vec<usize>,

    /// Append a defect, e.g. --defect "FL-009:In Progress:High" (repeatable)
    #[arg(long = "defect", value_name = "ID:STATUS:SEVERITY", value_parser = parse_defect)]
    defects: Vec<Defect>,

    /// Remove the Nth defect, counting from 1 (repeatable)
    #[arg(long = "remove-defect", value_name = "N", value_parser = parse_position)]
    remove_defects: Vec<usize>,

    /// Output format (repeatable); all formats when omitted
    #[arg(short, long = "format", value_enum)]
    formats: Vec<ExportFormat>,

    /// Directory for the exported files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Generate the report even when required fields are still missing
    #[arg(long)]
    allow_missing: bool,
}

/// Settings shared by every item in one invocation.
struct RunOptions {
    /// Validation-step actions, replayed for each item
    edits: Vec<Action>,
    allow_missing: bool,
    formats: Vec<ExportFormat>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load()?;

    let item_ids = requested_items(&cli.item_ids, cli.r#mock)?;
    let source = kissflow::select_source(&config, cli.r#mock)?;

    let edits = match cli.edits.as_deref() {
        Some(path) => {
            info!(path = %path.display(), "loading edits file");
            Some(load_edits(path)?)
        }
        None => None,
    };
    let options = RunOptions {
        edits: edit_actions(&cli, edits),
        allow_missing: cli.allow_missing,
        formats: selected_formats(&cli.formats),
    };
    let output_dir = cli.output_dir.unwrap_or_else(|| config.output_dir());

    let mut wizard = Wizard::default();
    for (i, item_id) in item_ids.iter().enumerate() {
        if i > 0 {
            wizard.dispatch(Action::StartOver)?;
        }
        let _item_span = info_span!("qsr_report", item_id = %item_id).entered();
        let dir = if item_ids.len() > 1 {
            output_dir.join(item_id.as_str())
        } else {
            output_dir.clone()
        };
        run_item(&mut wizard, source.as_ref(), item_id, &options, &dir).await?;
    }

    Ok(())
}

/// Take one item through all four wizard steps.
async fn run_item(
    wizard: &mut Wizard,
    source: &dyn ItemSource,
    item_id: &ItemId,
    options: &RunOptions,
    dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    // Step 1: fetch
    info!(source = source.name(), "fetching item");
    wizard.dispatch(Action::FetchStarted)?;
    match source.fetch(item_id).await {
        Ok(response) => wizard.dispatch(Action::FetchSucceeded(response))?,
        Err(e) => {
            wizard.dispatch(Action::FetchFailed(e.to_string()))?;
            print_progress(wizard);
            return Err(e.into());
        }
    }
    print_progress(wizard);

    // Step 2: validate, after applying edits
    for action in &options.edits {
        wizard.dispatch(action.clone())?;
    }
    wizard.dispatch(Action::Validate {
        allow_missing: options.allow_missing,
    })?;
    if !wizard.missing_fields().is_empty() {
        report::print_missing_fields(wizard.missing_fields());
    }
    print_progress(wizard);
    if wizard.step() == Step::Validate {
        let message = wizard.error().unwrap_or("required fields are missing");
        return Err(
            format!("{message}. Fill them with --set or --edits, or pass --allow-missing").into(),
        );
    }

    // Step 3: generate every selected format in memory
    wizard.dispatch(Action::GenerateStarted)?;
    let record = wizard.record().clone();
    let context = report::assemble(&record, chrono::Local::now().date_naive());
    let artifacts = match render_all(&context, &options.formats) {
        Ok(artifacts) => artifacts,
        Err(e) => {
            wizard.dispatch(Action::GenerateFailed(e.to_string()))?;
            print_progress(wizard);
            return Err(e.into());
        }
    };
    wizard.dispatch(Action::GenerateSucceeded)?;
    report::print_summary(&context);

    // Step 4: export
    for (format, bytes) in &artifacts {
        match report::export(&context, *format, bytes, dir) {
            Ok(path) => {
                println!("{} {} report: {}", "✓".green(), format, path.display());
                wizard.dispatch(Action::Exported(*format))?;
            }
            Err(e) => {
                error!(format = %format, error = %e, "export failed");
                wizard.dispatch(Action::ExportFailed(*format, e.to_string()))?;
            }
        }
    }
    print_progress(wizard);
    info!(exported = wizard.exported().len(), "done");

    Ok(())
}

fn print_progress(wizard: &Wizard) {
    println!("{}", wizard.progress_line().dimmed());
}

/// Render each format, stopping at the first failure.
fn render_all(
    context: &ReportContext<'_>,
    formats: &[ExportFormat],
) -> Result<Vec<(ExportFormat, Vec<u8>)>, ReportError> {
    formats
        .iter()
        .map(|&format| Ok((format, context.render(format)?)))
        .collect()
}

/// Item ids to report on; `--mock` alone reports on the bundled item.
fn requested_items(raw: &[String], mock: bool) -> Result<Vec<ItemId>, FetchError> {
    if raw.is_empty() {
        let id = if mock { MOCK_ITEM_ID } else { "" };
        return Ok(vec![kissflow::parse_item_id(id)?]);
    }
    raw.iter().map(|id| kissflow::parse_item_id(id)).collect()
}

/// Validation-step edits in the order they apply: the edits file, removals
/// (highest position first, so lower positions still point at the same
/// entry), additions, then `--set` values.
fn edit_actions(cli: &Cli, edits: Option<ReportRecord>) -> Vec<Action> {
    let mut actions = Vec::new();
    if let Some(edits) = edits {
        actions.push(Action::MergeEdits(edits));
    }
    actions.extend(descending(&cli.remove_builds).map(|n| Action::RemoveTestBuild(n - 1)));
    actions.extend(descending(&cli.remove_defects).map(|n| Action::RemoveDefect(n - 1)));
    actions.extend(cli.builds.iter().copied().map(Action::AddTestBuild));
    actions.extend(cli.defects.iter().cloned().map(Action::AddDefect));
    actions.extend(cli.set.iter().cloned().map(|(field, value)| Action::SetField(field, value)));
    actions
}

fn descending(positions: &[usize]) -> impl Iterator<Item = usize> {
    let mut positions = positions.to_vec();
    positions.sort_unstable_by(|a, b| b.cmp(a));
    positions.dedup();
    positions.into_iter()
}

/// Parse `NAME=VALUE` where NAME is a report field wire name.
fn parse_assignment(raw: &str) -> Result<(ReportField, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    let field = name.trim().parse::<ReportField>()?;
    Ok((field, value.to_string()))
}

/// Parse `DESIGNED,EXECUTED,PASSED[,DEFECTS]`.
fn parse_build(raw: &str) -> Result<BuildCounts, String> {
    let counts = raw
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u32>()
                .map_err(|e| format!("invalid count `{part}`: {e}"))
        })
        .collect::<Result<Vec<u32>, String>>()?;
    let (designed, executed, passed, defects_found) = match *counts.as_slice() {
        [designed, executed, passed] => (designed, executed, passed, 0),
        [designed, executed, passed, defects] => (designed, executed, passed, defects),
        _ => return Err(format!("expected DESIGNED,EXECUTED,PASSED[,DEFECTS], got `{raw}`")),
    };
    Ok(BuildCounts {
        designed,
        executed,
        passed,
        defects_found,
    })
}

/// Parse `ID:STATUS:SEVERITY`; the id may itself contain colons.
fn parse_defect(raw: &str) -> Result<Defect, String> {
    let mut parts = raw.rsplitn(3, ':');
    let (Some(severity), Some(status), Some(id)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected ID:STATUS:SEVERITY, got `{raw}`"));
    };
    let id = id.trim();
    if id.is_empty() {
        return Err("defect id is empty".to_string());
    }
    Ok(Defect {
        defect_id: id.to_string(),
        status: status.trim().parse()?,
        severity: severity.trim().parse()?,
    })
}

/// Parse a 1-based list position.
fn parse_position(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected a position starting at 1, got `{raw}`")),
    }
}

/// Requested formats in order, without repeats; every format when none were given.
fn selected_formats(requested: &[ExportFormat]) -> Vec<ExportFormat> {
    if requested.is_empty() {
        return ExportFormat::ALL.to_vec();
    }
    let mut formats = Vec::with_capacity(requested.len());
    for format in requested {
        if !formats.contains(format) {
            formats.push(*format);
        }
    }
    formats
}

/// Read a TOML edits file keyed by the record's wire names.
fn load_edits(path: &Path) -> Result<ReportRecord, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read edits file {}: {e}", path.display()))?;
    let edits = toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse edits file {}: {e}", path.display()))?;
    Ok(edits)
}
