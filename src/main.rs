use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sheet_consolidator::analyze::StructuralReport;
use sheet_consolidator::consolidate::{ColumnAlignment, ConsolidationOptions};
use sheet_consolidator::io::CalamineSource;
use sheet_consolidator::select::Target;
use sheet_consolidator::session::SessionContext;
use sheet_consolidator::{ConsolidationMode, Result, SelectionKey, ToolError, Workbook};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "sheet_consolidator=info";
const VERBOSE_FILTER: &str = "sheet_consolidator=debug";

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.verbose) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze(args) => execute_analyze(args),
        Command::Targets(args) => execute_targets(args),
        Command::Consolidate(args) => execute_consolidate(args),
    }
}

fn load_session(files: &[PathBuf]) -> Result<SessionContext> {
    for path in files {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.clone()));
        }
    }
    let workbooks = files.iter().map(Workbook::from_path).collect();
    Ok(SessionContext::new(workbooks))
}

fn execute_analyze(args: AnalyzeArgs) -> Result<()> {
    let mut session = load_session(&args.files)?;
    let report = session.analyze(&CalamineSource::new());
    if args.json {
        print_json(report)
    } else {
        print_report(report);
        Ok(())
    }
}

fn execute_targets(args: TargetsArgs) -> Result<()> {
    let mut session = load_session(&args.files)?;
    session.analyze(&CalamineSource::new());
    session.set_mode(args.mode.into());
    let targets = session.targets();
    if args.json {
        print_json(&targets)
    } else {
        print_targets(&targets);
        Ok(())
    }
}

fn execute_consolidate(args: ConsolidateArgs) -> Result<()> {
    let source = CalamineSource::new();
    let mode = ConsolidationMode::from(args.mode);
    let mut session = load_session(&args.files)?;

    let report = session.analyze(&source);
    for failure in &report.failures {
        eprintln!("warning: {failure}");
    }

    session.set_mode(mode);
    if args.all {
        session.select_all();
    } else {
        let candidates = args
            .select
            .iter()
            .map(|text| SelectionKey::parse(mode, text))
            .collect::<Result<Vec<_>>>()?;
        session.select(&candidates);
    }

    let (output, stats) = session.consolidate(
        &source,
        ConsolidationOptions {
            columns: args.columns.into(),
        },
        |progress| {
            info!(
                completed = progress.completed,
                total = progress.total,
                file = progress.file,
                "workbook processed"
            )
        },
    )?;
    std::fs::write(&args.output, &output.bytes)?;

    for failure in &stats.failures {
        eprintln!("warning: {failure}");
    }
    println!(
        "wrote {} ({} file(s) processed, {} sheet(s) consolidated)",
        args.output.display(),
        stats.files_processed,
        stats.sheets_consolidated
    );
    for name in &output.sheet_names {
        println!("  {name}");
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_report(report: &StructuralReport) {
    println!("workbooks: {}", report.total_workbooks());
    println!(
        "sheets per workbook (average): {:.1}",
        report.average_sheets_per_workbook()
    );
    println!("sheets: {}", report.total_sheets());
    for record in &report.records {
        println!();
        println!("{} - {} sheet(s)", record.file_name, record.sheet_count);
        for (idx, name) in record.sheet_names.iter().enumerate() {
            println!("  {}. {name}", idx + 1);
        }
    }
    for failure in &report.failures {
        eprintln!("warning: {failure}");
    }
}

fn print_targets(targets: &[Target]) {
    for target in targets {
        println!("{}\t{}\t{}", target.key, target.count, target.label);
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Merge same-position or same-name sheets across Excel workbooks."
)]
struct Cli {
    /// Enable debug logging.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the sheet structure of each workbook.
    Analyze(AnalyzeArgs),
    /// List the sheets that can be consolidated in a given mode.
    Targets(TargetsArgs),
    /// Merge the selected sheets into a single workbook.
    Consolidate(ConsolidateArgs),
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Emit the report as JSON.
    #[arg(long)]
    json: bool,

    /// Workbooks to inspect.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct TargetsArgs {
    /// How sheets are matched across workbooks.
    #[arg(long, value_enum)]
    mode: ModeArg,

    /// Emit the targets as JSON.
    #[arg(long)]
    json: bool,

    /// Workbooks to inspect.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct ConsolidateArgs {
    /// How sheets are matched across workbooks.
    #[arg(long, value_enum)]
    mode: ModeArg,

    /// Position (1-based) or sheet name to merge; repeat for several. Unknown
    /// keys are ignored.
    #[arg(long, required_unless_present = "all", conflicts_with = "all")]
    select: Vec<String>,

    /// Merge every available position or name.
    #[arg(long)]
    all: bool,

    /// Output workbook path.
    #[arg(long, default_value = "consolidated.xlsx")]
    output: PathBuf,

    /// How columns of later sheets are matched to the first one.
    #[arg(long, value_enum, default_value_t = ColumnsArg::First)]
    columns: ColumnsArg,

    /// Workbooks to merge, in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Position,
    Name,
}

impl From<ModeArg> for ConsolidationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Position => ConsolidationMode::ByPosition,
            ModeArg::Name => ConsolidationMode::ByName,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColumnsArg {
    First,
    Union,
}

impl From<ColumnsArg> for ColumnAlignment {
    fn from(columns: ColumnsArg) -> Self {
        match columns {
            ColumnsArg::First => ColumnAlignment::FirstSheet,
            ColumnsArg::Union => ColumnAlignment::Union,
        }
    }
}
