use clap::{Parser, Subcommand, Args, ValueEnum};
use chrono::NaiveDate;
use smartflow::constants::DEFAULT_OUTPUT_FILE;
use smartflow::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sfcli")]
#[command(version, about = "SmartFlow CLI - Turn clinic billing exports into lab turnaround and pivot reports", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the report workbook from a billing export
    Process(ProcessArgs),
    /// Summarize what a run would do with a billing export
    Stats(StatsArgs),
    /// Print or save the active rule profile as TOML
    Rules(RulesArgs),
}

#[derive(Args)]
struct RunOptions {
    /// Built-in rule profile
    #[arg(long, value_enum)]
    profile: Option<ProfileOpt>,
    /// TOML rule profile overriding the built-in one
    #[arg(long)]
    rules: Option<PathBuf>,
    /// Configuration file (defaults to ~/.config/smartflow/config.toml)
    #[arg(long, env = "SMARTFLOW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ProcessArgs {
    /// Billing export (.xlsx, .xls, .xlsm, .ods or .csv)
    #[arg(short, long)]
    input: PathBuf,
    /// Output file path
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Export format
    #[arg(long, value_enum)]
    format: Option<ExportFormatOpt>,
    /// Report date stamped on line items (dd/mm/yyyy), defaults to today
    #[arg(long, value_parser = parse_report_date)]
    date: Option<NaiveDate>,
    /// Worksheet to read instead of the first one
    #[arg(long)]
    sheet: Option<String>,
    #[command(flatten)]
    options: RunOptions,
}

#[derive(Args)]
struct StatsArgs {
    /// Billing export (.xlsx, .xls, .xlsm, .ods or .csv)
    #[arg(short, long)]
    input: PathBuf,
    /// Limit entries listed per section
    #[arg(long, default_value_t = 10)]
    limit: usize,
    #[command(flatten)]
    options: RunOptions,
}

#[derive(Args)]
struct RulesArgs {
    /// Write the profile here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    options: RunOptions,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum ProfileOpt {
    Legacy,
    Extended,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum ExportFormatOpt {
    Xlsx,
    Csv,
    Json,
}

impl From<ExportFormatOpt> for ExportFormat {
    fn from(opt: ExportFormatOpt) -> Self {
        match opt {
            ExportFormatOpt::Xlsx => ExportFormat::Xlsx,
            ExportFormatOpt::Csv => ExportFormat::Csv,
            ExportFormatOpt::Json => ExportFormat::Json,
        }
    }
}

fn parse_report_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .map_err(|e| format!("expected dd/mm/yyyy: {}", e))
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smartflow={0},sfcli={0}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Process(args) => cmd_process(args),
        Commands::Stats(args) => cmd_stats(args),
        Commands::Rules(args) => cmd_rules(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}

/// Layered config with command-line overrides applied
fn load_config(options: &RunOptions) -> Result<SmartFlowConfig> {
    let mut config = match &options.config {
        Some(path) => SmartFlowConfig::load_from(path)?,
        None => SmartFlowConfig::load()?,
    };
    if let Some(profile) = options.profile {
        config.profile = match profile {
            ProfileOpt::Legacy => ProfileKind::Legacy,
            ProfileOpt::Extended => ProfileKind::Extended,
        };
        // an explicit built-in profile beats a configured rules file
        config.rules_file = None;
    }
    if let Some(rules) = &options.rules {
        config.rules_file = Some(rules.clone());
    }
    Ok(config)
}

fn cmd_process(args: ProcessArgs) -> Result<()> {
    let config = load_config(&args.options)?;
    let format = args.format.map(ExportFormat::from).unwrap_or(config.default_export_format);
    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(DEFAULT_OUTPUT_FILE).with_extension(format.extension())
    });

    let mut builder = BillingPipelineBuilder::from_config(&config)?;
    if let Some(date) = args.date {
        builder = builder.report_date(date);
    }
    if let Some(sheet) = args.sheet {
        builder = builder.input_sheet(sheet);
    }
    let pipeline = builder.build()?;

    let report = pipeline.run_file(&args.input)?;
    let written = pipeline.export(&report, &output, format)?;

    println!(
        "Processed {} rows: {} line items, {} QLAB items ({} profile)",
        report.source_rows,
        report.line_items.len(),
        report.qlab_items.len(),
        pipeline.profile().name
    );
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn cmd_stats(args: StatsArgs) -> Result<()> {
    let config = load_config(&args.options)?;
    let pipeline = BillingPipelineBuilder::from_config(&config)?.build()?;
    let report = pipeline.run_file(&args.input)?;
    ReportAnalytics::new(&report, pipeline.profile()).print_summary(args.limit);
    Ok(())
}

fn cmd_rules(args: RulesArgs) -> Result<()> {
    let config = load_config(&args.options)?;
    let profile = config.resolve_profile()?;
    match args.output {
        Some(path) => {
            profile.save(&path)?;
            println!("Saved '{}' rule profile to {}", profile.name, path.display());
        }
        None => print!("{}", profile.to_toml()?),
    }
    Ok(())
}
