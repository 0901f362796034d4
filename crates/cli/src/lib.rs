use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use threatspec_core::{
    check_coverage, unmitigated, AnnotationReader, CheckConfig, CoverageProfile, Model,
    NoExtractor, SourceExtractor, DEFAULT_MIN_COVERAGE,
};
use threatspec_extractor::TreeSitterExtractor;

mod report;
mod settings;

use settings::Settings;

/// Exit status when unmitigated exposures are found outside warn-only mode
const EXIT_FINDINGS: i32 = 1;
/// Exit status when the coverage profile cannot be read
const EXIT_BAD_PROFILE: i32 = 2;
/// Exit status for an unusable coverage threshold
const EXIT_BAD_THRESHOLD: i32 = 3;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "threatspec")]
#[command(about = "Threat modeling from annotated source code", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Settings file (default: ./threatspec.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a threat model from sources, annotation files and models, and print it as JSON
    Parse(ParseArgs),

    /// Report unmitigated exposures and mitigation coverage
    Check(CheckArgs),

    /// List unmitigated exposures of serialized models
    Report(ReportArgs),

    /// Write every relation of serialized models as CSV
    Csv(CsvArgs),

    /// Check that serialized models load and are consistent
    Validate(ValidateArgs),
}

#[derive(Args)]
struct ParseArgs {
    /// Source files, .threatspec files and .json models, read in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Project the relations are recorded under
    #[arg(short, long)]
    project: Option<String>,

    /// Write the model here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    /// Source files, .threatspec files and .json models, read in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Project the relations are recorded under
    #[arg(short, long)]
    project: Option<String>,

    /// Only warn, never exit non-zero on findings
    #[arg(long)]
    warn: bool,

    /// Per-function coverage profile to check mitigations against
    #[arg(long, value_name = "PROFILE")]
    func: Option<PathBuf>,

    /// Minimal coverage for mitigation functions (default 100.0)
    #[arg(long, value_name = "PERCENT")]
    mincov: Option<String>,
}

#[derive(Args)]
struct ReportArgs {
    /// Serialized models; each replaces the previous one
    #[arg(required = true)]
    models: Vec<PathBuf>,

    /// Only warn, never exit non-zero on findings
    #[arg(long)]
    warn: bool,
}

#[derive(Args)]
struct CsvArgs {
    /// Serialized models; each replaces the previous one
    #[arg(required = true)]
    models: Vec<PathBuf>,

    /// Output csv file
    #[arg(short, long, default_value = "threatspec.csv")]
    out: PathBuf,
}

#[derive(Args)]
struct ValidateArgs {
    /// Serialized models to check
    #[arg(required = true)]
    models: Vec<PathBuf>,
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Parse(args) => run_parse(args, &settings)?,
        Commands::Check(args) => run_check(args, &settings)?,
        Commands::Report(args) => run_report(args, &settings)?,
        Commands::Csv(args) => run_csv(args)?,
        Commands::Validate(args) => run_validate(args)?,
    }

    Ok(())
}

fn build_model(inputs: &[PathBuf], project: String, settings: &Settings) -> Result<Model> {
    let extractor = TreeSitterExtractor::new(settings.extractor_config())
        .context("Invalid extractor settings")?;
    read_inputs(AnnotationReader::new(project, extractor), inputs)
}

fn load_models(paths: &[PathBuf]) -> Result<Model> {
    read_inputs(AnnotationReader::new(settings::DEFAULT_PROJECT, NoExtractor), paths)
}

fn read_inputs<E: SourceExtractor>(mut reader: AnnotationReader<E>, inputs: &[PathBuf]) -> Result<Model> {
    for path in inputs {
        reader
            .read_path(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }

    let model = reader.into_model();
    let records: usize = model.projects.values().map(|p| p.record_count()).sum();
    log::info!(
        "{} relations across {} projects ({} boundaries, {} components, {} threats)",
        records,
        model.projects.len(),
        model.boundaries.len(),
        model.components.len(),
        model.threats.len()
    );
    Ok(model)
}

fn run_parse(args: ParseArgs, settings: &Settings) -> Result<()> {
    let project = settings.project(args.project.as_deref());
    let mut model = build_model(&args.inputs, project, settings)?;
    model.touch();
    let json = model.to_json_pretty()?;

    match &args.out {
        Some(path) => {
            write_file(path, &json)?;
            log::info!("Wrote {}", path.display());
        }
        None => print_stdout(&json)?,
    }
    Ok(())
}

fn run_check(args: CheckArgs, settings: &Settings) -> Result<()> {
    let min_coverage = match args.mincov.as_deref() {
        Some(raw) => CheckConfig::parse_min_coverage(raw).unwrap_or_else(|msg| {
            eprintln!("{msg}");
            std::process::exit(EXIT_BAD_THRESHOLD);
        }),
        None => settings.min_coverage.unwrap_or(DEFAULT_MIN_COVERAGE),
    };
    let config = CheckConfig {
        min_coverage,
        warn_only: args.warn || settings.warn.unwrap_or(false),
    };
    if let Err(msg) = config.validate() {
        eprintln!("{msg}");
        std::process::exit(EXIT_BAD_THRESHOLD);
    }

    let project = settings.project(args.project.as_deref());
    let model = build_model(&args.inputs, project, settings)?;

    let open = unmitigated(model.exposures(), model.mitigations());
    for exposure in &open {
        print_stdout(&report::unmitigated_line(exposure))?;
    }

    if let Some(path) = &args.func {
        let profile = match read_profile(path) {
            Ok(profile) => profile,
            Err(err) => {
                eprintln!("err: {err:#}");
                std::process::exit(EXIT_BAD_PROFILE);
            }
        };
        let findings = check_coverage(model.mitigations(), &profile, config.min_coverage);
        for finding in &findings {
            print_stdout(&finding.to_string())?;
        }
        if !findings.is_empty() {
            log::warn!("{} mitigation functions lack coverage", findings.len());
        }
    }

    if !open.is_empty() {
        log::warn!("{} unmitigated exposures", open.len());
        if !config.warn_only {
            std::process::exit(EXIT_FINDINGS);
        }
    }
    Ok(())
}

fn read_profile(path: &Path) -> Result<CoverageProfile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read coverage profile {}", path.display()))?;
    Ok(CoverageProfile::parse(&text)?)
}

fn run_report(args: ReportArgs, settings: &Settings) -> Result<()> {
    let model = load_models(&args.models)?;
    let warn_only = args.warn || settings.warn.unwrap_or(false);

    let open = unmitigated(model.exposures(), model.mitigations());
    if open.is_empty() {
        print_stdout("OK")?;
        return Ok(());
    }

    for exposure in &open {
        print_stdout(&report::warning_line(&model, exposure))?;
    }
    if !warn_only {
        std::process::exit(EXIT_FINDINGS);
    }
    Ok(())
}

fn run_csv(args: CsvArgs) -> Result<()> {
    let model = load_models(&args.models)?;
    write_file(&args.out, &report::render_csv(&model))?;
    log::info!("Wrote {}", args.out.display());
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<()> {
    for path in &args.models {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let model = Model::from_json(&json)
            .with_context(|| format!("Invalid model {}", path.display()))?;
        log::info!(
            "{}: {} version {}, {} projects",
            path.display(),
            model.metadata.name,
            model.metadata.version,
            model.projects.len()
        );
    }
    print_stdout("OK")
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
