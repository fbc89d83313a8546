mod logging;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use perf_log_analysis::output::{OutputFormat, format_document};
use perf_log_analysis::report::{APP_NAME, AnalysisDocument, RunInfo};
use perf_log_analysis::parser::LineParser;
use perf_log_analysis::runner::{byte_lines, run_reader, run_sharded};
use perf_log_config::{
    AnalyzerConfig, PreflightIssue, Session, check_input, check_results_dir, preflight,
};
use perf_log_core::{AnalysisReport, GrammarSpec};

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "perf-log-analyzer")]
#[command(about = "Grammar-driven performance log analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze the configured performance log and write a report.
    Analyze(AnalyzeArgs),
    /// Validate a configuration file and check its paths.
    CheckConfig(CheckConfigArgs),
    /// Analyze log lines from stdin and print the report.
    ParseStdin(ParseStdinArgs),
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Analyzer configuration file (YAML).
    #[arg(long)]
    config: PathBuf,
    /// Performance log to analyze instead of the configured one.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Report format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
    /// Report path (default: stamped file in the results directory).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Number of parallel shards (default: sequential).
    #[arg(long)]
    jobs: Option<usize>,
    /// Print the report to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,
    /// Do not write the application log file.
    #[arg(long)]
    no_app_log: bool,
}

#[derive(Debug, Args)]
struct CheckConfigArgs {
    /// Analyzer configuration file (YAML).
    #[arg(long)]
    config: PathBuf,
}

#[derive(Debug, Args)]
struct ParseStdinArgs {
    /// Analyzer configuration file (YAML).
    #[arg(long)]
    config: PathBuf,
    /// Report format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::CheckConfig(args) => run_check_config(args),
        Command::ParseStdin(args) => run_parse_stdin(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), String> {
    let started_at = Local::now();
    let config = load_config(&args.config)?;
    let grammar = config.grammar().map_err(|e| e.to_string())?;
    let input = args.input.clone().unwrap_or_else(|| config.perf_log.path());

    let writes_results = !args.no_app_log || (args.output.is_none() && !args.stdout);
    let mut issues: Vec<PreflightIssue> = check_input(&input).into_iter().collect();
    if writes_results {
        issues.extend(check_results_dir(&config.results.directory));
    }
    if !issues.is_empty() {
        let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
        return Err(messages.join("; "));
    }

    let session = Session::new(&config, started_at);
    let app_log = (!args.no_app_log).then_some(session.app_log_path.as_path());
    let _guard = logging::init_logging(app_log)?;

    info!("Starting {APP_NAME} v{PACKAGE_VERSION}");
    info!(config = %args.config.display(), input = %input.display(), "Loaded configuration");

    let report = analyze_file(&input, &grammar, args.jobs)?;
    for line in report.summary_lines() {
        info!("{line}");
    }

    let fingerprint = config.grammar_fingerprint().map_err(|e| e.to_string())?;
    let document = AnalysisDocument {
        run_info: RunInfo::new(PACKAGE_VERSION, &started_at.to_rfc3339())
            .with_input(&input.display().to_string())
            .with_grammar_fingerprint(&fingerprint),
        report,
    };
    let rendered = format_document(&document, &grammar, args.format)?;

    if args.stdout {
        print!("{rendered}");
        return Ok(());
    }

    let path = args
        .output
        .unwrap_or_else(|| session.report_path_with_extension(args.format.extension()));
    write_report(&path, &rendered)?;
    info!(path = %path.display(), "Wrote analysis report");
    println!(
        "Analyzed {} log line(s); report written to '{}'.",
        document.report.total_count(),
        path.display()
    );

    Ok(())
}

fn run_check_config(args: CheckConfigArgs) -> Result<(), String> {
    let config = load_config(&args.config)?;
    let grammar = config.grammar().map_err(|e| e.to_string())?;
    LineParser::new(&grammar).map_err(|e| e.to_string())?;

    let issues = preflight(&config);
    for issue in &issues {
        eprintln!("{issue}");
    }
    if !issues.is_empty() {
        return Err(format!("{} configuration issue(s) found", issues.len()));
    }

    let fingerprint = config.grammar_fingerprint().map_err(|e| e.to_string())?;
    println!(
        "Configuration '{}' is valid: {} field(s), {} timing pair(s), {} timing group(s).",
        args.config.display(),
        grammar.fields.len(),
        grammar.timing_pairs.len(),
        grammar.timing_groups.len()
    );
    println!("Grammar fingerprint: {fingerprint}");
    Ok(())
}

fn run_parse_stdin(args: ParseStdinArgs) -> Result<(), String> {
    let started_at = Local::now();
    let config = load_config(&args.config)?;
    let grammar = config.grammar().map_err(|e| e.to_string())?;
    let _guard = logging::init_logging(None)?;

    let report = run_reader(std::io::stdin().lock(), &grammar).map_err(|e| e.to_string())?;
    for line in report.summary_lines() {
        info!("{line}");
    }

    let fingerprint = config.grammar_fingerprint().map_err(|e| e.to_string())?;
    let document = AnalysisDocument {
        run_info: RunInfo::new(PACKAGE_VERSION, &started_at.to_rfc3339())
            .with_grammar_fingerprint(&fingerprint),
        report,
    };
    print!("{}", format_document(&document, &grammar, args.format)?);
    Ok(())
}

fn load_config(path: &Path) -> Result<AnalyzerConfig, String> {
    AnalyzerConfig::load(path)
        .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))
}

fn analyze_file(
    input: &Path,
    grammar: &GrammarSpec,
    jobs: Option<usize>,
) -> Result<AnalysisReport, String> {
    match jobs {
        Some(shards) if shards > 1 => {
            let bytes = fs::read(input)
                .map_err(|err| format!("Failed to read '{}': {err}", input.display()))?;
            let lines = byte_lines(&bytes);
            info!(lines = lines.len(), shards, "Loaded performance log");
            run_sharded(&lines, grammar, shards).map_err(|e| e.to_string())
        }
        _ => {
            let file = File::open(input)
                .map_err(|err| format!("Failed to open '{}': {err}", input.display()))?;
            run_reader(BufReader::new(file), grammar).map_err(|e| e.to_string())
        }
    }
}

fn write_report(path: &Path, rendered: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }
    fs::write(path, rendered).map_err(|err| format!("Failed to write '{}': {err}", path.display()))
}
