mod config;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::{ArgGroup, Parser, ValueEnum};

use config::ProjectConfig;
use logtally_core::{analyze_dir, AnalysisRequest, LogDirectory, LogType};
use logtally_logging::{init_tracing, LogFormat};
use render::Detail;

/// Accepted `--start`/`--end` layouts, tried in order.
const WINDOW_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

#[derive(Parser, Debug)]
#[command(
    name = "logtally",
    about = "Per-service, per-hour success and error counts from application logs",
    version,
    author
)]
#[command(group(ArgGroup::new("window").required(true).args(["last_hours", "start"])))]
struct Cli {
    /// Directory holding one log file per service (default: ./logs)
    #[arg(short = 'd', long)]
    log_dir: Option<PathBuf>,

    /// Log file extension (default: log)
    #[arg(long)]
    extension: Option<String>,

    /// Analyze the last N hours up to now
    #[arg(long, value_name = "N")]
    last_hours: Option<u32>,

    /// Window start, "YYYY-MM-DD HH:MM"
    #[arg(long, requires = "end")]
    start: Option<String>,

    /// Window end, "YYYY-MM-DD HH:MM"
    #[arg(long, requires = "start")]
    end: Option<String>,

    /// Which verdicts to count
    #[arg(short = 't', long = "type", value_enum, default_value = "both")]
    log_type: LogTypeChoice,

    /// Only count errors whose reason contains this text
    #[arg(long)]
    error_filter: Option<String>,

    /// Only count successes whose reason contains this text
    #[arg(long)]
    success_filter: Option<String>,

    /// Show per-reason success breakdowns
    #[arg(long)]
    success_details: bool,

    /// Show per-reason error breakdowns
    #[arg(long)]
    error_details: bool,

    /// Output the report as JSON
    #[arg(long)]
    json: bool,

    /// Diagnostic log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormatChoice>,

    /// Diagnostic log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Config file (default: ./logtally.toml, then the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogTypeChoice {
    Success,
    Error,
    Both,
}

impl From<LogTypeChoice> for LogType {
    fn from(choice: LogTypeChoice) -> Self {
        match choice {
            LogTypeChoice::Success => LogType::Success,
            LogTypeChoice::Error => LogType::Error,
            LogTypeChoice::Both => LogType::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ProjectConfig::load(path)?,
        None => {
            let working_dir =
                std::env::current_dir().context("Failed to get current directory")?;
            ProjectConfig::discover(&working_dir)?.unwrap_or_default()
        }
    };

    let log_format = resolve_log_format(cli.log_format, config.log_format.as_deref())?;
    init_tracing(&cli.log_level, log_format);

    let request = build_request(&cli, &config, Local::now().naive_local())?;
    let dir = LogDirectory::new(
        config.log_dir(cli.log_dir.as_deref()),
        config.extension(cli.extension.as_deref()),
    );

    let (start, end) = (request.start(), request.end());
    let analysis = analyze_dir(request, &dir).await?;

    if cli.json {
        let json = serde_json::to_string_pretty(&analysis)?;
        println!("{}", json);
    } else {
        if !std::io::stdout().is_terminal() {
            colored::control::set_override(false);
        }
        let detail = Detail {
            success: cli.success_details || config.report.success_details,
            error: cli.error_details || config.report.error_details,
        };
        print!("{}", render::render_text(&analysis, &start, &end, detail));
    }

    // Partial results were printed; still signal that some services were skipped.
    if !analysis.failures.is_empty() {
        std::process::exit(2);
    }
    Ok(())
}

fn resolve_log_format(flag: Option<LogFormatChoice>, config: Option<&str>) -> Result<LogFormat> {
    match (flag, config) {
        (Some(choice), _) => Ok(choice.into()),
        (None, Some(name)) => name.parse().map_err(anyhow::Error::msg),
        (None, None) => Ok(LogFormat::default()),
    }
}

fn build_request(cli: &Cli, config: &ProjectConfig, now: NaiveDateTime) -> Result<AnalysisRequest> {
    let request = match (cli.last_hours, &cli.start, &cli.end) {
        (Some(hours), _, _) => AnalysisRequest::last_hours(now, hours)?,
        (None, Some(start), Some(end)) => {
            AnalysisRequest::new(parse_window_time(start)?, parse_window_time(end)?)?
        }
        _ => anyhow::bail!("Specify either --last-hours or both --start and --end"),
    };

    let mut request = request.with_log_type(cli.log_type.into());
    if let Some(filter) = config.success_filter(cli.success_filter.as_deref()) {
        request = request.with_success_filter(filter);
    }
    if let Some(filter) = config.error_filter(cli.error_filter.as_deref()) {
        request = request.with_error_filter(filter);
    }
    Ok(request)
}

fn parse_window_time(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    WINDOW_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .with_context(|| format!("Invalid time '{}'. Use YYYY-MM-DD HH:MM", value))
}
