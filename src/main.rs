//! vibegrep CLI - grep, but the search engine is an LLM

use anyhow::Result;
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vibegrep::{
    discover_files, format_plan, format_results, format_results_json, format_results_plain,
    ChatClient, Config, SearchPlan, Searcher, ServiceConfig,
};

/// Exit code when nothing matched or there was nothing to search
const EXIT_NO_MATCH: i32 = 1;
/// Exit code for configuration, path and setup errors
const EXIT_USAGE: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "vibegrep")]
#[command(author, version, about = "grep, but the search engine is an LLM", long_about = None)]
struct Cli {
    /// What to look for, in plain language
    query: String,

    /// File or directory to search
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Directory depth: 1 = files in PATH, 2 = also its immediate subdirectories
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=2))]
    depth: u8,

    /// Maximum concurrent requests
    #[arg(short = 'j', long, default_value = "10")]
    threads: usize,

    /// Only search files whose name matches this glob
    #[arg(short = 'g', long)]
    glob: Option<String>,

    /// Character budget per request
    #[arg(long, default_value = "20000", env = "VIBEGREP_MAX_CHARS")]
    max_chars: usize,

    /// Model name
    #[arg(long, env = "VIBEGREP_MODEL")]
    model: Option<String>,

    /// Chat-completions base URL
    #[arg(long, env = "VIBEGREP_BASE_URL", hide = true)]
    base_url: Option<String>,

    /// API key
    #[arg(long, env = "VIBEGREP_API_KEY", hide = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Show what would be sent without calling the service
    #[arg(long)]
    dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            EXIT_USAGE
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let config = Config::new(cli.path.clone())
        .with_depth(cli.depth as usize)
        .with_workers(cli.threads)
        .with_max_chars(cli.max_chars)
        .with_glob(cli.glob.clone());
    config.validate()?;

    // Credentials are only needed when we actually call the service
    let service = if cli.dry_run {
        None
    } else {
        Some(ServiceConfig::from_parts(
            cli.base_url.clone(),
            cli.api_key.clone(),
            cli.model.clone(),
        )?)
    };

    let files = discover_files(&config)?;
    if files.is_empty() {
        eprintln!("No files to search");
        return Ok(EXIT_NO_MATCH);
    }

    let Some(service) = service else {
        print!("{}", format_plan(&SearchPlan::build(&files, &config)));
        return Ok(0);
    };

    let client = ChatClient::new(service, config.retry.clone())?;
    let searcher = Searcher::new(client, config)?;

    let progress = if std::io::stderr().is_terminal() {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} batches searched")?
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let outcome = searcher
        .search_with_progress(&cli.query, &files, progress)
        .await;

    for failure in &outcome.failures {
        eprintln!("{}", failure.to_string().red());
    }

    if cli.json {
        println!("{}", format_results_json(&outcome.result)?);
    } else if std::io::stdout().is_terminal() {
        print!("{}", format_results(&outcome.result));
    } else {
        print!("{}", format_results_plain(&outcome.result));
    }

    Ok(if outcome.is_success() { 0 } else { EXIT_NO_MATCH })
}
