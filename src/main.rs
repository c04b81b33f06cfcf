use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use coverage_metrics::config::{Config, DEFAULT_GROUP};
use coverage_metrics::datadog::{DatadogClient, Gauge, MISSING_API_KEY_MESSAGE};
use coverage_metrics::CoverageData;

const CONFIG_FILE: &str = "coverage-metrics.toml";

#[derive(Parser)]
#[command(name = "coverage-metrics")]
#[command(about = "Aggregate Cobertura coverage reports and send the results to DataDog")]
#[command(version)]
struct Cli {
    /// Cobertura XML reports to aggregate
    reports: Vec<PathBuf>,

    /// Path to config file (default: coverage-metrics.toml, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report a single group matching this pattern instead of the configured groups
    #[arg(short, long)]
    pattern: Option<String>,

    /// Print coverage without sending anything (no API key needed)
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let cli = Cli::parse();

    let datadog = if cli.dry_run {
        None
    } else {
        Some(configure_datadog())
    };

    if let Err(e) = run(cli, datadog) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Build the DataDog client, exiting with a fixed message if no key is set.
fn configure_datadog() -> DatadogClient {
    match DatadogClient::from_env() {
        Some(client) => client,
        None => {
            println!("{}", MISSING_API_KEY_MESSAGE);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli, datadog: Option<DatadogClient>) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    if let Some(pattern) = cli.pattern {
        config.groups = BTreeMap::from([(DEFAULT_GROUP.to_string(), pattern)]);
    }

    let data = load_reports(&cli.reports)?;

    println!(
        "\n{} {} report(s), {} file(s)\n",
        "📊".cyan(),
        cli.reports.len(),
        data.files().count()
    );

    let gauges = collect_gauges(&config, &data);

    match datadog {
        Some(client) => {
            let client = client.with_api_host(config.metrics.api_host.as_str());
            send_gauges(&client, &gauges)?;
            println!(
                "\n{} Sent {} gauge(s) to {}",
                "✓".green(),
                gauges.len(),
                config.metrics.api_host.dimmed()
            );
        }
        None => {
            println!("\n{} Dry run, nothing sent", "•".yellow());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None if Path::new(CONFIG_FILE).exists() => Config::load(Path::new(CONFIG_FILE)),
        None => Ok(Config::default()),
    }
}

fn load_reports(paths: &[PathBuf]) -> Result<CoverageData> {
    let mut data = CoverageData::new();

    for path in paths {
        let xml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read report: {}", path.display()))?;

        data.add_report(&xml)
            .with_context(|| format!("Could not parse {}", path.display()))?;
    }

    Ok(data)
}

/// One gauge per group with a computable percentage; the rest are skipped.
fn collect_gauges(config: &Config, data: &CoverageData) -> Vec<Gauge> {
    let mut gauges = Vec::new();

    for (group, pattern) in &config.groups {
        match data.summary(pattern) {
            Some(summary) => {
                println!(
                    "  {} {} {} ({}/{} lines in {} file(s))",
                    "✓".green(),
                    group.cyan(),
                    format!("{:.2}%", summary.percentage()).bold(),
                    summary.lines_covered,
                    summary.lines_total,
                    summary.files
                );

                gauges.push(Gauge {
                    metric: config.metric_name(group),
                    value: summary.percentage(),
                    tags: config.metrics.tags.clone(),
                });
            }
            None => {
                println!(
                    "  {} {} {}",
                    "-".dimmed(),
                    group.cyan(),
                    format!("no lines match '{}', skipped", pattern).dimmed()
                );
            }
        }
    }

    gauges
}

#[tokio::main]
async fn send_gauges(client: &DatadogClient, gauges: &[Gauge]) -> Result<()> {
    client.send(gauges).await
}
