//! wordfreq CLI entry point

use anyhow::{Context, Result};
use std::io::{self, Write};
use wordfreq::config::cli::{Cli, ExecutionMode};
use wordfreq::config::{toml::load_config, validator, Config, ReportFormat};
use wordfreq::coordinator::{self, RunSummary};
use wordfreq::dispatch::{run_child_worker, WorkerCommand};
use wordfreq::distributed::WordCountService;
use wordfreq::output::write_text_report;
use wordfreq::rank::top_n;
use wordfreq::util::logging::init_logging;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.validate()?;
    init_logging(cli.debug);

    match cli.mode {
        Some(ExecutionMode::MapWorker) => run_map_worker(&cli),
        Some(ExecutionMode::Service) => run_service(&cli),
        _ => run_count(&cli),
    }
}

/// Child process of the local strategies: frames on stdin/stdout
fn run_map_worker(cli: &Cli) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_child_worker(stdin.lock(), stdout.lock(), cli.threads)
}

/// Run a remote word-count service until killed
fn run_service(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    validator::validate_service(&config.service).context("Configuration validation failed")?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let service = WordCountService::bind(&config.service.bind_addr())
            .await
            .context("Failed to start word-count service")?;

        service.run().await
    })
}

/// Count a directory with the configured strategy and print the report
fn run_count(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let strategy = config.strategy;
    validator::validate_run_config(&config, strategy).context("Configuration validation failed")?;

    tracing::debug!(%strategy, cpus = num_cpus::get(), "starting run");

    let command = WorkerCommand::current_exe()?;
    let dispatcher = coordinator::build_dispatcher(&config, strategy, command)?;
    let summary = coordinator::run(&config, dispatcher.as_ref())?;

    print_report(&config, &summary)
}

fn print_report(config: &Config, summary: &RunSummary) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match config.report.format {
        ReportFormat::Text => {
            write_text_report(&mut out, &top_n(&summary.counts, config.report.top))?;
        }
        ReportFormat::Json => {
            summary.json_report(config.report.top).write(&mut out)?;
        }
    }

    out.flush().context("Failed to write report")
}
