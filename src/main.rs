use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use distrofleet::config::{self, Config, Overrides, RunPolicy};
use distrofleet::engine::{CancelToken, CliEngine, EngineSettings};
use distrofleet::fleet::{Action, BatchReport, FleetEntry, FleetRunner, StepRecord, Tally};
use distrofleet::signal;

#[derive(Parser)]
#[command(name = "distrofleet", version)]
#[command(about = "Build, run, stop and clean up the per-distro container fleet", long_about = None)]
struct Cli {
    /// Build context root containing the Dockerfile.<distro> files (default: working directory)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,
    /// Config file (default: .distrofleet.yaml in the context root, if present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Container engine CLI, e.g. docker or podman
    #[arg(long, global = true, value_name = "BIN")]
    engine: Option<String>,
    /// Per-command timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,
    /// Print the batch report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,
    /// Only log warnings and do not echo engine output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Log fallback decisions and skipped steps
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every image, then list images
    Build,
    /// Start existing containers or create missing ones, then list running containers
    Run {
        /// Always create new containers instead of resuming existing ones
        #[arg(long)]
        fresh: bool,
    },
    /// Stop every container
    Stop,
    /// Stop and remove every container, then remove every image
    Cleanup,
    /// Print the fleet registry
    Ls,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();
}

/// Returns whether the batch finished without entry failures.
fn run(cli: Cli) -> Result<bool> {
    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let (cfg, root) = resolve_config(&cli, &cwd)?;

    let action = match cli.command {
        Commands::Build => Action::Build,
        Commands::Run { .. } => Action::Run,
        Commands::Stop => Action::Stop,
        Commands::Cleanup => Action::Cleanup,
        Commands::Ls => {
            print_fleet(&cfg.fleet, &root);
            return Ok(true);
        }
    };

    let cancel = CancelToken::new();
    if !signal::cancel_on_interrupt(&cancel) {
        tracing::debug!("Ctrl-C will terminate without a report on this platform");
    }

    let settings = EngineSettings {
        program: cfg.engine.clone(),
        timeout: Duration::from_secs(cfg.timeout),
        workdir: Some(root.clone()),
    };
    let engine = CliEngine::new(settings, cancel.clone()).with_echo(!cli.quiet && !cli.json);
    if let Err(e) = engine.ensure_available() {
        // Keep going: every step will record the failure.
        tracing::warn!("{e:#}");
    }

    let mut runner = FleetRunner::new(engine, cfg.fleet, root)
        .with_container_port(cfg.container_port)
        .with_run_policy(cfg.run_policy)
        .with_cancel(cancel);

    let report = match action {
        Action::Build => runner.build_all(),
        Action::Run => runner.run_or_start_all(),
        Action::Stop => runner.stop_all(),
        Action::Cleanup => runner.cleanup_all(),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        println!("{json}");
    } else {
        print_report(&report);
    }

    Ok(report.is_success())
}

/// Merge defaults, the config file and command-line flags, and resolve the
/// absolute build context root.
fn resolve_config(cli: &Cli, cwd: &Path) -> Result<(Config, PathBuf)> {
    let lookup_dir = cli.root.as_deref().unwrap_or(cwd);
    let mut cfg = match &cli.config {
        Some(path) => config::load_file(path)?,
        None => config::load(lookup_dir)?,
    };

    let fresh = matches!(cli.command, Commands::Run { fresh: true });
    cfg.apply(Overrides {
        engine: cli.engine.clone(),
        timeout: cli.timeout,
        context_root: cli.root.clone(),
        run_policy: fresh.then_some(RunPolicy::AlwaysCreate),
    });
    cfg.validate()?;

    let root = cfg.context_root.clone().unwrap_or_else(|| cwd.to_path_buf());
    let root = std::path::absolute(&root)
        .with_context(|| format!("failed to resolve context root {}", root.display()))?;
    Ok((cfg, root))
}

fn print_fleet(fleet: &[FleetEntry], root: &Path) {
    println!("{} {}", "context root:".dimmed(), root.display());
    println!(
        "{:<20} {:<22} {:>5}  {}",
        "CONTAINER".bold(),
        "IMAGE".bold(),
        "PORT".bold(),
        "DOCKERFILE".bold()
    );
    for entry in fleet {
        println!(
            "{:<20} {:<22} {:>5}  {}",
            entry.name, entry.image, entry.host_port, entry.dockerfile
        );
    }
}

fn print_report(report: &BatchReport) {
    println!();
    for step in &report.steps {
        println!("{}", step_line(step));
    }

    let s = &report.summary;
    let mut line = format!(
        "{} finished: {} ok, {} failed, {} ignored, {} skipped",
        report.action.as_str(),
        s.succeeded,
        s.failed,
        s.tolerated,
        s.skipped
    );
    if s.fallbacks > 0 {
        line.push_str(&format!(", {} created after failed start", s.fallbacks));
    }
    println!();
    if report.is_success() {
        println!("{}", line.green().bold());
    } else {
        println!("{}", line.red().bold());
    }
}

fn step_line(step: &StepRecord) -> String {
    let what = format!(
        "{} {} ({})",
        step.operation.as_str(),
        step.container,
        step.image
    );
    match step.tally() {
        Tally::Succeeded => format!("{} {what}", "✓".green()),
        Tally::Failed => format!("{} {what}: {}", "✗".red(), step.outcome.label()),
        Tally::Tolerated => format!("{} {what}: {}, ignored", "ℹ".yellow(), step.outcome.label())
            .dimmed()
            .to_string(),
        Tally::Fallback => format!("{} {what}: {}, creating", "↪".yellow(), step.outcome.label())
            .dimmed()
            .to_string(),
        Tally::Skipped => format!("- {what}: {}", step.outcome.label())
            .dimmed()
            .to_string(),
    }
}
