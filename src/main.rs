//! `circuit-breaker` command line tool.
//!
//! Runs an external program repeatedly through a named breaker, so a flaky
//! dependency check or job stops being hammered while it is down.
//!
//! ```text
//! circuit-breaker validate --config breaker.toml
//! circuit-breaker run --config breaker.toml --command db --watch -- pg_isready -h db
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{self, MissedTickBehavior};

use circuit_breaker::config::watcher::ConfigWatcher;
use circuit_breaker::config::load_config;
use circuit_breaker::lifecycle::signals::wait_for_ctrl_c;
use circuit_breaker::observability::logging::init_logging;
use circuit_breaker::{Admission, Registry};

#[derive(Parser)]
#[command(name = "circuit-breaker")]
#[command(about = "Guard an external command with a circuit breaker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a config file, then print its commands
    Validate {
        #[arg(short, long, default_value = "breaker.toml")]
        config: PathBuf,
    },
    /// Run a program through a configured command on a fixed interval
    Run {
        #[arg(short, long, default_value = "breaker.toml")]
        config: PathBuf,

        /// Name of the configured command to guard the program with
        #[arg(long = "command")]
        name: String,

        /// Delay between invocations in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Reload the config file when it changes
        #[arg(long)]
        watch: bool,

        /// Program and arguments to run
        #[arg(last = true, required = true)]
        program: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config)?,
        Commands::Run {
            config,
            name,
            interval_ms,
            watch,
            program,
        } => run(&config, &name, Duration::from_millis(interval_ms.max(1)), watch, program).await?,
    }

    Ok(())
}

fn validate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    println!("{}", serde_json::to_string_pretty(&config.commands)?);
    Ok(())
}

async fn run(
    path: &Path,
    name: &str,
    interval: Duration,
    watch: bool,
    program: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    init_logging(&config.observability);

    if config.command(name).is_none() {
        return Err(format!("command '{}' is not defined in {}", name, path.display()).into());
    }

    let registry = Registry::new();
    registry.reconcile(&config);

    // Keep the watcher alive for the lifetime of the loop.
    let (_watcher, mut updates) = if watch {
        let (watcher, updates) = ConfigWatcher::new(path, config.clone());
        (Some(watcher.run()?), Some(updates))
    } else {
        (None, None)
    };

    tracing::info!(
        command = %name,
        program = %program.join(" "),
        interval_ms = interval.as_millis() as u64,
        "Guarded runner starting"
    );

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = wait_for_ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match registry.call(name, || run_program(&program)).await {
                    Ok(Admission::Admitted) => tracing::debug!(command = %name, "Run admitted"),
                    Ok(Admission::Probe) => {
                        tracing::info!(command = %name, "Run used as recovery probe")
                    }
                    Ok(Admission::Rejected) => {
                        tracing::warn!(command = %name, "Run rejected, circuit open")
                    }
                    Err(e) => tracing::error!(error = %e, "Run skipped"),
                }
            }
            Some(new_config) = recv_update(&mut updates) => {
                let changed = registry.reconcile(&new_config);
                tracing::info!(changed, "Config reloaded");
            }
            _ = &mut shutdown => break,
        }
    }

    registry.shutdown();
    println!("{}", serde_json::to_string_pretty(&registry.snapshots())?);
    Ok(())
}

async fn recv_update<T>(updates: &mut Option<UnboundedReceiver<T>>) -> Option<T> {
    match updates {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Spawn the program and wait for it. A spawn error or non-zero exit is a
/// failure.
async fn run_program(program: &[String]) -> Result<(), String> {
    let (cmd, args) = program.split_first().ok_or("empty program")?;
    let status = tokio::process::Command::new(cmd)
        .args(args)
        .status()
        .await
        .map_err(|e| format!("failed to spawn {}: {}", cmd, e))?;

    if status.success() {
        Ok(())
    } else {
        tracing::debug!(program = %cmd, status = %status, "Program exited with failure");
        Err(format!("{} exited with {}", cmd, status))
    }
}
