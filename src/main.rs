//! roomtrack - where is the agent on the map?
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use roomtrack::cli::config_cmd::{ConfigCommand, ConfigOptions};
use roomtrack::cli::replay::{ReplayCommand, ReplayOptions};
use roomtrack::config::{roomtrack_home, Config};
use roomtrack::error::exit_codes;
use roomtrack::map::{load_map, load_observations};

// =============================================================================
// CLI Definition
// =============================================================================

/// roomtrack - track an agent's position on a partially known room graph
#[derive(Parser)]
#[command(name = "roomtrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an observation stream against a map fixture
    Replay {
        /// Map fixture (JSON)
        #[arg(long, short)]
        map: PathBuf,
        /// Observation stream (JSON Lines)
        #[arg(long, short)]
        observations: PathBuf,
        /// Write the updated map here
        #[arg(long)]
        save: Option<PathBuf>,
        /// Include the transition trace
        #[arg(long)]
        trace: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show the effective configuration
    Config {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    setup_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("roomtrack error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Log to stderr so stdout stays clean for command output.
fn setup_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("roomtrack panic: {}", info);

        if let Some(home) = roomtrack_home() {
            let crash_log = home.join("crash.log");
            let _ = std::fs::create_dir_all(&home);
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Commands::Replay {
            map,
            observations,
            save,
            trace,
            json,
            quiet,
        } => {
            let options = ReplayOptions {
                json,
                quiet,
                trace,
                save,
            };
            run_replay(&map, &observations, config, &options)
        }
        Commands::Config { json } => run_config(config, json),
    }
}

fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn run_replay(
    map_path: &std::path::Path,
    observations_path: &std::path::Path,
    config: Config,
    options: &ReplayOptions,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let map = load_map(map_path)?;
    let observations = load_observations(observations_path)?;
    tracing::info!(
        rooms = map.len(),
        observations = observations.len(),
        "starting replay"
    );

    let cmd = ReplayCommand::new(map, config);
    let output = cmd.run(&observations, options);
    let formatted = cmd.format_output(&output, options);

    if !formatted.is_empty() {
        print!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}

fn run_config(config: Config, json: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = ConfigCommand::new(config);
    let options = ConfigOptions { json, quiet: false };
    let output = cmd.run();
    let formatted = cmd.format_output(&output, &options);

    if !formatted.is_empty() {
        println!("{}", formatted);
    }

    Ok(success_to_exit_code(output.success))
}
