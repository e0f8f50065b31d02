//! Command-line runner for the joint-damping co-simulation.

use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

mod commands;

#[derive(Parser)]
#[command(name = "cosim")]
#[command(version, about = "External joint damping co-simulation")]
struct Cli {
    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the damping scenario against the in-process piston engine.
    Run {
        /// Scenario file (JSON). Built-in defaults are used when omitted.
        #[arg(short, long)]
        config: Option<String>,

        /// Override the scenario end time (s).
        #[arg(long)]
        end_time: Option<f64>,

        /// Override the damping coefficient (N·s/m).
        #[arg(long)]
        damping: Option<f64>,

        /// Write the run summary as JSON to this path.
        #[arg(long)]
        summary: Option<String>,

        /// Do not print per-iteration lines.
        #[arg(short, long)]
        quiet: bool,
    },

    /// Write a default scenario file and input directory with a scene file.
    Init {
        /// Directory to initialize.
        #[arg(default_value = ".")]
        dir: String,
    },

    /// Validate a scenario file.
    Validate {
        /// Path to scenario file.
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    if TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto).is_err() {
        eprintln!("Warning: logger already initialized");
    }

    let result = match cli.command {
        Commands::Run {
            config,
            end_time,
            damping,
            summary,
            quiet,
        } => commands::run(commands::RunOptions {
            config: config.as_deref(),
            end_time,
            damping,
            summary: summary.as_deref(),
            quiet,
        }),
        Commands::Init { dir } => commands::init(&dir),
        Commands::Validate { path } => commands::validate(&path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
