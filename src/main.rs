//! Scopechain CLI - replay scope scripts and the built-in demonstrations

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use scopechain::config::{self, ScopechainConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "scopechain")]
#[command(version)]
#[command(about = "Hierarchical variable scopes with a thread-local active scope")]
#[command(long_about = r#"
Scopechain replays sequences of scope operations (enter, exit, create,
lookup, remove, fail) and reports what each step resolved to.

Example usage:
  scopechain demo
  scopechain demo isolation
  scopechain run --script steps.toml --format json
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./scopechain.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (overrides the config file)
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the built-in demonstration scripts
    Demo {
        /// Only run the named demonstration
        name: Option<String>,
    },

    /// Replay a script file
    Run {
        /// Path to the TOML script
        #[arg(short, long)]
        script: PathBuf,
    },

    /// Write a starter config file
    Init {
        /// Where to write the config
        #[arg(short, long, default_value = "scopechain.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the version
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Text)
    }

    fn from_config(config: &ScopechainConfig) -> Self {
        match config.format() {
            "json" => OutputMode::Json,
            _ => OutputMode::Text,
        }
    }
}

/// Print a JSON envelope for machine-readable output
pub fn emit_success(
    output_mode: OutputMode,
    command: &str,
    data: serde_json::Value,
) -> anyhow::Result<()> {
    if output_mode.is_human() {
        return Ok(());
    }
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(config.log_level())
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = cli.format.unwrap_or_else(|| OutputMode::from_config(&config));

    match cli.command {
        Commands::Demo { name } => commands::run_demo(output_mode, &config, name.as_deref()),
        Commands::Run { script } => commands::run_script(output_mode, &config, &script),
        Commands::Init { path, force } => commands::run_init(output_mode, &path, force),
        Commands::Version => commands::run_version(output_mode),
    }
}
