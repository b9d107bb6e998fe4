//! Dynamic Workers - CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dynamic_workers::util::{config, logger};
use dynamic_workers::{check_program, generate_manifest, run_manifest, WorkerState, NAME, VERSION};
use std::path::PathBuf;
use std::time::Duration;

/// Generate, inspect and run dynamic worker images
#[derive(Parser, Debug)]
#[command(name = "dynworker")]
#[command(author = "Dynamic Workers Team")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the program generated from an image manifest
    Generate {
        /// Image manifest (TOML)
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
    },

    /// Parse a generated program and list its methods and helpers
    Check {
        /// Generated program file
        #[arg(value_name = "PROGRAM")]
        program: PathBuf,
    },

    /// Start an image, run one method and print the replies
    Run {
        /// Image manifest (TOML)
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        /// Method to execute
        #[arg(value_name = "METHOD")]
        method: String,

        /// Arguments as a JSON array
        #[arg(short, long, value_name = "JSON")]
        args: Option<String>,

        /// How long to wait for the worker to finish
        #[arg(short, long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.verbose {
        logger::init_debug();
        eprintln!("{} version: {}", NAME, VERSION);
        eprintln!("Host: {}", std::env::consts::OS);
    } else {
        logger::init_with_level(config.log_level());
    }

    match args.command {
        Commands::Generate { manifest } => {
            let code = generate_manifest(&manifest)
                .with_context(|| format!("Failed to generate: {}", manifest.display()))?;
            print!("{}", code);
        }
        Commands::Check { program } => {
            let parsed = check_program(&program)?;
            if let Some(name) = parsed.name() {
                println!("name: {}", name);
            }
            for method in parsed.methods() {
                println!("method {}/{}", method.name, method.arity);
            }
            for helper in parsed.helper_names() {
                println!("helper {}", helper);
            }
        }
        Commands::Run {
            manifest,
            method,
            args: raw_args,
            timeout_ms,
        } => {
            let call_args = match raw_args {
                Some(raw) => Some(
                    serde_json::from_str::<Vec<serde_json::Value>>(&raw)
                        .context("--args must be a JSON array")?,
                ),
                None => None,
            };
            let timeout = Duration::from_millis(timeout_ms.unwrap_or(config.default_wait_ms));
            let outcome = run_manifest(&manifest, &method, call_args, config, timeout)
                .with_context(|| format!("Failed to run: {}", manifest.display()))?;

            for reply in &outcome.replies {
                println!("{}", reply);
            }
            for fault in &outcome.errors {
                eprintln!("worker error: {}", fault);
            }
            if !outcome.errors.is_empty() || outcome.state == WorkerState::Error {
                bail!("method \"{}\" failed", method);
            }
            if outcome.state == WorkerState::Busy {
                eprintln!("timed out after {} ms", timeout.as_millis());
            }
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}
