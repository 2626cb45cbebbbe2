//! # tracer - Main Entry Point
//!
//! Renders the instrumentation payload for a trigger port, for engines that
//! load scripts from a file or from stdin.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{self, BufWriter};

use tracer::cli::Args;
use tracer::domain::ConfigError;
use tracer::payload::{write_payload, PayloadConfig};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = PayloadConfig::new(args.trigger_port)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_payload(&config, BufWriter::new(file))
                .with_context(|| format!("Failed to write payload to {}", path.display()))?;
            if !args.quiet {
                eprintln!(
                    "Payload for trigger port {} written to {}",
                    config.trigger_port(),
                    path.display()
                );
            }
        }
        None => {
            write_payload(&config, io::stdout().lock()).context("Failed to write payload")?;
        }
    }

    info!("Rendered payload for trigger port {}", config.trigger_port());
    Ok(())
}
