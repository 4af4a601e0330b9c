mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, segment, serve, CheckArgs, SegmentArgs, ServeArgs};
use tracing_subscriber::EnvFilter;

/// CodeWeave CLI - keep source files and their rendered documentation in sync
#[derive(Parser, Debug)]
#[command(name = "codeweave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a source file into code and doc segments
    Segment(SegmentArgs),

    /// Verify a file survives segmentation byte-for-byte
    Check(CheckArgs),

    /// Open a file in a sync session speaking JSON lines on stdin/stdout
    Serve(ServeArgs),
}

fn init_logging() {
    // stdout carries protocol output; logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| match cli.command {
            Command::Segment(args) => segment(args, &cwd),
            Command::Check(args) => check(args, &cwd),
            Command::Serve(args) => serve(args, &cwd),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
