//! kmsshot CLI
//!
//! Screenshots of every active display, read straight from KMS.
//!
//! # Usage
//!
//! ```bash
//! # Capture every active CRTC into ./screenshot-<fb id>.jpg
//! sudo kmsshot
//!
//! # Capture from another card into a directory
//! sudo kmsshot capture --device /dev/dri/card1 --output-dir /tmp/shots
//!
//! # Show what would be captured
//! sudo kmsshot list
//! ```

mod commands;

use clap::{Parser, Subcommand};
use kmsshot_core::KmsshotError;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// kmsshot - screenshots from KMS scanout buffers
#[derive(Parser)]
#[command(name = "kmsshot")]
#[command(version)]
#[command(about = "Screenshots straight from the kernel's scanout buffers", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Subcommand to run (defaults to capture)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture every active CRTC to a JPEG file
    Capture(commands::CaptureArgs),

    /// List active CRTCs and their framebuffers
    #[command(alias = "ls")]
    List(commands::ListArgs),

    /// Manage configuration file
    Config(commands::ConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("kmsshot={},kmsshot_core={}", level, level))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        None => commands::capture(commands::CaptureArgs::default()),
        Some(Commands::Capture(args)) => commands::capture(args),
        Some(Commands::List(args)) => commands::list(args),
        Some(Commands::Config(args)) => commands::config(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let kms = e.chain().find_map(|cause| cause.downcast_ref::<KmsshotError>());
            if let Some(hint) = kms.and_then(KmsshotError::user_hint) {
                eprintln!("Hint: {}", hint);
            }
            // Fatal errors exit with the negated errno, truncated like a C `return`
            match kms {
                Some(err) => ExitCode::from(err.exit_code() as u8),
                None => ExitCode::FAILURE,
            }
        }
    }
}
