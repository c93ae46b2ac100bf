//! Config command - inspect and create the kmsshot config file

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use kmsshot_core::config::{sample_config, CaptureConfig, ConfigFile};
use std::path::PathBuf;

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Print the capture settings a run would use
    Show,

    /// Write the sample config to the config file location
    Init {
        /// Replace an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the sample config to stdout
    Sample,
}

/// Run config subcommand
pub fn config(args: ConfigArgs) -> Result<()> {
    let path = args.config.unwrap_or_else(ConfigFile::default_path);

    match args.command {
        ConfigCommand::Path => println!("{}", path.display()),
        ConfigCommand::Show => {
            let file = ConfigFile::load_from(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let source = if path.exists() { "file" } else { "default" };
            print!("{}", render_settings(&file.to_capture_config(), source));
            if let Err(e) = file.to_capture_config().validate() {
                eprintln!("\nThese settings will be rejected: {}", e);
            }
        }
        ConfigCommand::Init { force } => {
            if ConfigFile::write_sample(&path, force)? {
                println!("Wrote {}", path.display());
            } else {
                println!("{} already exists; pass --force to replace it", path.display());
            }
        }
        ConfigCommand::Sample => print!("{}", sample_config()),
    }

    Ok(())
}

/// One `key  value  (source)` line per capture setting
fn render_settings(config: &CaptureConfig, source: &str) -> String {
    let rows = [
        ("device", config.device_path.display().to_string()),
        ("output_dir", config.output_dir.display().to_string()),
        ("quality", config.quality.to_string()),
        ("strategy", config.strategy.to_string()),
    ];
    rows.iter()
        .map(|(key, value)| format!("{:<12} {:<24} ({})\n", key, value, source))
        .collect()
}
