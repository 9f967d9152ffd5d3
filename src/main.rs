//! `nixodml` command-line interface.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nixodml::config::Config;
use nixodml::convert::{Converter, WriteMode};
use nixodml::eegbase::Pipeline;
use nixodml::nix::TextEncoding;

/// Convert odML metadata documents into NIX data containers
#[derive(Parser, Debug)]
#[command(name = "nixodml")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./nixodml.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert odML files to NIX files of the same name
    ///
    /// Existing NIX files receive the document according to --mode.
    /// A NIX file argument is opened but cannot be exported yet.
    Convert {
        /// How existing NIX files are written
        #[arg(long, value_enum)]
        mode: Option<WriteMode>,

        /// Restrict stored text to ASCII
        #[arg(long)]
        ascii: bool,

        /// odML (.xml, .odml, .yaml, .yml, .json) or NIX files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Convert an EEG measurement folder or .zip archive
    Eegbase {
        /// Measurement folder containing metadata.xml and Data/
        path: PathBuf,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let config = Config::load(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Command::Convert { mode, ascii, files } => {
            let mut options = config.convert.options();
            if let Some(mode) = mode {
                options.mode = mode;
            }
            if ascii {
                options.encoding = TextEncoding::Ascii;
            }

            let mut converter = Converter::with_policy(options, config.convert.confirm.policy());
            let report = converter.run(&files);
            for file in &report.files {
                match &file.outcome {
                    Ok(output) => info!("Saved {}", output.display()),
                    Err(e) => error!("Skipped {}: {e}", file.source.display()),
                }
            }
            print!("\n{}", report.stats);
            if report.succeeded() == 0 {
                info!("nothing converted");
            }
        }
        Command::Eegbase { path } => {
            let mut pipeline = Pipeline::with_policy(
                Box::new(config.signal.converter()),
                config.convert.options(),
                config.convert.confirm.policy(),
            );
            let report = pipeline
                .run(&path)
                .with_context(|| format!("failed to convert measurement {}", path.display()))?;

            for recording in &report.recordings {
                match &recording.outcome {
                    Ok(output) => info!("Saved {}", output.container.display()),
                    Err(e) => error!("Skipped {}: {e}", recording.recording.header.display()),
                }
            }
            print!("\n{}", report.stats);
        }
    }
    Ok(())
}
