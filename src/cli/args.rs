//! Command line argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, long_about = None)]
#[command(name = "piobrew")]
#[command(about = "🍺 PlatformIO build and upload manager for sketches and native projects")]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease logging verbosity (only errors)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Report files that cannot be processed instead of ignoring them
    #[arg(long, global = true)]
    pub feedback: bool,

    /// Accept the default answer of every selection without prompting
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    /// PlatformIO executable (defaults to `pio` or `platformio` on PATH)
    #[arg(long, value_name = "PATH", global = true)]
    pub pio: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Source file an action works on
#[derive(Args, Debug, Clone, Default)]
pub struct FileArgs {
    /// Sketch or source file; the buffer is read from stdin when omitted
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create the PlatformIO project for the selected environment
    Init(FileArgs),
    /// Build the selected environment
    Build(FileArgs),
    /// Build and upload to the selected port
    Upload(FileArgs),
    /// Remove build artifacts of the selected environment
    Clean(FileArgs),
    /// Discover serial ports and network boards and pick one
    SelectPort,
    /// Show the cached board table
    ListBoards {
        /// Only boards whose id, name or MCU contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Fetch the board table from PlatformIO and cache it
    RefreshBoards,
    /// Show the programmers or pick one for uploads ("none" clears it)
    Programmer {
        /// Programmer id
        id: Option<String>,
        #[command(flatten)]
        target: FileArgs,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default configuration with the command line overrides applied
    pub fn app_config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        if let Some(pio) = &self.pio {
            config.pio_executable = pio.clone();
        }
        config.feedback = self.feedback;
        config
    }
}
