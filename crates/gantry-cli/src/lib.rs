//! Gantry CLI library

pub mod commands;
pub mod error;
pub mod project;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// Gantry - package projects for batch compute clusters
#[derive(Parser, Debug)]
#[command(name = "gantry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize job and PVC manifests for a project
    Job(commands::job::JobArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Job(args) => commands::job::run(args).await,
        }
    }
}
