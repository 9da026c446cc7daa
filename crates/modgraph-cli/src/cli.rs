//! CLI argument definitions for Modgraph.
//!
//! Each command corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "modgraph",
    version,
    about = "Variant-aware dependency resolution and module metadata",
    long_about = "Modgraph resolves dependency graphs by matching consumer attributes \
                  against published variants, and writes the module metadata documents \
                  other builds resolve against."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to Modgraph.toml (defaults to the nearest one above the current directory)
    #[arg(long, global = true, env = "MODGRAPH_MANIFEST")]
    pub manifest_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the dependency graph and print it as a tree
    Resolve {
        /// Maximum depth to display
        #[arg(long)]
        depth: Option<u32>,
        /// Show why a module is in the graph and why its version was selected
        #[arg(long)]
        why: Option<String>,
        /// Show requests that did not get the version they asked for
        #[arg(long)]
        conflicts: bool,
    },

    /// Write the project's module metadata document into a repository
    Publish {
        /// Repository directory to publish into (defaults to the manifest's)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Publish the versions the resolved graph selected
        #[arg(long)]
        resolved_versions: bool,
    },
}

/// Parse command-line arguments.
pub fn parse() -> Cli {
    Cli::parse()
}
