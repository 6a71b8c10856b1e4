//! ECP CLI Library
//!
//! Command-line batch client for the log enrichment service.
//!
//! # Overview
//!
//! - **Bulk processing**: submit every log file under a directory and
//!   store results, reports and failure markers (`ecp bulk`)
//! - **Single jobs**: process a file set or standard input (`ecp process`)
//! - **Artifact retrieval**: fetch files from an existing job directory
//!   (`ecp download`)

pub mod commands;
pub mod discover;
pub mod error;
pub mod logging;
pub mod options;
pub mod report;

// Re-export commonly used types
pub use error::{CliError, Result};
pub use options::{ArtifactRequest, BulkOptions, ProcessOptions};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ECP - batch client for the log enrichment service
#[derive(Parser, Debug)]
#[command(name = "ecp")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Shows detailed operations
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Address of the enrichment service ("host:port")
    #[arg(
        long,
        env = "ECP_HOST",
        default_value = ecp_client::DEFAULT_HOST,
        global = true
    )]
    pub host: String,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process log files from a directory and store the results
    #[command(visible_alias = "b")]
    Bulk {
        /// Directory holding the log files to process
        source_dir: PathBuf,

        /// Where to store results (defaults to the source directory)
        dest_dir: Option<PathBuf>,

        /// Add a header to the request ("Name: value")
        #[arg(short = 'H', long = "header", value_name = "HEADER")]
        headers: Vec<String>,

        /// Apply a predefined settings profile
        #[arg(short, long)]
        settings: Option<String>,

        /// Look for log files in subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Download an extra artifact for each job ("name[:dest]")
        #[arg(short, long = "download", value_name = "ARTIFACT")]
        downloads: Vec<String>,

        /// Overwrite existing result files
        #[arg(short, long, visible_alias = "overwrite")]
        force: bool,

        /// Only list the log files that would be processed
        #[arg(short, long)]
        list: bool,
    },

    /// Process a set of files (or standard input) as a single job
    #[command(visible_alias = "p")]
    Process {
        /// Log files to process; standard input when omitted
        files: Vec<PathBuf>,

        /// Output file (standard output when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Add a header to the request ("Name: value")
        #[arg(short = 'H', long = "header", value_name = "HEADER")]
        headers: Vec<String>,

        /// Apply a predefined settings profile
        #[arg(short, long)]
        settings: Option<String>,

        /// Download an artifact after the job ("name[:dest]")
        #[arg(short, long = "download", value_name = "ARTIFACT")]
        downloads: Vec<String>,
    },

    /// Download artifacts from an existing job directory
    #[command(visible_alias = "d")]
    Download {
        /// Job identifier
        id: String,

        /// Artifacts to download ("name[:dest]")
        #[arg(required = true)]
        files: Vec<String>,
    },
}
