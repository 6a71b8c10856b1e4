//! ECP CLI - Main entry point

use clap::Parser;
use ecp_cli::logging::{init_logging, LogConfig};
use ecp_cli::{commands, options, Cli, Commands};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging (ignore errors as the CLI should work without it)
    let log_config = LogConfig {
        verbose: cli.verbose,
    };
    let _ = init_logging(&log_config);

    // Execute command
    if let Err(e) = execute_command(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: Cli) -> ecp_cli::Result<()> {
    match cli.command {
        Commands::Bulk {
            source_dir,
            dest_dir,
            headers,
            settings,
            recursive,
            downloads,
            force,
            list,
        } => {
            let opts = options::BulkOptions {
                overwrite: force,
                recursive,
                list,
                headers: options::parse_headers(&headers)?,
                settings,
                downloads: options::parse_downloads(&downloads)?,
            };
            commands::bulk::run(&cli.host, source_dir, dest_dir, opts).await
        }

        Commands::Process {
            files,
            output,
            headers,
            settings,
            downloads,
        } => {
            let opts = options::ProcessOptions {
                headers: options::parse_headers(&headers)?,
                settings,
                downloads: options::parse_downloads(&downloads)?,
                output,
            };
            commands::process::run(&cli.host, files, opts).await
        }

        Commands::Download { id, files } => {
            commands::download::run(&cli.host, &id, options::parse_downloads(&files)?).await
        }
    }
}
