//! Main entry point for the swcrypt CLI

use clap::Parser;
use std::process::ExitCode;

use swcrypt::cli::Cli;
use swcrypt::commands::{self, EXIT_ERROR};

fn main() -> ExitCode {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Set verbosity
    if cli.verbose > 0 {
        log::set_max_level(match cli.verbose {
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        });
    } else if cli.quiet {
        log::set_max_level(log::LevelFilter::Error);
    }

    let config = cli.config();
    let verb = cli.command.name();

    // Execute command
    match commands::execute(cli.command, &config, cli.quiet) {
        Ok(code) => code,
        Err(err) => {
            commands::report_error(verb, config.platform, &err);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
