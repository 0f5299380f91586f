//! Command implementations

pub mod algorithms;
pub mod generate;
pub mod sign;
pub mod verify;

use anyhow::Result;
use clap::CommandFactory;
use std::io;
use std::process::ExitCode;
use swcrypt_core::registry;
use swcrypt_core::{Config, Platform, Toolkit};

use crate::cli::{Cli, Commands};
use crate::utils::format_code;

/// Exit status of a verification whose signature did not match
pub const EXIT_MISMATCH: u8 = 1;

/// Exit status of any failed command
pub const EXIT_ERROR: u8 = 2;

/// Run `command` against a toolkit built from `config`
pub fn execute(command: Commands, config: &Config, quiet: bool) -> Result<ExitCode> {
    match command {
        Commands::Generate {
            key_type,
            public_key,
            private_key,
        } => {
            let toolkit = Toolkit::from_config(config);
            generate::execute(&toolkit, &key_type, &public_key, &private_key, quiet)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sign {
            algorithm,
            private_key,
            input,
            output,
        } => {
            let toolkit = Toolkit::from_config(config);
            sign::execute(&toolkit, &algorithm, &private_key, &input, &output, quiet)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify {
            algorithm,
            public_key,
            input,
            signature,
        } => {
            let toolkit = Toolkit::from_config(config);
            verify::execute(&toolkit, &algorithm, &public_key, &input, &signature)
        }
        Commands::Algorithms => {
            algorithms::execute(config.platform);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completions { shell } => {
            print_completions(shell);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Print a failed command's error chain, diagnostic code and usage to stderr
pub fn report_error(verb: &str, platform: Platform, err: &anyhow::Error) {
    eprintln!("Error: {err:#}");

    if let Some(code) = err
        .downcast_ref::<swcrypt_core::Error>()
        .and_then(swcrypt_core::Error::diagnostic_code)
    {
        eprintln!("Code: {}", format_code(code));
    }

    let mut cmd = Cli::command();
    cmd.build();
    if let Some(sub) = cmd.find_subcommand_mut(verb) {
        eprintln!();
        eprintln!("{}", sub.render_usage());
    }

    if platform.is_legacy() && matches!(verb, "sign" | "verify") {
        eprintln!(
            "Legacy platforms only support hash algorithms up to SHA-1 ({}).",
            registry::algorithm_names(platform).join(", ")
        );
    }
}

fn print_completions(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
}
