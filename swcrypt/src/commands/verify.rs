//! Signature verification command

use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::process::ExitCode;
use swcrypt_core::{Toolkit, VerifyOutcome};

use super::EXIT_MISMATCH;

/// Check `signature` over `input` against `public_key`.
///
/// A mismatch is reported on stdout and mapped to [`EXIT_MISMATCH`]; only
/// failures to carry out the check are errors.
pub fn execute(
    toolkit: &Toolkit,
    algorithm: &str,
    public_key: &Path,
    input: &Path,
    signature: &Path,
) -> Result<ExitCode> {
    let outcome = toolkit
        .verify_signature(algorithm, public_key, input, signature)
        .with_context(|| format!("Failed to verify {}", signature.display()))?;

    match outcome {
        VerifyOutcome::Match => {
            println!("{}", style(outcome).green());
            Ok(ExitCode::SUCCESS)
        }
        VerifyOutcome::Mismatch { .. } => {
            println!("{}", style(outcome).red().bold());
            Ok(ExitCode::from(EXIT_MISMATCH))
        }
    }
}
