//! File signing command

use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use swcrypt_core::Toolkit;

use crate::utils::format_bytes;

/// Sign `input` with `private_key`, writing the signature to `output`
pub fn execute(
    toolkit: &Toolkit,
    algorithm: &str,
    private_key: &Path,
    input: &Path,
    output: &Path,
    quiet: bool,
) -> Result<()> {
    let signed = toolkit
        .sign_file(algorithm, private_key, input, output)
        .with_context(|| format!("Failed to sign {}", input.display()))?;

    if !quiet {
        println!(
            "{} {} with {}",
            style("Signed").green().bold(),
            input.display(),
            signed.algorithm
        );
        println!(
            "  Signature: {} ({})",
            signed.signature.display(),
            format_bytes(signed.size as u64)
        );
    }

    Ok(())
}
