//! Key-pair generation command

use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use swcrypt_core::Toolkit;

use crate::utils::{create_spinner, format_bytes, hidden_spinner};

/// Generate a `key_type` pair and write both halves
pub fn execute(
    toolkit: &Toolkit,
    key_type: &str,
    public_key: &Path,
    private_key: &Path,
    quiet: bool,
) -> Result<()> {
    let spinner = if quiet {
        hidden_spinner()
    } else {
        create_spinner(&format!("Generating {key_type} key pair..."))
    };

    let result = toolkit.generate_key_pair(key_type, public_key, private_key);
    spinner.finish_and_clear();
    let pair = result.with_context(|| format!("Failed to generate {key_type} key pair"))?;

    if !quiet {
        println!("{} {} key pair", style("Generated").green().bold(), key_type);
        println!(
            "  Public key:  {} ({})",
            pair.public_key.display(),
            format_bytes(pair.public_size as u64)
        );
        println!(
            "  Private key: {} ({})",
            pair.private_key.display(),
            format_bytes(pair.private_size as u64)
        );
    }

    Ok(())
}
