//! File signing

use log::info;
use std::path::{Path, PathBuf};

use crate::error::{Artifact, Result};
use crate::hashing;
use crate::registry;
use crate::session::Session;
use crate::shim::ProviderShim;
use crate::store::{self, Limits};

/// Key container reserved for signing
pub const SIGN_CONTAINER: &str = "swcrypt_KeyContainer_Sign";

/// Signature written by [`sign_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedFile {
    /// Hash algorithm name
    pub algorithm: &'static str,
    /// Signature path
    pub signature: PathBuf,
    /// Signature size in bytes
    pub size: usize,
}

/// Sign `input` with the private key blob at `private_key`, writing the
/// signature to `output`.
///
/// The key signs from the slot it was imported into, so key pairs of either
/// type can sign.
pub fn sign_file<K, I, O>(
    shim: &ProviderShim,
    limits: &Limits,
    algorithm: &str,
    private_key: K,
    input: I,
    output: O,
) -> Result<SignedFile>
where
    K: AsRef<Path>,
    I: AsRef<Path>,
    O: AsRef<Path>,
{
    let descriptor = registry::lookup_hash_algorithm(algorithm)?;
    registry::ensure_supported(descriptor, shim.platform())?;
    let output = output.as_ref();
    let signature_limit = limits.for_artifact(Artifact::Signature);

    let session = Session::open_fresh(shim, SIGN_CONTAINER, descriptor.provider_type)?;
    let key = session.import_key_file(private_key, limits.for_artifact(Artifact::Key))?;
    let spec = key.spec()?;

    let hash = hashing::hash_file(&session, descriptor.algorithm_id, input)?;
    let signature = hash.sign(spec, signature_limit)?;
    store::write_all(output, &signature, Artifact::Signature, signature_limit)?;

    hash.destroy()?;
    key.destroy()?;
    session.close_and_reclaim()?;

    info!(
        "Signed with {}: {} ({} bytes)",
        descriptor.name,
        output.display(),
        signature.len()
    );
    Ok(SignedFile {
        algorithm: descriptor.name,
        signature: output.to_path_buf(),
        size: signature.len(),
    })
}
