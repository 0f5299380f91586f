//! Signature verification

use log::info;
use std::fmt;
use std::path::Path;

use crate::error::{Artifact, Result};
use crate::hashing;
use crate::provider::ProviderCode;
use crate::registry;
use crate::session::Session;
use crate::shim::ProviderShim;
use crate::store::{self, Limits};

/// Result of a completed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The signature matches the file and key
    Match,
    /// The signature does not match; `code` is the provider's verdict
    Mismatch {
        /// Diagnostic code reported by the provider
        code: ProviderCode,
    },
}

impl VerifyOutcome {
    /// Check if the signature matched
    pub fn is_match(&self) -> bool {
        matches!(self, VerifyOutcome::Match)
    }

    /// Diagnostic code of a mismatch
    pub fn code(&self) -> Option<ProviderCode> {
        match self {
            VerifyOutcome::Match => None,
            VerifyOutcome::Mismatch { code } => Some(*code),
        }
    }
}

impl fmt::Display for VerifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyOutcome::Match => {
                f.write_str("Signature matches with the specified file and key.")
            }
            VerifyOutcome::Mismatch { code } => write!(
                f,
                "Signature DOES NOT match with the specified file and key.\nReason: {code}"
            ),
        }
    }
}

/// Check the signature at `signature` for `input` against the public key blob
/// at `public_key`.
///
/// Runs in a container-less session. A cryptographic mismatch is returned as
/// [`VerifyOutcome::Mismatch`]; only plumbing failures are errors.
pub fn verify_signature<K, I, S>(
    shim: &ProviderShim,
    limits: &Limits,
    algorithm: &str,
    public_key: K,
    input: I,
    signature: S,
) -> Result<VerifyOutcome>
where
    K: AsRef<Path>,
    I: AsRef<Path>,
    S: AsRef<Path>,
{
    let descriptor = registry::lookup_hash_algorithm(algorithm)?;
    registry::ensure_supported(descriptor, shim.platform())?;

    let session = Session::open_verify(shim, descriptor.provider_type)?;
    let key = session.import_key_file(public_key, limits.for_artifact(Artifact::Key))?;
    let hash = hashing::hash_file(&session, descriptor.algorithm_id, input)?;

    let signature = store::read_all(
        signature,
        Artifact::Signature,
        limits.for_artifact(Artifact::Signature),
    )?;
    let outcome = hash.verify(&signature, &key)?;

    hash.destroy()?;
    key.destroy()?;
    session.close()?;

    info!("Verification with {}: {:?}", descriptor.name, outcome);
    Ok(outcome)
}
