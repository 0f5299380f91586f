//! Key-pair generation

use log::info;
use std::path::{Path, PathBuf};

use crate::error::{Artifact, Result};
use crate::provider::{BlobType, KeySpec, ProviderType};
use crate::registry;
use crate::session::Session;
use crate::shim::ProviderShim;
use crate::store::{self, Limits};

/// Key container reserved for key-pair generation
pub const GENERATE_CONTAINER: &str = "swcrypt_KeyContainer_Generate";

/// Files written by [`generate_key_pair`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPair {
    /// Slot the pair was generated for
    pub spec: KeySpec,
    /// Public key blob path
    pub public_key: PathBuf,
    /// Public key blob size in bytes
    pub public_size: usize,
    /// Private key blob path
    pub private_key: PathBuf,
    /// Private key blob size in bytes
    pub private_size: usize,
}

/// Generate a key pair of type `key_type` and export both halves.
///
/// `key_type` is one of the names in [`registry::KEY_PAIR_TYPES`]. The public
/// blob is written before the private one; if the second export fails the
/// first file is left in place.
pub fn generate_key_pair<P: AsRef<Path>, Q: AsRef<Path>>(
    shim: &ProviderShim,
    limits: &Limits,
    key_type: &str,
    public_key: P,
    private_key: Q,
) -> Result<GeneratedPair> {
    let spec = registry::lookup_key_pair_type(key_type)?;
    let (public_key, private_key) = (public_key.as_ref(), private_key.as_ref());
    let limit = limits.for_artifact(Artifact::Key);

    let session = Session::open_fresh(shim, GENERATE_CONTAINER, ProviderType::RSA_FULL)?;
    let key = session.generate_key(spec, true)?;

    let public_blob = key.export(BlobType::PublicKey, limit)?;
    store::write_all(public_key, &public_blob, Artifact::Key, limit)?;

    let private_blob = key.export(BlobType::PrivateKey, limit)?;
    store::write_all(private_key, &private_blob, Artifact::Key, limit)?;

    key.destroy()?;
    session.close_and_reclaim()?;

    info!(
        "Generated {} key pair: {} ({} bytes), {} ({} bytes)",
        key_type,
        public_key.display(),
        public_blob.len(),
        private_key.display(),
        private_blob.len()
    );
    Ok(GeneratedPair {
        spec,
        public_key: public_key.to_path_buf(),
        public_size: public_blob.len(),
        private_key: private_key.to_path_buf(),
        private_size: private_blob.len(),
    })
}
