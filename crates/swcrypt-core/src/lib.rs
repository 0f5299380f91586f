//! # swcrypt_core - Key-pair, signing and verification engine
//!
//! Drives a cryptographic service provider through the full lifecycle of a
//! signing tool: key containers, key generation and import, chunked file
//! hashing, signature creation and signature checks.
//!
//! ## Features
//!
//! - Scoped provider sessions whose keys and hashes are torn down on every
//!   exit path, in reverse acquisition order
//! - Hard 1,000,000-byte ceilings on key and signature blobs, enforced before
//!   any transfer
//! - Hash algorithm registry (MD2 through SHA-512) with a legacy-platform gate
//! - Narrow or wide text calling conventions, bound once per process
//! - A software provider producing CryptoAPI-compatible key blobs and
//!   little-endian PKCS#1 v1.5 signatures
//!
//! ## Examples
//!
//! ```no_run
//! use swcrypt_core::{Config, Toolkit, VerifyOutcome};
//!
//! # fn main() -> Result<(), swcrypt_core::Error> {
//! let toolkit = Toolkit::from_config(&Config::new());
//!
//! toolkit.generate_key_pair("exchange-type", "pub.key", "priv.key")?;
//! toolkit.sign_file("sha-256", "priv.key", "doc.txt", "doc.sig")?;
//!
//! match toolkit.verify_signature("sha-256", "pub.key", "doc.txt", "doc.sig")? {
//!     VerifyOutcome::Match => println!("valid"),
//!     VerifyOutcome::Mismatch { code } => println!("invalid ({code})"),
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod config;
pub mod error;
pub mod generate;
pub mod hashing;
pub mod platform;
pub mod provider;
pub mod registry;
pub mod session;
pub mod shim;
pub mod sign;
pub mod store;
pub mod verify;

#[cfg(any(test, feature = "test-utils", doc))]
pub mod test_utils;

use std::path::Path;
use std::sync::Arc;

pub use config::Config;
pub use error::{Artifact, Error, ErrorKind, Result};
pub use generate::{GENERATE_CONTAINER, GeneratedPair};
pub use platform::Platform;
pub use provider::{CryptoProvider, KeySpec, ProviderCode, SoftCsp};
pub use registry::{AlgorithmDescriptor, HASH_ALGORITHMS, KEY_PAIR_TYPES};
pub use session::Session;
pub use shim::ProviderShim;
pub use sign::{SIGN_CONTAINER, SignedFile};
pub use store::{KEY_SIZE_LIMIT, Limits, SIGNATURE_SIZE_LIMIT};
pub use verify::VerifyOutcome;

/// A bound provider plus the size ceilings every command applies
#[derive(Debug, Clone)]
pub struct Toolkit {
    shim: ProviderShim,
    limits: Limits,
}

impl Toolkit {
    /// Create a toolkit around an already bound provider
    pub fn new(shim: ProviderShim, limits: Limits) -> Self {
        Self { shim, limits }
    }

    /// Bind a [`SoftCsp`] as described by `config`
    pub fn from_config(config: &Config) -> Self {
        let provider: Arc<dyn CryptoProvider> = Arc::new(SoftCsp::with_key_bits(
            config.container_dir.clone(),
            config.key_bits,
        ));
        Self::new(ProviderShim::bind(config.platform, provider), config.limits)
    }

    /// The bound provider
    pub fn shim(&self) -> &ProviderShim {
        &self.shim
    }

    /// Size ceilings in effect
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Platform the provider is bound for
    pub fn platform(&self) -> Platform {
        self.shim.platform()
    }

    /// Generate a key pair; see [`generate::generate_key_pair`]
    pub fn generate_key_pair<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        key_type: &str,
        public_key: P,
        private_key: Q,
    ) -> Result<GeneratedPair> {
        generate::generate_key_pair(&self.shim, &self.limits, key_type, public_key, private_key)
    }

    /// Sign a file; see [`sign::sign_file`]
    pub fn sign_file<K: AsRef<Path>, I: AsRef<Path>, O: AsRef<Path>>(
        &self,
        algorithm: &str,
        private_key: K,
        input: I,
        output: O,
    ) -> Result<SignedFile> {
        sign::sign_file(
            &self.shim,
            &self.limits,
            algorithm,
            private_key,
            input,
            output,
        )
    }

    /// Verify a signature; see [`verify::verify_signature`]
    pub fn verify_signature<K: AsRef<Path>, I: AsRef<Path>, S: AsRef<Path>>(
        &self,
        algorithm: &str,
        public_key: K,
        input: I,
        signature: S,
    ) -> Result<VerifyOutcome> {
        verify::verify_signature(
            &self.shim,
            &self.limits,
            algorithm,
            public_key,
            input,
            signature,
        )
    }
}
