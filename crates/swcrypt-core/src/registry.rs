//! Hash algorithm and key-pair type registries
//!
//! Both tables are static and sorted by name so lookups are a binary search.
//! Unknown names fail closed with [`Error::UnknownOption`].

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::provider::{AlgId, KeySpec, ProviderType};

/// Registry name used in `UnknownOption` errors for hash algorithms
pub const HASH_REGISTRY: &str = "hash algorithm";

/// Registry name used in `UnknownOption` errors for key-pair types
pub const KEY_PAIR_REGISTRY: &str = "key pair type";

/// Immutable description of a hash algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmDescriptor {
    /// User-facing name
    pub name: &'static str,
    /// Provider algorithm identifier
    pub algorithm_id: AlgId,
    /// Provider type that supports the algorithm
    pub provider_type: ProviderType,
}

impl AlgorithmDescriptor {
    /// Check if the algorithm is available on legacy platforms
    pub fn is_legacy_safe(&self) -> bool {
        LEGACY_SAFE_ALGORITHMS
            .binary_search(&self.algorithm_id)
            .is_ok()
    }
}

/// Algorithms legacy providers implement, sorted by identifier
const LEGACY_SAFE_ALGORITHMS: &[AlgId] = &[AlgId::MD2, AlgId::MD4, AlgId::MD5, AlgId::SHA1];

/// Every known hash algorithm, sorted by name
pub static HASH_ALGORITHMS: &[AlgorithmDescriptor] = &[
    AlgorithmDescriptor {
        name: "md2",
        algorithm_id: AlgId::MD2,
        provider_type: ProviderType::RSA_FULL,
    },
    AlgorithmDescriptor {
        name: "md4",
        algorithm_id: AlgId::MD4,
        provider_type: ProviderType::RSA_FULL,
    },
    AlgorithmDescriptor {
        name: "md5",
        algorithm_id: AlgId::MD5,
        provider_type: ProviderType::RSA_FULL,
    },
    AlgorithmDescriptor {
        name: "sha-1",
        algorithm_id: AlgId::SHA1,
        provider_type: ProviderType::RSA_FULL,
    },
    AlgorithmDescriptor {
        name: "sha-256",
        algorithm_id: AlgId::SHA_256,
        provider_type: ProviderType::RSA_AES,
    },
    AlgorithmDescriptor {
        name: "sha-384",
        algorithm_id: AlgId::SHA_384,
        provider_type: ProviderType::RSA_AES,
    },
    AlgorithmDescriptor {
        name: "sha-512",
        algorithm_id: AlgId::SHA_512,
        provider_type: ProviderType::RSA_AES,
    },
];

/// Key-pair types accepted by `generate`, sorted by name
pub static KEY_PAIR_TYPES: &[(&str, KeySpec)] = &[
    ("exchange-type", KeySpec::KeyExchange),
    ("signing", KeySpec::Signature),
];

/// Look up a hash algorithm by exact name
pub fn lookup_hash_algorithm(name: &str) -> Result<&'static AlgorithmDescriptor> {
    HASH_ALGORITHMS
        .binary_search_by(|descriptor| descriptor.name.cmp(name))
        .map(|index| &HASH_ALGORITHMS[index])
        .map_err(|_| Error::unknown_option(HASH_REGISTRY, name))
}

/// Look up a key-pair type by exact name
pub fn lookup_key_pair_type(name: &str) -> Result<KeySpec> {
    KEY_PAIR_TYPES
        .binary_search_by(|(entry, _)| entry.cmp(&name))
        .map(|index| KEY_PAIR_TYPES[index].1)
        .map_err(|_| Error::unknown_option(KEY_PAIR_REGISTRY, name))
}

/// Apply the legacy platform policy gate
pub fn ensure_supported(descriptor: &AlgorithmDescriptor, platform: Platform) -> Result<()> {
    if platform.is_legacy() && !descriptor.is_legacy_safe() {
        return Err(Error::UnsupportedOnPlatform {
            algorithm: descriptor.name.to_string(),
        });
    }
    Ok(())
}

/// Names of the hash algorithms usable on `platform`
pub fn algorithm_names(platform: Platform) -> Vec<&'static str> {
    HASH_ALGORITHMS
        .iter()
        .filter(|descriptor| ensure_supported(descriptor, platform).is_ok())
        .map(|descriptor| descriptor.name)
        .collect()
}

/// Names of the key-pair types
pub fn key_pair_type_names() -> Vec<&'static str> {
    KEY_PAIR_TYPES.iter().map(|(name, _)| *name).collect()
}
