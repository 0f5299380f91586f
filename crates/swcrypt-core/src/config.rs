//! Library configuration

use std::path::PathBuf;

use crate::platform::Platform;
use crate::provider::DEFAULT_KEY_BITS;
use crate::store::Limits;

/// Settings shared by every command of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Platform the provider is bound for
    pub platform: Platform,
    /// Size ceilings for key and signature blobs
    pub limits: Limits,
    /// RSA modulus size for generated key pairs
    pub key_bits: usize,
    /// Directory holding the software provider's key containers
    pub container_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            limits: Limits::default(),
            key_bits: DEFAULT_KEY_BITS,
            container_dir: default_container_dir(),
        }
    }
}

impl Config {
    /// Create a configuration for the detected platform
    pub fn new() -> Self {
        Self {
            platform: Platform::detect(),
            ..Self::default()
        }
    }

    /// Set the platform
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Set the size ceilings
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the key size for generated key pairs
    pub fn key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = key_bits;
        self
    }

    /// Set the key container directory
    pub fn container_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.container_dir = dir.into();
        self
    }
}

/// Per-user data directory for key containers, or the temp directory
pub fn default_container_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "swcrypt")
        .map(|dirs| dirs.data_local_dir().join("containers"))
        .unwrap_or_else(|| std::env::temp_dir().join("swcrypt").join("containers"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.platform, Platform::Modern);
        assert_eq!(config.limits.key_size, 1_000_000);
        assert_eq!(config.limits.signature_size, 1_000_000);
        assert_eq!(config.key_bits, 2048);
        assert!(config.container_dir.ends_with("containers"));
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .platform(Platform::Legacy)
            .key_bits(1024)
            .container_dir("/tmp/boxes")
            .limits(Limits {
                key_size: 10,
                signature_size: 20,
            });
        assert_eq!(config.platform, Platform::Legacy);
        assert_eq!(config.key_bits, 1024);
        assert_eq!(config.container_dir, PathBuf::from("/tmp/boxes"));
        assert_eq!(config.limits.signature_size, 20);
    }
}
