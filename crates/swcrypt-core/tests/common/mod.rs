//! Common test utilities and fixtures

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use swcrypt_core::{Config, Limits, Platform, Toolkit};
use tempfile::TempDir;

/// Key size used in integration tests
pub const TEST_KEY_BITS: usize = 1024;

/// Create a temporary directory for tests
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Toolkit keeping its containers under `dir`
pub fn toolkit(dir: &Path, platform: Platform) -> Toolkit {
    toolkit_with_limits(dir, platform, Limits::default())
}

/// Toolkit with custom size ceilings
pub fn toolkit_with_limits(dir: &Path, platform: Platform, limits: Limits) -> Toolkit {
    Toolkit::from_config(
        &Config::default()
            .platform(platform)
            .limits(limits)
            .key_bits(TEST_KEY_BITS)
            .container_dir(dir.join("containers")),
    )
}

/// Generate test data of a specific size
pub fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Create a test file with specific content
pub fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Paths of a generated key pair
pub struct KeyPair {
    pub public: PathBuf,
    pub private: PathBuf,
}

/// Generate a key pair of `key_type` into `dir`
pub fn generate_pair(toolkit: &Toolkit, dir: &Path, key_type: &str) -> KeyPair {
    let public = dir.join("pub.key");
    let private = dir.join("priv.key");
    toolkit
        .generate_key_pair(key_type, &public, &private)
        .expect("Failed to generate key pair");
    KeyPair { public, private }
}
