//! CLI integration tests for swcrypt
//!
//! These tests run the real binary against a temporary container directory
//! and small keys so each invocation stays fast.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("swcrypt").unwrap();
        cmd.env("SWCRYPT_CONTAINER_DIR", self.path("containers"))
            .env("SWCRYPT_KEY_BITS", "1024")
            .env_remove("SWCRYPT_PLATFORM");
        cmd
    }

    fn generate(&self) {
        self.cmd()
            .args(["generate", "exchange-type"])
            .arg(self.path("pub.key"))
            .arg(self.path("priv.key"))
            .assert()
            .success();
    }

    fn sign(&self, algorithm: &str, input: &Path) {
        self.cmd()
            .args(["sign", algorithm])
            .arg(self.path("priv.key"))
            .arg(input)
            .arg(self.path("doc.sig"))
            .assert()
            .success();
    }

    fn verify(&self, algorithm: &str, input: &Path) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["verify", algorithm])
            .arg(self.path("pub.key"))
            .arg(input)
            .arg(self.path("doc.sig"))
            .assert()
    }
}

#[test]
fn test_generate_writes_both_blobs() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["generate", "signing"])
        .arg(ws.path("pub.key"))
        .arg(ws.path("priv.key"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated"))
        .stdout(predicate::str::contains("148 B"))
        .stdout(predicate::str::contains("596 B"));

    assert_eq!(fs::read(ws.path("pub.key")).unwrap().len(), 148);
    assert_eq!(fs::read(ws.path("priv.key")).unwrap().len(), 596);
}

#[test]
fn test_sign_then_verify_matches() {
    let ws = Workspace::new();
    let input = ws.path("doc.txt");
    fs::write(&input, b"signed contents\n").unwrap();

    ws.generate();
    ws.sign("sha-256", &input);
    assert_eq!(fs::read(ws.path("doc.sig")).unwrap().len(), 128);

    ws.verify("sha-256", &input)
        .code(0)
        .stdout(predicate::str::contains(
            "Signature matches with the specified file and key.",
        ));
}

#[test]
fn test_verify_other_file_mismatches() {
    let ws = Workspace::new();
    let input = ws.path("doc.txt");
    let other = ws.path("other.txt");
    fs::write(&input, b"signed contents\n").unwrap();
    fs::write(&other, b"different contents\n").unwrap();

    ws.generate();
    ws.sign("md5", &input);

    ws.verify("md5", &other)
        .code(1)
        .stdout(predicate::str::contains("DOES NOT match"))
        .stdout(predicate::str::contains("0x80090006"));
}

#[test]
fn test_unknown_algorithm_is_an_error() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["sign", "sha-3"])
        .arg(ws.path("priv.key"))
        .arg(ws.path("doc.txt"))
        .arg(ws.path("doc.sig"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("sha-3"))
        .stderr(predicate::str::contains("Usage:"));

    assert!(!ws.path("doc.sig").exists());
}

#[test]
fn test_legacy_platform_rejects_sha256() {
    let ws = Workspace::new();
    let input = ws.path("doc.txt");
    fs::write(&input, b"payload").unwrap();
    ws.generate();

    ws.cmd()
        .args(["--platform", "legacy", "sign", "sha-256"])
        .arg(ws.path("priv.key"))
        .arg(&input)
        .arg(ws.path("doc.sig"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("up to SHA-1"));

    assert!(!ws.path("doc.sig").exists());
}

#[test]
fn test_legacy_platform_signs_sha1() {
    let ws = Workspace::new();
    let input = ws.path("doc.txt");
    fs::write(&input, b"payload").unwrap();
    ws.generate();

    ws.cmd()
        .env("SWCRYPT_PLATFORM", "legacy")
        .args(["sign", "sha-1"])
        .arg(ws.path("priv.key"))
        .arg(&input)
        .arg(ws.path("doc.sig"))
        .assert()
        .success();

    ws.verify("sha-1", &input).code(0);
}

#[test]
fn test_missing_arguments_print_usage() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["verify", "sha-1", "pub.key"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_algorithms_listing() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["--platform", "modern", "algorithms"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sha-512"))
        .stdout(predicate::str::contains("exchange-type, signing"));

    ws.cmd()
        .args(["--platform", "legacy", "algorithms"])
        .assert()
        .success()
        .stdout(predicate::str::contains("up to SHA-1"));
}
