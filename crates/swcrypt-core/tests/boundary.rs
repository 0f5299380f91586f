//! Key and signature size ceilings are inclusive and checked before writing

mod common;

use common::*;
use swcrypt_core::{Artifact, Error, ErrorKind, Limits, Platform};

/// PRIVATEKEYBLOB size for a 1024-bit key: headers, modulus, five half-width
/// CRT values and the private exponent
const PRIVATE_BLOB_SIZE: usize = 20 + 128 + 5 * 64 + 128;
const PUBLIC_BLOB_SIZE: usize = 20 + 128;
const SIGNATURE_SIZE: usize = 128;

#[test]
fn test_key_export_at_exact_limit_succeeds() {
    let dir = temp_dir();
    let limits = Limits {
        key_size: PRIVATE_BLOB_SIZE,
        ..Limits::default()
    };
    let toolkit = toolkit_with_limits(dir.path(), Platform::Modern, limits);

    let pair = toolkit
        .generate_key_pair("signing", dir.path().join("pub.key"), dir.path().join("priv.key"))
        .unwrap();
    assert_eq!(pair.public_size, PUBLIC_BLOB_SIZE);
    assert_eq!(pair.private_size, PRIVATE_BLOB_SIZE);
}

#[test]
fn test_key_export_one_byte_over_limit_fails_before_writing() {
    let dir = temp_dir();
    let limits = Limits {
        key_size: PRIVATE_BLOB_SIZE - 1,
        ..Limits::default()
    };
    let toolkit = toolkit_with_limits(dir.path(), Platform::Modern, limits);
    let public = dir.path().join("pub.key");
    let private = dir.path().join("priv.key");

    let err = toolkit
        .generate_key_pair("signing", &public, &private)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::SizeLimitExceeded {
            artifact: Artifact::Key,
            size,
            limit,
        } if size == PRIVATE_BLOB_SIZE as u64 && limit == PRIVATE_BLOB_SIZE - 1
    ));
    // The public half fits and was already written
    assert!(public.exists());
    assert!(!private.exists());
}

#[test]
fn test_signature_at_exact_limit_succeeds() {
    let dir = temp_dir();
    let limits = Limits {
        signature_size: SIGNATURE_SIZE,
        ..Limits::default()
    };
    let toolkit = toolkit_with_limits(dir.path(), Platform::Modern, limits);
    let pair = generate_pair(&toolkit, dir.path(), "exchange-type");
    let input = create_test_file(dir.path(), "doc.txt", b"edge");
    let signature = dir.path().join("doc.sig");

    let signed = toolkit
        .sign_file("sha-256", &pair.private, &input, &signature)
        .unwrap();
    assert_eq!(signed.size, SIGNATURE_SIZE);
    assert!(
        toolkit
            .verify_signature("sha-256", &pair.public, &input, &signature)
            .unwrap()
            .is_match()
    );
}

#[test]
fn test_signature_one_byte_over_limit_fails_before_writing() {
    let dir = temp_dir();
    let limits = Limits {
        signature_size: SIGNATURE_SIZE - 1,
        ..Limits::default()
    };
    let toolkit = toolkit_with_limits(dir.path(), Platform::Modern, limits);
    let pair = generate_pair(&toolkit, dir.path(), "exchange-type");
    let input = create_test_file(dir.path(), "doc.txt", b"edge");
    let signature = dir.path().join("doc.sig");

    let err = toolkit
        .sign_file("sha-256", &pair.private, &input, &signature)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeLimitExceeded);
    assert!(!signature.exists());
}

#[test]
fn test_oversized_signature_file_is_rejected_on_verify() {
    let dir = temp_dir();
    let toolkit = toolkit(dir.path(), Platform::Modern);
    let pair = generate_pair(&toolkit, dir.path(), "signing");
    let input = create_test_file(dir.path(), "doc.txt", b"edge");
    let signature = create_test_file(dir.path(), "doc.sig", &vec![0u8; 1_000_001]);

    let err = toolkit
        .verify_signature("sha-1", &pair.public, &input, &signature)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::SizeLimitExceeded {
            artifact: Artifact::Signature,
            size: 1_000_001,
            limit: 1_000_000
        }
    ));
}

#[test]
fn test_oversized_key_file_is_rejected_on_verify() {
    let dir = temp_dir();
    let toolkit = toolkit(dir.path(), Platform::Modern);
    let input = create_test_file(dir.path(), "doc.txt", b"edge");
    let key = create_test_file(dir.path(), "pub.key", &vec![0u8; 1_000_001]);
    let signature = create_test_file(dir.path(), "doc.sig", &[0u8; 128]);

    let err = toolkit
        .verify_signature("sha-1", &key, &input, &signature)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeLimitExceeded);
}
