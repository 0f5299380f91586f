//! Chunked file hashing

use log::{debug, trace};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::provider::AlgId;
use crate::session::{HashObject, Session};

/// Bytes read from the input per hash feed
pub const HASH_CHUNK_SIZE: usize = 256;

/// Stream the file at `path` through a new `algorithm` hash of `session`.
///
/// The file is fed in order, one [`HASH_CHUNK_SIZE`] read at a time, until a
/// read returns no data. On failure the partial hash is dropped (and thereby
/// destroyed) before the error is returned.
pub fn hash_file<'s, P: AsRef<Path>>(
    session: &'s Session<'_>,
    algorithm: AlgId,
    path: P,
) -> Result<HashObject<'s>> {
    let path = path.as_ref();
    let hash = session.create_hash(algorithm)?;
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;

    let total = feed_reader(&hash, &mut file).map_err(|e| match e {
        FeedError::Read(source) => Error::io(path, source),
        FeedError::Hash(error) => error,
    })?;

    debug!("Hashed {} bytes of {}", total, path.display());
    Ok(hash)
}

enum FeedError {
    Read(std::io::Error),
    Hash(Error),
}

fn feed_reader<R: Read>(
    hash: &HashObject<'_>,
    reader: &mut R,
) -> std::result::Result<u64, FeedError> {
    let mut chunk = [0u8; HASH_CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FeedError::Read(e)),
        };
        hash.feed(&chunk[..read]).map_err(FeedError::Hash)?;
        total += read as u64;
        trace!("Fed {} bytes ({} total)", read, total);
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind as SwErrorKind;
    use crate::platform::Platform;
    use crate::provider::{ProviderCode, ProviderType};
    use crate::test_utils::{Op, OpKind, recording_shim};
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_feeds_fixed_size_chunks_in_order() {
        let dir = TempDir::new().unwrap();
        let (recorder, shim) = recording_shim(dir.path().join("containers"), Platform::Modern);
        let input = dir.path().join("input.bin");
        let mut file = File::create(&input).unwrap();
        file.write_all(&[0xAB; 600]).unwrap();
        drop(file);

        let session = Session::open_verify(&shim, ProviderType::RSA_FULL).unwrap();
        let hash = hash_file(&session, AlgId::SHA1, &input).unwrap();
        hash.destroy().unwrap();

        let chunks: Vec<usize> = recorder
            .journal()
            .into_iter()
            .filter_map(|op| match op {
                Op::HashData(len) => Some(len),
                _ => None,
            })
            .collect();
        assert_eq!(chunks, vec![256, 256, 88]);
    }

    #[test]
    fn test_empty_file_feeds_nothing() {
        let dir = TempDir::new().unwrap();
        let (recorder, shim) = recording_shim(dir.path().join("containers"), Platform::Modern);
        let input = dir.path().join("empty");
        File::create(&input).unwrap();

        let session = Session::open_verify(&shim, ProviderType::RSA_FULL).unwrap();
        let _hash = hash_file(&session, AlgId::MD5, &input).unwrap();
        assert!(!recorder.kinds().contains(&OpKind::HashData));
    }

    #[test]
    fn test_missing_input_destroys_hash() {
        let dir = TempDir::new().unwrap();
        let (recorder, shim) = recording_shim(dir.path().join("containers"), Platform::Modern);
        let session = Session::open_verify(&shim, ProviderType::RSA_FULL).unwrap();

        let err = hash_file(&session, AlgId::MD5, dir.path().join("absent")).unwrap_err();
        assert_eq!(err.kind(), SwErrorKind::IoFailure);
        assert_eq!(
            recorder.kinds()[1..].to_vec(),
            vec![OpKind::CreateHash, OpKind::DestroyHash]
        );
    }

    #[test]
    fn test_feed_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let (recorder, shim) = recording_shim(dir.path().join("containers"), Platform::Modern);
        let input = dir.path().join("input.bin");
        std::fs::write(&input, b"payload").unwrap();
        recorder.fail_on(OpKind::HashData, ProviderCode::BAD_HASH);

        let session = Session::open_verify(&shim, ProviderType::RSA_FULL).unwrap();
        let err = hash_file(&session, AlgId::MD5, &input).unwrap_err();
        assert_eq!(err.diagnostic_code(), Some(0x8009_0002));
    }
}
