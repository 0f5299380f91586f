//! Bounded file store
//!
//! Whole-file reads and writes for key and signature blobs. Every transfer is
//! checked against its ceiling before anything is read into memory or written
//! to disk, so an oversized artifact never produces a partial file.

use log::{debug, trace};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use crate::error::{Artifact, Error, Result};
use crate::provider::ProviderResult;

/// Maximum size of a key blob in bytes
pub const KEY_SIZE_LIMIT: usize = 1_000_000;

/// Maximum size of a signature blob in bytes
pub const SIGNATURE_SIZE_LIMIT: usize = 1_000_000;

/// Size ceilings applied to key and signature transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Ceiling for key blobs
    pub key_size: usize,
    /// Ceiling for signature blobs
    pub signature_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            key_size: KEY_SIZE_LIMIT,
            signature_size: SIGNATURE_SIZE_LIMIT,
        }
    }
}

impl Limits {
    /// Ceiling for `artifact`
    pub fn for_artifact(&self, artifact: Artifact) -> usize {
        match artifact {
            Artifact::Key => self.key_size,
            Artifact::Signature => self.signature_size,
        }
    }
}

/// Fail with `SizeLimitExceeded` when `size` is above `limit`
pub fn check_size(artifact: Artifact, size: u64, limit: usize) -> Result<()> {
    if size > limit as u64 {
        return Err(Error::SizeLimitExceeded {
            artifact,
            size,
            limit,
        });
    }
    Ok(())
}

/// Size of the file at `path`
pub fn file_size<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path = path.as_ref();
    fs::metadata(path)
        .map(|metadata| metadata.len())
        .map_err(|e| Error::io(path, e))
}

/// Read a whole file, refusing anything larger than `limit`
pub fn read_all<P: AsRef<Path>>(path: P, artifact: Artifact, limit: usize) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let size = file_size(path)?;
    check_size(artifact, size, limit)?;

    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut data = Vec::with_capacity(size as usize);
    // The file may grow between the size check and the read
    file.take(limit as u64 + 1)
        .read_to_end(&mut data)
        .map_err(|e| Error::io(path, e))?;
    check_size(artifact, data.len() as u64, limit)?;

    debug!("Read {} bytes of {} from {}", data.len(), artifact, path.display());
    Ok(data)
}

/// Write `data` as the whole content of `path`, refusing anything larger than `limit`
pub fn write_all<P: AsRef<Path>>(
    path: P,
    data: &[u8],
    artifact: Artifact,
    limit: usize,
) -> Result<()> {
    let path = path.as_ref();
    check_size(artifact, data.len() as u64, limit)?;
    fs::write(path, data).map_err(|e| Error::io(path, e))?;
    debug!("Wrote {} bytes of {} to {}", data.len(), artifact, path.display());
    Ok(())
}

/// Output buffer for a provider transfer whose size was queried first
#[derive(Debug)]
pub struct BoundedBuffer {
    artifact: Artifact,
    data: Vec<u8>,
}

impl BoundedBuffer {
    /// Allocate room for `required` bytes, or fail if that exceeds `limit`
    pub fn for_transfer(artifact: Artifact, required: usize, limit: usize) -> Result<Self> {
        check_size(artifact, required as u64, limit)?;
        trace!("Reserved {} bytes for {}", required, artifact);
        Ok(Self {
            artifact,
            data: vec![0u8; required],
        })
    }

    /// Capacity reserved for the transfer
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Let the provider fill the buffer and keep the bytes it reports written
    pub fn fill_with<F>(mut self, operation: &'static str, fill: F) -> Result<Vec<u8>>
    where
        F: FnOnce(&mut [u8]) -> ProviderResult<usize>,
    {
        let written = fill(&mut self.data).map_err(|code| Error::provider(operation, code))?;
        self.data.truncate(written);
        trace!("{} produced {} bytes of {}", operation, written, self.artifact);
        Ok(self.data)
    }
}
