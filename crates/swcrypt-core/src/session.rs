//! Provider session lifecycle
//!
//! A [`Session`] owns one provider context. Keys and hash objects borrow the
//! session that created them, so the borrow checker guarantees they are gone
//! before the session can be closed. Each wrapper releases its provider
//! resource when dropped, which gives the teardown cascade (hash, key,
//! context, container) on every exit path without any manual unwinding.
//!
//! Explicit `destroy` / `close` calls report failures; the drop path is
//! best-effort and only logs them, so the first failure of an operation is
//! always the one returned to the caller.

use log::{debug, trace, warn};
use std::path::Path;

use crate::error::{Artifact, Error, Result};
use crate::provider::{
    AcquireMode, AlgId, BlobType, ContextHandle, HashHandle, KeyHandle, KeySpec, ProviderCode,
    ProviderType,
};
use crate::shim::ProviderShim;
use crate::store::{self, BoundedBuffer};
use crate::verify::VerifyOutcome;

/// An acquired provider context
#[derive(Debug)]
pub struct Session<'a> {
    shim: &'a ProviderShim,
    handle: ContextHandle,
    provider_type: ProviderType,
    container: Option<String>,
    released: bool,
    reclaim_on_drop: bool,
}

impl<'a> Session<'a> {
    /// Open a session on a freshly created key container.
    ///
    /// Any container left behind under `container` is deleted first; a
    /// failure of that delete is ignored since the container usually does
    /// not exist. A session opened this way deletes its container when it is
    /// dropped without [`Session::close`].
    pub fn open_fresh(
        shim: &'a ProviderShim,
        container: &str,
        provider_type: ProviderType,
    ) -> Result<Self> {
        match shim.acquire_context(Some(container), provider_type, AcquireMode::DeleteKeyset) {
            Ok(_) => debug!("Removed stale key container {:?}", container),
            Err(code) => trace!("No stale key container {:?} ({})", container, code),
        }

        let handle = shim
            .acquire_context(Some(container), provider_type, AcquireMode::NewKeyset)
            .map_err(|code| Error::provider("acquire context", code))?
            .ok_or_else(|| Error::provider("acquire context", ProviderCode::FAIL))?;

        debug!(
            "Opened session {} on key container {:?} ({})",
            handle.0,
            container,
            provider_type.name()
        );
        Ok(Self {
            shim,
            handle,
            provider_type,
            container: Some(container.to_string()),
            released: false,
            reclaim_on_drop: true,
        })
    }

    /// Open a container-less session that can only work with public keys
    pub fn open_verify(shim: &'a ProviderShim, provider_type: ProviderType) -> Result<Self> {
        let handle = shim
            .acquire_context(None, provider_type, AcquireMode::VerifyContext)
            .map_err(|code| Error::provider("acquire verify context", code))?
            .ok_or_else(|| Error::provider("acquire verify context", ProviderCode::FAIL))?;

        debug!(
            "Opened verify session {} ({})",
            handle.0,
            provider_type.name()
        );
        Ok(Self {
            shim,
            handle,
            provider_type,
            container: None,
            released: false,
            reclaim_on_drop: false,
        })
    }

    /// Provider context handle
    pub fn handle(&self) -> ContextHandle {
        self.handle
    }

    /// Provider type the session was opened for
    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    /// Key container name, `None` for verify sessions
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// Generate a key pair into the `spec` slot
    pub fn generate_key(&self, spec: KeySpec, exportable: bool) -> Result<Key<'_>> {
        let handle = self
            .shim
            .provider()
            .generate_key(self.handle, spec, exportable)
            .map_err(|code| Error::provider("generate key", code))?;
        debug!("Generated {:?} key {} in session {}", spec, handle.0, self.handle.0);
        Ok(Key::new(self, handle))
    }

    /// Import a key blob
    pub fn import_key(&self, blob: &[u8]) -> Result<Key<'_>> {
        let handle = self
            .shim
            .provider()
            .import_key(self.handle, blob)
            .map_err(|code| Error::provider("import key", code))?;
        debug!("Imported key {} into session {}", handle.0, self.handle.0);
        Ok(Key::new(self, handle))
    }

    /// Read a key blob from `path` (bounded by `limit`) and import it
    pub fn import_key_file<P: AsRef<Path>>(&self, path: P, limit: usize) -> Result<Key<'_>> {
        let blob = store::read_all(path, Artifact::Key, limit)?;
        self.import_key(&blob)
    }

    /// Create a hash object for `algorithm`
    pub fn create_hash(&self, algorithm: AlgId) -> Result<HashObject<'_>> {
        let handle = self
            .shim
            .provider()
            .create_hash(self.handle, algorithm)
            .map_err(|code| Error::provider("create hash", code))?;
        debug!(
            "Created {} hash {} in session {}",
            algorithm, handle.0, self.handle.0
        );
        Ok(HashObject {
            session: self,
            handle,
            algorithm,
            destroyed: false,
        })
    }

    /// Release the provider context, keeping the key container
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    /// Release the provider context, then delete the key container with a
    /// separate provider call
    pub fn close_and_reclaim(mut self) -> Result<()> {
        self.release()?;
        if let Some(container) = self.container.take() {
            reclaim_container(self.shim, &container, self.provider_type)?;
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.released = true;
        self.reclaim_on_drop = false;
        self.shim
            .provider()
            .release_context(self.handle)
            .map_err(|code| Error::provider("release context", code))?;
        debug!("Closed session {}", self.handle.0);
        Ok(())
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(code) = self.shim.provider().release_context(self.handle) {
            warn!("Failed to release session {}: {}", self.handle.0, code);
        }
        if self.reclaim_on_drop
            && let Some(container) = &self.container
            && let Err(e) = reclaim_container(self.shim, container, self.provider_type)
        {
            warn!("{}", e);
        }
    }
}

/// Delete the key container `container`
pub fn reclaim_container(
    shim: &ProviderShim,
    container: &str,
    provider_type: ProviderType,
) -> Result<()> {
    shim.acquire_context(Some(container), provider_type, AcquireMode::DeleteKeyset)
        .map_err(|code| Error::provider("delete key container", code))?;
    debug!("Reclaimed key container {:?}", container);
    Ok(())
}

/// A key owned by a [`Session`]
#[derive(Debug)]
pub struct Key<'s> {
    session: &'s Session<'s>,
    handle: KeyHandle,
    destroyed: bool,
}

impl<'s> Key<'s> {
    fn new(session: &'s Session<'s>, handle: KeyHandle) -> Self {
        Self {
            session,
            handle,
            destroyed: false,
        }
    }

    /// Provider key handle
    pub fn handle(&self) -> KeyHandle {
        self.handle
    }

    /// Slot the key occupies in its session
    pub fn spec(&self) -> Result<KeySpec> {
        self.session
            .shim
            .provider()
            .key_spec(self.handle)
            .map_err(|code| Error::provider("get key parameters", code))
    }

    /// Export the key as a blob of at most `limit` bytes.
    ///
    /// The required size is queried first and checked against `limit`
    /// before the real export runs.
    pub fn export(&self, blob_type: BlobType, limit: usize) -> Result<Vec<u8>> {
        let provider = self.session.shim.provider();
        let required = provider
            .export_key(self.handle, blob_type, None)
            .map_err(|code| Error::provider("export key", code))?;
        trace!("{:?} export of key {} needs {} bytes", blob_type, self.handle.0, required);

        BoundedBuffer::for_transfer(Artifact::Key, required, limit)?.fill_with(
            "export key",
            |out| provider.export_key(self.handle, blob_type, Some(out)),
        )
    }

    /// Destroy the key, reporting failure
    pub fn destroy(mut self) -> Result<()> {
        self.destroyed = true;
        self.session
            .shim
            .provider()
            .destroy_key(self.handle)
            .map_err(|code| Error::provider("destroy key", code))?;
        trace!("Destroyed key {}", self.handle.0);
        Ok(())
    }
}

impl Drop for Key<'_> {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        if let Err(code) = self.session.shim.provider().destroy_key(self.handle) {
            warn!("Failed to destroy key {}: {}", self.handle.0, code);
        }
    }
}

/// A hash object owned by a [`Session`]
#[derive(Debug)]
pub struct HashObject<'s> {
    session: &'s Session<'s>,
    handle: HashHandle,
    algorithm: AlgId,
    destroyed: bool,
}

impl HashObject<'_> {
    /// Provider hash handle
    pub fn handle(&self) -> HashHandle {
        self.handle
    }

    /// Hash algorithm
    pub fn algorithm(&self) -> AlgId {
        self.algorithm
    }

    /// Feed bytes into the hash
    pub fn feed(&self, data: &[u8]) -> Result<()> {
        self.session
            .shim
            .provider()
            .hash_data(self.handle, data)
            .map_err(|code| Error::provider("hash data", code))
    }

    /// Sign the hash with the key in the `spec` slot.
    ///
    /// The signature size is queried first and checked against `limit`
    /// before the real signature is produced. Signing finalizes the hash.
    pub fn sign(&self, spec: KeySpec, limit: usize) -> Result<Vec<u8>> {
        let shim = self.session.shim;
        let required = shim
            .sign_hash(self.handle, spec, None, None)
            .map_err(|code| Error::provider("sign hash", code))?;
        trace!("Signature over hash {} needs {} bytes", self.handle.0, required);

        BoundedBuffer::for_transfer(Artifact::Signature, required, limit)?
            .fill_with("sign hash", |out| {
                shim.sign_hash(self.handle, spec, None, Some(out))
            })
    }

    /// Check `signature` against the hash and `key`.
    ///
    /// A signature that does not match is an [`VerifyOutcome::Mismatch`],
    /// not an error.
    pub fn verify(&self, signature: &[u8], key: &Key<'_>) -> Result<VerifyOutcome> {
        match self
            .session
            .shim
            .verify_signature(self.handle, signature, key.handle, None)
        {
            Ok(()) => Ok(VerifyOutcome::Match),
            Err(code) if code.is_signature_mismatch() => Ok(VerifyOutcome::Mismatch { code }),
            Err(code) => Err(Error::provider("verify signature", code)),
        }
    }

    /// Destroy the hash object, reporting failure
    pub fn destroy(mut self) -> Result<()> {
        self.destroyed = true;
        self.session
            .shim
            .provider()
            .destroy_hash(self.handle)
            .map_err(|code| Error::provider("destroy hash", code))?;
        trace!("Destroyed hash {}", self.handle.0);
        Ok(())
    }
}

impl Drop for HashObject<'_> {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        if let Err(code) = self.session.shim.provider().destroy_hash(self.handle) {
            warn!("Failed to destroy hash {}: {}", self.handle.0, code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use crate::test_utils::{OpKind, recording_shim};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const CONTAINER: &str = "session-test";

    #[test]
    fn test_open_fresh_deletes_before_create() {
        let dir = TempDir::new().unwrap();
        let (recorder, shim) = recording_shim(dir.path(), Platform::Modern);

        let session = Session::open_fresh(&shim, CONTAINER, ProviderType::RSA_FULL).unwrap();
        assert_eq!(session.container(), Some(CONTAINER));
        session.close().unwrap();
        assert!(recorder.inner().container_exists(CONTAINER));

        // The leftover container is removed, not collided with
        let session = Session::open_fresh(&shim, CONTAINER, ProviderType::RSA_FULL).unwrap();
        session.close_and_reclaim().unwrap();
        assert!(!recorder.inner().container_exists(CONTAINER));

        assert_eq!(
            recorder.kinds(),
            vec![
                OpKind::Acquire(AcquireMode::DeleteKeyset),
                OpKind::Acquire(AcquireMode::NewKeyset),
                OpKind::Release,
                OpKind::Acquire(AcquireMode::DeleteKeyset),
                OpKind::Acquire(AcquireMode::NewKeyset),
                OpKind::Release,
                OpKind::Acquire(AcquireMode::DeleteKeyset),
            ]
        );
    }

    #[test]
    fn test_open_fresh_failure_is_provider_error() {
        let dir = TempDir::new().unwrap();
        let (recorder, shim) = recording_shim(dir.path(), Platform::Modern);
        recorder.fail_on(
            OpKind::Acquire(AcquireMode::NewKeyset),
            ProviderCode::BAD_KEYSET_PARAM,
        );

        let err = Session::open_fresh(&shim, CONTAINER, ProviderType::RSA_FULL).unwrap_err();
        assert_eq!(err.to_string(), "acquire context failed with error code 0x8009001F");
        assert!(!recorder.kinds().contains(&OpKind::Release));
    }

    #[test]
    fn test_drop_cascade_order() {
        let dir = TempDir::new().unwrap();
        let (recorder, shim) = recording_shim(dir.path(), Platform::Modern);

        {
            let session = Session::open_fresh(&shim, CONTAINER, ProviderType::RSA_FULL).unwrap();
            let _key = session.generate_key(KeySpec::Signature, true).unwrap();
            let hash = session.create_hash(AlgId::MD5).unwrap();
            hash.feed(b"data").unwrap();
            recorder.reset();
        }

        assert_eq!(
            recorder.kinds(),
            vec![
                OpKind::DestroyHash,
                OpKind::DestroyKey,
                OpKind::Release,
                OpKind::Acquire(AcquireMode::DeleteKeyset),
            ]
        );
        assert!(!recorder.inner().container_exists(CONTAINER));
    }

    #[test]
    fn test_release_failure_is_reported_once() {
        let dir = TempDir::new().unwrap();
        let (recorder, shim) = recording_shim(dir.path(), Platform::Modern);
        let session = Session::open_verify(&shim, ProviderType::RSA_AES).unwrap();
        assert_eq!(session.container(), None);

        recorder.fail_on(OpKind::Release, ProviderCode::BAD_UID);
        let err = session.close().unwrap_err();
        assert_eq!(err.diagnostic_code(), Some(0x8009_0001));

        let releases = recorder
            .kinds()
            .into_iter()
            .filter(|kind| *kind == OpKind::Release)
            .count();
        assert_eq!(releases, 1);
    }

    #[test]
    fn test_destroy_failure_does_not_retry_on_drop() {
        let dir = TempDir::new().unwrap();
        let (recorder, shim) = recording_shim(dir.path(), Platform::Modern);
        let session = Session::open_fresh(&shim, CONTAINER, ProviderType::RSA_FULL).unwrap();
        let key = session.generate_key(KeySpec::KeyExchange, true).unwrap();

        recorder.fail_on(OpKind::DestroyKey, ProviderCode::BAD_KEY);
        let err = key.destroy().unwrap_err();
        assert_eq!(err.to_string(), "destroy key failed with error code 0x80090003");
        recorder.clear_failure(OpKind::DestroyKey);

        session.close_and_reclaim().unwrap();
        let destroys = recorder
            .kinds()
            .into_iter()
            .filter(|kind| *kind == OpKind::DestroyKey)
            .count();
        assert_eq!(destroys, 1);
    }

    #[test]
    fn test_export_respects_limit() {
        let dir = TempDir::new().unwrap();
        let (recorder, shim) = recording_shim(dir.path(), Platform::Modern);
        let session = Session::open_fresh(&shim, CONTAINER, ProviderType::RSA_FULL).unwrap();
        let key = session.generate_key(KeySpec::Signature, true).unwrap();
        assert_eq!(key.spec().unwrap(), KeySpec::Signature);

        let public = key.export(BlobType::PublicKey, store::KEY_SIZE_LIMIT).unwrap();
        recorder.reset();

        let exact = key.export(BlobType::PublicKey, public.len()).unwrap();
        assert_eq!(exact.len(), public.len());

        let err = key.export(BlobType::PublicKey, public.len() - 1).unwrap_err();
        assert!(matches!(
            err,
            Error::SizeLimitExceeded {
                artifact: Artifact::Key,
                ..
            }
        ));

        // Over the ceiling only the size query reaches the provider
        let journal = recorder.journal();
        assert_eq!(journal.len(), 3);
        assert_eq!(
            journal[2],
            crate::test_utils::Op::ExportKey {
                blob_type: BlobType::PublicKey,
                query: true
            }
        );
    }
}
