//! Test utilities for exercising provider sessions
//!
//! [`RecordingProvider`] wraps another [`CryptoProvider`], journals every
//! call it receives and can be told to fail a chosen capability, which makes
//! teardown order and policy gates observable from tests.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::platform::Platform;
use crate::provider::{
    AcquireMode, AlgId, BlobType, ContextHandle, CryptoProvider, HashHandle, KeyHandle, KeySpec,
    ProviderCode, ProviderResult, ProviderText, ProviderType, SoftCsp,
};
use crate::shim::ProviderShim;

/// Key size used for generated keys in tests
pub const TEST_KEY_BITS: usize = 1024;

/// A [`SoftCsp`] with test-sized keys, wrapped in a [`RecordingProvider`] and
/// bound for `platform`
pub fn recording_shim<P: Into<PathBuf>>(
    container_dir: P,
    platform: Platform,
) -> (Arc<RecordingProvider<SoftCsp>>, ProviderShim) {
    let recorder = Arc::new(RecordingProvider::new(SoftCsp::with_key_bits(
        container_dir,
        TEST_KEY_BITS,
    )));
    let shim = ProviderShim::bind(platform, recorder.clone());
    (recorder, shim)
}

/// One journaled provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// `acquire_context`
    Acquire {
        /// Container name as encoded by the shim
        container: Option<ProviderText>,
        /// Requested provider type
        provider_type: ProviderType,
        /// Requested mode
        mode: AcquireMode,
    },
    /// `release_context`
    Release(ContextHandle),
    /// `generate_key`
    GenerateKey(KeySpec),
    /// `import_key`
    ImportKey,
    /// `export_key`; `query` is true for size queries
    ExportKey {
        /// Requested blob type
        blob_type: BlobType,
        /// Size query rather than real export
        query: bool,
    },
    /// `key_spec`
    KeySpec(KeyHandle),
    /// `destroy_key`
    DestroyKey(KeyHandle),
    /// `create_hash`
    CreateHash(AlgId),
    /// `hash_data` with the chunk length
    HashData(usize),
    /// `destroy_hash`
    DestroyHash(HashHandle),
    /// `sign_hash`; `query` is true for size queries
    SignHash {
        /// Key slot used
        spec: KeySpec,
        /// Size query rather than real signature
        query: bool,
    },
    /// `verify_signature`
    Verify,
}

/// Capability selector for fault injection and journal filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// `acquire_context` in the given mode
    Acquire(AcquireMode),
    /// `release_context`
    Release,
    /// `generate_key`
    GenerateKey,
    /// `import_key`
    ImportKey,
    /// `export_key` of the given blob type
    ExportKey(BlobType),
    /// `key_spec`
    KeySpec,
    /// `destroy_key`
    DestroyKey,
    /// `create_hash`
    CreateHash,
    /// `hash_data`
    HashData,
    /// `destroy_hash`
    DestroyHash,
    /// `sign_hash`
    SignHash,
    /// `verify_signature`
    Verify,
}

impl Op {
    /// The capability this call belongs to
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Acquire { mode, .. } => OpKind::Acquire(*mode),
            Op::Release(_) => OpKind::Release,
            Op::GenerateKey(_) => OpKind::GenerateKey,
            Op::ImportKey => OpKind::ImportKey,
            Op::ExportKey { blob_type, .. } => OpKind::ExportKey(*blob_type),
            Op::KeySpec(_) => OpKind::KeySpec,
            Op::DestroyKey(_) => OpKind::DestroyKey,
            Op::CreateHash(_) => OpKind::CreateHash,
            Op::HashData(_) => OpKind::HashData,
            Op::DestroyHash(_) => OpKind::DestroyHash,
            Op::SignHash { .. } => OpKind::SignHash,
            Op::Verify => OpKind::Verify,
        }
    }
}

/// Journaling, fault-injecting provider wrapper
#[derive(Debug)]
pub struct RecordingProvider<P> {
    inner: P,
    journal: Mutex<Vec<Op>>,
    failures: Mutex<Vec<(OpKind, ProviderCode)>>,
}

impl<P: CryptoProvider> RecordingProvider<P> {
    /// Wrap `inner`
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            journal: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Make every call of `kind` fail with `code` without reaching the inner provider
    pub fn fail_on(&self, kind: OpKind, code: ProviderCode) {
        self.failures.lock().push((kind, code));
    }

    /// Stop failing calls of `kind`
    pub fn clear_failure(&self, kind: OpKind) {
        self.failures.lock().retain(|(k, _)| *k != kind);
    }

    /// Snapshot of every call received so far
    pub fn journal(&self) -> Vec<Op> {
        self.journal.lock().clone()
    }

    /// Journal reduced to capability kinds, with consecutive `HashData` calls collapsed
    pub fn kinds(&self) -> Vec<OpKind> {
        let mut kinds: Vec<OpKind> = Vec::new();
        for op in self.journal.lock().iter() {
            let kind = op.kind();
            if kind == OpKind::HashData && kinds.last() == Some(&OpKind::HashData) {
                continue;
            }
            kinds.push(kind);
        }
        kinds
    }

    /// Forget the journal
    pub fn reset(&self) {
        self.journal.lock().clear();
    }

    /// The wrapped provider
    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn record(&self, op: Op) -> ProviderResult<()> {
        let kind = op.kind();
        self.journal.lock().push(op);
        match self.failures.lock().iter().find(|(k, _)| *k == kind) {
            Some((_, code)) => Err(*code),
            None => Ok(()),
        }
    }
}

impl<P: CryptoProvider> CryptoProvider for RecordingProvider<P> {
    fn acquire_context(
        &self,
        container: Option<&ProviderText>,
        provider_type: ProviderType,
        mode: AcquireMode,
    ) -> ProviderResult<Option<ContextHandle>> {
        self.record(Op::Acquire {
            container: container.cloned(),
            provider_type,
            mode,
        })?;
        self.inner.acquire_context(container, provider_type, mode)
    }

    fn release_context(&self, context: ContextHandle) -> ProviderResult<()> {
        self.record(Op::Release(context))?;
        self.inner.release_context(context)
    }

    fn generate_key(
        &self,
        context: ContextHandle,
        spec: KeySpec,
        exportable: bool,
    ) -> ProviderResult<KeyHandle> {
        self.record(Op::GenerateKey(spec))?;
        self.inner.generate_key(context, spec, exportable)
    }

    fn import_key(&self, context: ContextHandle, blob: &[u8]) -> ProviderResult<KeyHandle> {
        self.record(Op::ImportKey)?;
        self.inner.import_key(context, blob)
    }

    fn export_key(
        &self,
        key: KeyHandle,
        blob_type: BlobType,
        out: Option<&mut [u8]>,
    ) -> ProviderResult<usize> {
        self.record(Op::ExportKey {
            blob_type,
            query: out.is_none(),
        })?;
        self.inner.export_key(key, blob_type, out)
    }

    fn key_spec(&self, key: KeyHandle) -> ProviderResult<KeySpec> {
        self.record(Op::KeySpec(key))?;
        self.inner.key_spec(key)
    }

    fn destroy_key(&self, key: KeyHandle) -> ProviderResult<()> {
        self.record(Op::DestroyKey(key))?;
        self.inner.destroy_key(key)
    }

    fn create_hash(&self, context: ContextHandle, algorithm: AlgId) -> ProviderResult<HashHandle> {
        self.record(Op::CreateHash(algorithm))?;
        self.inner.create_hash(context, algorithm)
    }

    fn hash_data(&self, hash: HashHandle, data: &[u8]) -> ProviderResult<()> {
        self.record(Op::HashData(data.len()))?;
        self.inner.hash_data(hash, data)
    }

    fn destroy_hash(&self, hash: HashHandle) -> ProviderResult<()> {
        self.record(Op::DestroyHash(hash))?;
        self.inner.destroy_hash(hash)
    }

    fn sign_hash(
        &self,
        hash: HashHandle,
        spec: KeySpec,
        description: Option<&ProviderText>,
        out: Option<&mut [u8]>,
    ) -> ProviderResult<usize> {
        self.record(Op::SignHash {
            spec,
            query: out.is_none(),
        })?;
        self.inner.sign_hash(hash, spec, description, out)
    }

    fn verify_signature(
        &self,
        hash: HashHandle,
        signature: &[u8],
        key: KeyHandle,
        description: Option<&ProviderText>,
    ) -> ProviderResult<()> {
        self.record(Op::Verify)?;
        self.inner
            .verify_signature(hash, signature, key, description)
    }
}
