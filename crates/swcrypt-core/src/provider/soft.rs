//! Software cryptographic service provider
//!
//! Implements [`CryptoProvider`] on top of the RustCrypto `rsa` and digest
//! crates, reproducing CryptoAPI semantics closely enough that blobs and
//! signatures are interchangeable with a native CSP: little-endian
//! signatures, PKCS#1 v1.5 padding with DigestInfo prefixes, and keys kept in
//! named containers that outlive the process.

use log::{debug, trace};
use parking_lot::Mutex;
use rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::digest::DynDigest;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::blob::{self, DecodedKey};
use super::container::ContainerStore;
use super::{
    AcquireMode, AlgId, BlobType, ContextHandle, CryptoProvider, HashHandle, KeyHandle, KeySpec,
    ProviderCode, ProviderResult, ProviderText, ProviderType,
};

/// DER DigestInfo prefixes (RFC 8017 section 9.2, note 1)
const MD2_PREFIX: &[u8] = &[
    0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02, 0x02, 0x05, 0x00,
    0x04, 0x10,
];
const MD4_PREFIX: &[u8] = &[
    0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02, 0x04, 0x05, 0x00,
    0x04, 0x10,
];
const MD5_PREFIX: &[u8] = &[
    0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02, 0x05, 0x05, 0x00,
    0x04, 0x10,
];
const SHA1_PREFIX: &[u8] = &[
    0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14,
];
const SHA256_PREFIX: &[u8] = &[
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];
const SHA384_PREFIX: &[u8] = &[
    0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x02, 0x05,
    0x00, 0x04, 0x30,
];
const SHA512_PREFIX: &[u8] = &[
    0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03, 0x05,
    0x00, 0x04, 0x40,
];

/// Default RSA modulus size for generated keys
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Software CSP with file-backed key containers
#[derive(Debug)]
pub struct SoftCsp {
    containers: ContainerStore,
    key_bits: usize,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    next_handle: u64,
    contexts: HashMap<u64, Context>,
    keys: HashMap<u64, KeyEntry>,
    hashes: HashMap<u64, HashEntry>,
}

impl State {
    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

#[derive(Debug)]
struct Context {
    /// `None` for verify contexts
    container: Option<String>,
    provider_type: ProviderType,
    slots: HashMap<KeySpec, RsaPrivateKey>,
}

#[derive(Debug)]
enum KeyMaterial {
    Public(RsaPublicKey),
    Private {
        key: RsaPrivateKey,
        exportable: bool,
    },
}

impl KeyMaterial {
    fn public_key(&self) -> RsaPublicKey {
        match self {
            KeyMaterial::Public(key) => key.clone(),
            KeyMaterial::Private { key, .. } => key.to_public_key(),
        }
    }
}

#[derive(Debug)]
struct KeyEntry {
    context: u64,
    spec: KeySpec,
    material: KeyMaterial,
}

struct HashEntry {
    context: u64,
    algorithm: AlgId,
    state: HashState,
}

impl std::fmt::Debug for HashEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashEntry")
            .field("context", &self.context)
            .field("algorithm", &self.algorithm)
            .field("finalized", &matches!(self.state, HashState::Finalized(_)))
            .finish()
    }
}

enum HashState {
    Open(Box<dyn DynDigest + Send>),
    Finalized(Box<[u8]>),
}

impl HashEntry {
    /// Finalize on first use and return the digest
    fn digest(&mut self) -> &[u8] {
        if let HashState::Open(hasher) = &mut self.state {
            let digest = hasher.finalize_reset();
            self.state = HashState::Finalized(digest);
        }
        match &self.state {
            HashState::Finalized(digest) => digest,
            HashState::Open(_) => &[],
        }
    }
}

fn new_hasher(algorithm: AlgId) -> Option<Box<dyn DynDigest + Send>> {
    let hasher: Box<dyn DynDigest + Send> = match algorithm {
        AlgId::MD2 => Box::new(md2::Md2::default()),
        AlgId::MD4 => Box::new(md4::Md4::default()),
        AlgId::MD5 => Box::new(md5::Md5::default()),
        AlgId::SHA1 => Box::new(sha1::Sha1::default()),
        AlgId::SHA_256 => Box::new(sha2::Sha256::default()),
        AlgId::SHA_384 => Box::new(sha2::Sha384::default()),
        AlgId::SHA_512 => Box::new(sha2::Sha512::default()),
        _ => return None,
    };
    Some(hasher)
}

fn signature_scheme(algorithm: AlgId) -> ProviderResult<Pkcs1v15Sign> {
    let (prefix, hash_len) = match algorithm {
        AlgId::MD2 => (MD2_PREFIX, 16),
        AlgId::MD4 => (MD4_PREFIX, 16),
        AlgId::MD5 => (MD5_PREFIX, 16),
        AlgId::SHA1 => (SHA1_PREFIX, 20),
        AlgId::SHA_256 => (SHA256_PREFIX, 32),
        AlgId::SHA_384 => (SHA384_PREFIX, 48),
        AlgId::SHA_512 => (SHA512_PREFIX, 64),
        _ => return Err(ProviderCode::BAD_ALGID),
    };
    Ok(Pkcs1v15Sign {
        hash_len: Some(hash_len),
        prefix: prefix.into(),
    })
}

fn supports(provider_type: ProviderType, algorithm: AlgId) -> bool {
    match provider_type {
        ProviderType::RSA_FULL => matches!(
            algorithm,
            AlgId::MD2 | AlgId::MD4 | AlgId::MD5 | AlgId::SHA1
        ),
        ProviderType::RSA_AES => new_hasher(algorithm).is_some(),
        _ => false,
    }
}

impl SoftCsp {
    /// Create a provider keeping its containers under `container_dir`
    pub fn new<P: Into<PathBuf>>(container_dir: P) -> Self {
        Self::with_key_bits(container_dir, DEFAULT_KEY_BITS)
    }

    /// Create a provider generating keys of `key_bits` bits
    pub fn with_key_bits<P: Into<PathBuf>>(container_dir: P, key_bits: usize) -> Self {
        Self {
            containers: ContainerStore::new(container_dir),
            key_bits,
            state: Mutex::new(State::default()),
        }
    }

    /// Directory holding the persisted containers
    pub fn container_dir(&self) -> &Path {
        self.containers.root()
    }

    /// Size of generated keys in bits
    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    /// Check whether a named container is currently persisted
    pub fn container_exists(&self, name: &str) -> bool {
        self.containers.exists(name)
    }

    fn persist(&self, context: &Context) -> ProviderResult<()> {
        let Some(name) = &context.container else {
            return Ok(());
        };
        let mut entries = Vec::with_capacity(context.slots.len());
        for (spec, key) in &context.slots {
            entries.push((*spec, blob::encode_private(*spec, key)?));
        }
        // Stable order on disk
        entries.sort_by_key(|(spec, _)| spec.value());
        self.containers.store(name, &entries)
    }

    fn load_slots(&self, name: &str) -> ProviderResult<HashMap<KeySpec, RsaPrivateKey>> {
        let mut slots = HashMap::new();
        for (spec, data) in self.containers.load(name)? {
            match blob::decode(&data)? {
                DecodedKey::Private { key, .. } => {
                    slots.insert(spec, key);
                }
                DecodedKey::Public { .. } => return Err(ProviderCode::BAD_KEYSET_PARAM),
            }
        }
        Ok(slots)
    }
}

impl CryptoProvider for SoftCsp {
    fn acquire_context(
        &self,
        container: Option<&ProviderText>,
        provider_type: ProviderType,
        mode: AcquireMode,
    ) -> ProviderResult<Option<ContextHandle>> {
        if provider_type != ProviderType::RSA_FULL && provider_type != ProviderType::RSA_AES {
            return Err(ProviderCode::BAD_PROV_TYPE);
        }

        let name = container.map(ProviderText::decode).transpose()?;

        let context = match (mode, name) {
            (AcquireMode::VerifyContext, None) => Context {
                container: None,
                provider_type,
                slots: HashMap::new(),
            },
            (AcquireMode::VerifyContext, Some(_)) => return Err(ProviderCode::BAD_FLAGS),
            (_, None) => return Err(ProviderCode::BAD_KEYSET_PARAM),
            (AcquireMode::DeleteKeyset, Some(name)) => {
                self.containers.delete(&name)?;
                return Ok(None);
            }
            (AcquireMode::NewKeyset, Some(name)) => {
                self.containers.create(&name)?;
                Context {
                    container: Some(name),
                    provider_type,
                    slots: HashMap::new(),
                }
            }
            (AcquireMode::Open, Some(name)) => {
                let slots = self.load_slots(&name)?;
                Context {
                    container: Some(name),
                    provider_type,
                    slots,
                }
            }
        };

        let mut state = self.state.lock();
        let handle = state.allocate();
        debug!(
            "Acquired context {} ({:?}, {}, {:?})",
            handle,
            context.container,
            provider_type.name(),
            mode
        );
        state.contexts.insert(handle, context);
        Ok(Some(ContextHandle(handle)))
    }

    fn release_context(&self, context: ContextHandle) -> ProviderResult<()> {
        let mut state = self.state.lock();
        state
            .contexts
            .remove(&context.0)
            .ok_or(ProviderCode::BAD_UID)?;
        state.keys.retain(|_, key| key.context != context.0);
        state.hashes.retain(|_, hash| hash.context != context.0);
        debug!("Released context {}", context.0);
        Ok(())
    }

    fn generate_key(
        &self,
        context: ContextHandle,
        spec: KeySpec,
        exportable: bool,
    ) -> ProviderResult<KeyHandle> {
        {
            let state = self.state.lock();
            let ctx = state.contexts.get(&context.0).ok_or(ProviderCode::BAD_UID)?;
            if ctx.container.is_none() {
                // Verify contexts cannot hold private keys
                return Err(ProviderCode::BAD_FLAGS);
            }
        }

        debug!("Generating {}-bit RSA key pair", self.key_bits);
        let key = RsaPrivateKey::new(&mut OsRng, self.key_bits).map_err(|_| ProviderCode::FAIL)?;

        let mut state = self.state.lock();
        let ctx = state
            .contexts
            .get_mut(&context.0)
            .ok_or(ProviderCode::BAD_UID)?;
        ctx.slots.insert(spec, key.clone());
        self.persist(ctx)?;

        let handle = state.allocate();
        state.keys.insert(
            handle,
            KeyEntry {
                context: context.0,
                spec,
                material: KeyMaterial::Private { key, exportable },
            },
        );
        Ok(KeyHandle(handle))
    }

    fn import_key(&self, context: ContextHandle, data: &[u8]) -> ProviderResult<KeyHandle> {
        let decoded = blob::decode(data)?;

        let mut state = self.state.lock();
        let ctx = state
            .contexts
            .get_mut(&context.0)
            .ok_or(ProviderCode::BAD_UID)?;

        let entry = match decoded {
            DecodedKey::Public { spec, key } => KeyEntry {
                context: context.0,
                spec,
                material: KeyMaterial::Public(key),
            },
            DecodedKey::Private { spec, key } => {
                if ctx.container.is_some() {
                    ctx.slots.insert(spec, key.clone());
                    self.persist(ctx)?;
                }
                KeyEntry {
                    context: context.0,
                    spec,
                    material: KeyMaterial::Private {
                        key,
                        exportable: false,
                    },
                }
            }
        };

        let handle = state.allocate();
        trace!("Imported {:?} key as handle {}", entry.spec, handle);
        state.keys.insert(handle, entry);
        Ok(KeyHandle(handle))
    }

    fn export_key(
        &self,
        key: KeyHandle,
        blob_type: BlobType,
        out: Option<&mut [u8]>,
    ) -> ProviderResult<usize> {
        let state = self.state.lock();
        let entry = state.keys.get(&key.0).ok_or(ProviderCode::BAD_UID)?;

        let data = match (blob_type, &entry.material) {
            (BlobType::PublicKey, material) => {
                blob::encode_public(entry.spec, &material.public_key())?
            }
            (
                BlobType::PrivateKey,
                KeyMaterial::Private {
                    key,
                    exportable: true,
                },
            ) => blob::encode_private(entry.spec, key)?,
            (BlobType::PrivateKey, _) => return Err(ProviderCode::BAD_KEY_STATE),
        };

        match out {
            None => Ok(data.len()),
            Some(buffer) if buffer.len() < data.len() => Err(ProviderCode::MORE_DATA),
            Some(buffer) => {
                buffer[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
        }
    }

    fn key_spec(&self, key: KeyHandle) -> ProviderResult<KeySpec> {
        let state = self.state.lock();
        state
            .keys
            .get(&key.0)
            .map(|entry| entry.spec)
            .ok_or(ProviderCode::BAD_UID)
    }

    fn destroy_key(&self, key: KeyHandle) -> ProviderResult<()> {
        let mut state = self.state.lock();
        state
            .keys
            .remove(&key.0)
            .map(|_| ())
            .ok_or(ProviderCode::BAD_UID)
    }

    fn create_hash(&self, context: ContextHandle, algorithm: AlgId) -> ProviderResult<HashHandle> {
        let mut state = self.state.lock();
        let ctx = state.contexts.get(&context.0).ok_or(ProviderCode::BAD_UID)?;
        if !supports(ctx.provider_type, algorithm) {
            return Err(ProviderCode::BAD_ALGID);
        }
        let hasher = new_hasher(algorithm).ok_or(ProviderCode::BAD_ALGID)?;

        let handle = state.allocate();
        state.hashes.insert(
            handle,
            HashEntry {
                context: context.0,
                algorithm,
                state: HashState::Open(hasher),
            },
        );
        trace!("Created {} hash object {}", algorithm, handle);
        Ok(HashHandle(handle))
    }

    fn hash_data(&self, hash: HashHandle, data: &[u8]) -> ProviderResult<()> {
        let mut state = self.state.lock();
        let entry = state.hashes.get_mut(&hash.0).ok_or(ProviderCode::BAD_HASH)?;
        match &mut entry.state {
            HashState::Open(hasher) => {
                hasher.update(data);
                Ok(())
            }
            HashState::Finalized(_) => Err(ProviderCode::BAD_HASH_STATE),
        }
    }

    fn destroy_hash(&self, hash: HashHandle) -> ProviderResult<()> {
        let mut state = self.state.lock();
        state
            .hashes
            .remove(&hash.0)
            .map(|_| ())
            .ok_or(ProviderCode::BAD_HASH)
    }

    fn sign_hash(
        &self,
        hash: HashHandle,
        spec: KeySpec,
        description: Option<&ProviderText>,
        out: Option<&mut [u8]>,
    ) -> ProviderResult<usize> {
        if let Some(description) = description {
            trace!("Signing with description {:?}", description.decode()?);
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let entry = state.hashes.get_mut(&hash.0).ok_or(ProviderCode::BAD_HASH)?;
        let ctx = state
            .contexts
            .get(&entry.context)
            .ok_or(ProviderCode::BAD_UID)?;
        let key = ctx.slots.get(&spec).ok_or(ProviderCode::NO_KEY)?;

        let size = key.size();
        let buffer = match out {
            None => return Ok(size),
            Some(buffer) if buffer.len() < size => return Err(ProviderCode::MORE_DATA),
            Some(buffer) => buffer,
        };

        let scheme = signature_scheme(entry.algorithm)?;
        let digest = entry.digest();
        let mut signature = key
            .sign_with_rng(&mut OsRng, scheme, digest)
            .map_err(|_| ProviderCode::BAD_LEN)?;
        // CryptoAPI emits signatures least-significant byte first
        signature.reverse();
        buffer[..signature.len()].copy_from_slice(&signature);
        Ok(signature.len())
    }

    fn verify_signature(
        &self,
        hash: HashHandle,
        signature: &[u8],
        key: KeyHandle,
        description: Option<&ProviderText>,
    ) -> ProviderResult<()> {
        if let Some(description) = description {
            trace!("Verifying with description {:?}", description.decode()?);
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let public_key = state
            .keys
            .get(&key.0)
            .ok_or(ProviderCode::BAD_UID)?
            .material
            .public_key();
        let entry = state.hashes.get_mut(&hash.0).ok_or(ProviderCode::BAD_HASH)?;
        let scheme = signature_scheme(entry.algorithm)?;
        let digest = entry.digest();

        if signature.len() != public_key.size() {
            return Err(ProviderCode::BAD_SIGNATURE);
        }
        let mut big_endian = signature.to_vec();
        big_endian.reverse();

        public_key
            .verify(scheme, digest, &big_endian)
            .map_err(|_| ProviderCode::BAD_SIGNATURE)
    }
}
