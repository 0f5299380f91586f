//! Cryptographic service provider capabilities
//!
//! [`CryptoProvider`] is the capability set the session layer sequences:
//! context acquisition against named key containers, key generation, blob
//! import/export, hash objects, and signing/verification of finalized hashes.
//! Every capability reports failure as a [`ProviderCode`], the
//! platform-specific diagnostic value shown to the user.
//!
//! Text arguments (container names, signature descriptions) arrive already
//! encoded as [`ProviderText`]; choosing the encoding is the job of
//! [`crate::shim::ProviderShim`].
//!
//! [`SoftCsp`] is the bundled implementation.

mod blob;
mod container;
mod soft;

pub use soft::{DEFAULT_KEY_BITS, SoftCsp};

use std::fmt;
use std::io;

/// Diagnostic code reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderCode(pub u32);

impl ProviderCode {
    /// Bad UID / stale handle
    pub const BAD_UID: Self = Self(0x8009_0001);
    /// Bad hash object
    pub const BAD_HASH: Self = Self(0x8009_0002);
    /// Bad key
    pub const BAD_KEY: Self = Self(0x8009_0003);
    /// Bad length
    pub const BAD_LEN: Self = Self(0x8009_0004);
    /// Bad data
    pub const BAD_DATA: Self = Self(0x8009_0005);
    /// Invalid signature
    pub const BAD_SIGNATURE: Self = Self(0x8009_0006);
    /// Bad blob version
    pub const BAD_VER: Self = Self(0x8009_0007);
    /// Invalid algorithm specified
    pub const BAD_ALGID: Self = Self(0x8009_0008);
    /// Invalid flags specified
    pub const BAD_FLAGS: Self = Self(0x8009_0009);
    /// Invalid type specified
    pub const BAD_TYPE: Self = Self(0x8009_000A);
    /// Key not valid for use in the specified state
    pub const BAD_KEY_STATE: Self = Self(0x8009_000B);
    /// Hash not valid for use in the specified state
    pub const BAD_HASH_STATE: Self = Self(0x8009_000C);
    /// Key does not exist
    pub const NO_KEY: Self = Self(0x8009_000D);
    /// Object already exists
    pub const EXISTS: Self = Self(0x8009_000F);
    /// Invalid provider type specified
    pub const BAD_PROV_TYPE: Self = Self(0x8009_0014);
    /// Keyset does not exist
    pub const BAD_KEYSET: Self = Self(0x8009_0016);
    /// Keyset parameter invalid
    pub const BAD_KEYSET_PARAM: Self = Self(0x8009_001F);
    /// Internal provider failure
    pub const FAIL: Self = Self(0x8009_0020);
    /// Output buffer too small
    pub const MORE_DATA: Self = Self(0xEA);
    /// Text not representable in the target code page
    pub const NO_UNICODE_TRANSLATION: Self = Self(0x459);

    /// Raw code value
    pub fn value(self) -> u32 {
        self.0
    }

    /// Whether this code is the provider's "signature does not match" verdict
    pub fn is_signature_mismatch(self) -> bool {
        self == Self::BAD_SIGNATURE
    }

    /// Map a file-system failure inside the provider to a code
    pub(crate) fn from_io(error: &io::Error) -> Self {
        error
            .raw_os_error()
            .map_or(Self::FAIL, |code| Self(code as u32))
    }
}

impl fmt::Display for ProviderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#X}", self.0)
    }
}

/// Result type for provider capabilities
pub type ProviderResult<T> = std::result::Result<T, ProviderCode>;

/// Provider type a context is acquired for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderType(pub u32);

impl ProviderType {
    /// Full RSA provider (MD2, MD4, MD5, SHA-1)
    pub const RSA_FULL: Self = Self(1);
    /// RSA + AES provider (adds the SHA-2 family)
    pub const RSA_AES: Self = Self(24);

    /// Short display name
    pub fn name(self) -> &'static str {
        match self {
            Self::RSA_FULL => "PROV_RSA_FULL",
            Self::RSA_AES => "PROV_RSA_AES",
            _ => "unknown",
        }
    }
}

/// Algorithm identifier (`CALG_*` values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlgId(pub u32);

impl AlgId {
    /// MD2
    pub const MD2: Self = Self(0x8001);
    /// MD4
    pub const MD4: Self = Self(0x8002);
    /// MD5
    pub const MD5: Self = Self(0x8003);
    /// SHA-1
    pub const SHA1: Self = Self(0x8004);
    /// SHA-256
    pub const SHA_256: Self = Self(0x800C);
    /// SHA-384
    pub const SHA_384: Self = Self(0x800D);
    /// SHA-512
    pub const SHA_512: Self = Self(0x800E);
    /// RSA signature key
    pub const RSA_SIGN: Self = Self(0x2400);
    /// RSA key exchange key
    pub const RSA_KEYX: Self = Self(0xA400);
}

impl fmt::Display for AlgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

/// Key slot inside a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySpec {
    /// `AT_KEYEXCHANGE`
    KeyExchange,
    /// `AT_SIGNATURE`
    Signature,
}

impl KeySpec {
    /// Numeric `AT_*` value
    pub fn value(self) -> u32 {
        match self {
            KeySpec::KeyExchange => 1,
            KeySpec::Signature => 2,
        }
    }

    /// Parse a numeric `AT_*` value
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(KeySpec::KeyExchange),
            2 => Some(KeySpec::Signature),
            _ => None,
        }
    }

    /// Key algorithm identifier stored in blobs for this slot
    pub fn key_algorithm(self) -> AlgId {
        match self {
            KeySpec::KeyExchange => AlgId::RSA_KEYX,
            KeySpec::Signature => AlgId::RSA_SIGN,
        }
    }
}

/// Blob flavour for key export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobType {
    /// `PUBLICKEYBLOB`
    PublicKey,
    /// `PRIVATEKEYBLOB`
    PrivateKey,
}

/// How a context is acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireMode {
    /// Open an existing key container
    Open,
    /// Create a new key container; fails if it exists
    NewKeyset,
    /// Delete the key container; yields no context
    DeleteKeyset,
    /// Container-less context for public-key work only
    VerifyContext,
}

/// Text argument encoded for one calling convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderText {
    /// Single-byte code page text
    Narrow(Vec<u8>),
    /// UTF-16 text
    Wide(Vec<u16>),
}

impl ProviderText {
    /// Decode back to a Rust string
    pub fn decode(&self) -> ProviderResult<String> {
        match self {
            ProviderText::Narrow(bytes) => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            ProviderText::Wide(units) => {
                String::from_utf16(units).map_err(|_| ProviderCode::NO_UNICODE_TRANSLATION)
            }
        }
    }
}

/// Handle to an acquired context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

/// Handle to a key owned by a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyHandle(pub u64);

/// Handle to a hash object owned by a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashHandle(pub u64);

/// The capability set of a cryptographic service provider.
///
/// Size-querying calls (`export_key`, `sign_hash`) return the required size
/// when `out` is `None`, and fail with [`ProviderCode::MORE_DATA`] when the
/// supplied buffer is too small.
pub trait CryptoProvider: Send + Sync {
    /// Acquire, create or delete a context. `DeleteKeyset` yields `None`.
    fn acquire_context(
        &self,
        container: Option<&ProviderText>,
        provider_type: ProviderType,
        mode: AcquireMode,
    ) -> ProviderResult<Option<ContextHandle>>;

    /// Release a context
    fn release_context(&self, context: ContextHandle) -> ProviderResult<()>;

    /// Generate a key pair into the context's `spec` slot
    fn generate_key(
        &self,
        context: ContextHandle,
        spec: KeySpec,
        exportable: bool,
    ) -> ProviderResult<KeyHandle>;

    /// Import a key blob
    fn import_key(&self, context: ContextHandle, blob: &[u8]) -> ProviderResult<KeyHandle>;

    /// Export a key blob, or query its size
    fn export_key(
        &self,
        key: KeyHandle,
        blob_type: BlobType,
        out: Option<&mut [u8]>,
    ) -> ProviderResult<usize>;

    /// Slot the key occupies
    fn key_spec(&self, key: KeyHandle) -> ProviderResult<KeySpec>;

    /// Destroy a key handle
    fn destroy_key(&self, key: KeyHandle) -> ProviderResult<()>;

    /// Create a hash object
    fn create_hash(&self, context: ContextHandle, algorithm: AlgId) -> ProviderResult<HashHandle>;

    /// Feed bytes into a hash object
    fn hash_data(&self, hash: HashHandle, data: &[u8]) -> ProviderResult<()>;

    /// Destroy a hash object
    fn destroy_hash(&self, hash: HashHandle) -> ProviderResult<()>;

    /// Sign the finalized hash with the key in `spec`, or query the size
    fn sign_hash(
        &self,
        hash: HashHandle,
        spec: KeySpec,
        description: Option<&ProviderText>,
        out: Option<&mut [u8]>,
    ) -> ProviderResult<usize>;

    /// Check `signature` against the finalized hash and `key`
    fn verify_signature(
        &self,
        hash: HashHandle,
        signature: &[u8],
        key: KeyHandle,
        description: Option<&ProviderText>,
    ) -> ProviderResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_display() {
        assert_eq!(ProviderCode::BAD_SIGNATURE.to_string(), "0x80090006");
        assert_eq!(ProviderCode::MORE_DATA.to_string(), "0xEA");
        assert!(ProviderCode::BAD_SIGNATURE.is_signature_mismatch());
        assert!(!ProviderCode::BAD_KEY.is_signature_mismatch());
    }

    #[test]
    fn test_key_spec_values() {
        assert_eq!(KeySpec::from_value(1), Some(KeySpec::KeyExchange));
        assert_eq!(KeySpec::from_value(2), Some(KeySpec::Signature));
        assert_eq!(KeySpec::from_value(3), None);
        assert_eq!(KeySpec::Signature.key_algorithm(), AlgId::RSA_SIGN);
    }

    #[test]
    fn test_text_decode() {
        let narrow = ProviderText::Narrow(b"container".to_vec());
        assert_eq!(narrow.decode().unwrap(), "container");

        let wide = ProviderText::Wide("ключ".encode_utf16().collect());
        assert_eq!(wide.decode().unwrap(), "ключ");

        let broken = ProviderText::Wide(vec![0xD800]);
        assert_eq!(broken.decode(), Err(ProviderCode::NO_UNICODE_TRANSLATION));
    }
}
