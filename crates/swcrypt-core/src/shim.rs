//! Provider capability shim
//!
//! The provider exposes two calling conventions for its text-taking entry
//! points: narrow single-byte text on legacy platforms and UTF-16 on modern
//! ones. [`ProviderShim::bind`] picks the [`TextConvention`] once from the
//! [`Platform`]; afterwards callers only ever pass `&str`.

use std::fmt;
use std::sync::Arc;

use crate::platform::Platform;
use crate::provider::{
    AcquireMode, ContextHandle, CryptoProvider, HashHandle, KeyHandle, KeySpec, ProviderCode,
    ProviderResult, ProviderText, ProviderType,
};

/// Encoding used for text arguments of provider calls
pub trait TextConvention: Send + Sync + fmt::Debug {
    /// Short name of the convention
    fn name(&self) -> &'static str;

    /// Encode `text` for the provider
    fn encode(&self, text: &str) -> ProviderResult<ProviderText>;
}

/// Single-byte (ANSI / Latin-1) text
#[derive(Debug, Clone, Copy, Default)]
pub struct Narrow;

impl TextConvention for Narrow {
    fn name(&self) -> &'static str {
        "narrow"
    }

    fn encode(&self, text: &str) -> ProviderResult<ProviderText> {
        text.chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| ProviderCode::NO_UNICODE_TRANSLATION))
            .collect::<ProviderResult<Vec<u8>>>()
            .map(ProviderText::Narrow)
    }
}

/// UTF-16 text
#[derive(Debug, Clone, Copy, Default)]
pub struct Wide;

impl TextConvention for Wide {
    fn name(&self) -> &'static str {
        "wide"
    }

    fn encode(&self, text: &str) -> ProviderResult<ProviderText> {
        Ok(ProviderText::Wide(text.encode_utf16().collect()))
    }
}

/// A provider bound to the calling convention of one platform
#[derive(Clone)]
pub struct ProviderShim {
    platform: Platform,
    convention: Arc<dyn TextConvention>,
    provider: Arc<dyn CryptoProvider>,
}

impl fmt::Debug for ProviderShim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderShim")
            .field("platform", &self.platform)
            .field("convention", &self.convention.name())
            .finish_non_exhaustive()
    }
}

impl ProviderShim {
    /// Bind `provider` with the convention `platform` requires
    pub fn bind(platform: Platform, provider: Arc<dyn CryptoProvider>) -> Self {
        let convention: Arc<dyn TextConvention> = match platform {
            Platform::Legacy => Arc::new(Narrow),
            Platform::Modern => Arc::new(Wide),
        };
        log::debug!(
            "Bound provider with {} text convention for {} platform",
            convention.name(),
            platform
        );
        Self {
            platform,
            convention,
            provider,
        }
    }

    /// Platform the shim was bound for
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Name of the selected text convention
    pub fn convention(&self) -> &'static str {
        self.convention.name()
    }

    /// The underlying provider, for capabilities that take no text
    pub fn provider(&self) -> &dyn CryptoProvider {
        self.provider.as_ref()
    }

    fn encode_opt(&self, text: Option<&str>) -> ProviderResult<Option<ProviderText>> {
        text.map(|t| self.convention.encode(t)).transpose()
    }

    /// Acquire a context, encoding the container name
    pub fn acquire_context(
        &self,
        container: Option<&str>,
        provider_type: ProviderType,
        mode: AcquireMode,
    ) -> ProviderResult<Option<ContextHandle>> {
        let container = self.encode_opt(container)?;
        self.provider
            .acquire_context(container.as_ref(), provider_type, mode)
    }

    /// Sign a hash, encoding the optional description
    pub fn sign_hash(
        &self,
        hash: HashHandle,
        spec: KeySpec,
        description: Option<&str>,
        out: Option<&mut [u8]>,
    ) -> ProviderResult<usize> {
        let description = self.encode_opt(description)?;
        self.provider
            .sign_hash(hash, spec, description.as_ref(), out)
    }

    /// Verify a signature, encoding the optional description
    pub fn verify_signature(
        &self,
        hash: HashHandle,
        signature: &[u8],
        key: KeyHandle,
        description: Option<&str>,
    ) -> ProviderResult<()> {
        let description = self.encode_opt(description)?;
        self.provider
            .verify_signature(hash, signature, key, description.as_ref())
    }
}
