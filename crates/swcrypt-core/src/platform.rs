//! Legacy / modern platform probe

use log::debug;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Environment variable consulted by [`Platform::detect`]
pub const PLATFORM_ENV: &str = "SWCRYPT_PLATFORM";

/// Which provider calling convention and algorithm set the host supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// Narrow-text provider entry points, hash algorithms up to SHA-1 only
    Legacy,
    /// Wide-text provider entry points, every registered algorithm
    #[default]
    Modern,
}

impl Platform {
    /// Probe the host once. Call at process start and pass the value along.
    pub fn detect() -> Self {
        let probe = std::env::var(PLATFORM_ENV).ok();
        let platform = Self::from_probe(probe.as_deref());
        debug!("Detected {} platform", platform);
        platform
    }

    /// Interpret a probe value; unrecognized values fall back to modern
    pub fn from_probe(probe: Option<&str>) -> Self {
        probe
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or_default()
    }

    /// Check if this is a legacy platform
    pub fn is_legacy(self) -> bool {
        self == Platform::Legacy
    }

    /// Name as accepted by [`FromStr`]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Legacy => "legacy",
            Platform::Modern => "modern",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(Platform::Legacy),
            "modern" => Ok(Platform::Modern),
            _ => Err(Error::unknown_option("platform", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_probe() {
        assert_eq!(Platform::from_probe(None), Platform::Modern);
        assert_eq!(Platform::from_probe(Some("legacy")), Platform::Legacy);
        assert_eq!(Platform::from_probe(Some(" LEGACY ")), Platform::Legacy);
        assert_eq!(Platform::from_probe(Some("modern")), Platform::Modern);
        assert_eq!(Platform::from_probe(Some("win95")), Platform::Modern);
    }

    #[test]
    fn test_parse() {
        assert_eq!("legacy".parse::<Platform>().unwrap(), Platform::Legacy);
        assert!("nt4".parse::<Platform>().is_err());
        assert_eq!(Platform::Legacy.to_string(), "legacy");
        assert!(Platform::Legacy.is_legacy());
        assert!(!Platform::Modern.is_legacy());
    }
}
