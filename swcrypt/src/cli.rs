//! Root CLI structure for swcrypt

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use swcrypt_core::{Config, Platform};

#[derive(Parser)]
#[command(name = "swcrypt")]
#[command(about = "Generate key pairs, sign files and verify signatures", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Provider calling convention; `auto` probes the host
    #[arg(
        long,
        value_enum,
        default_value_t = PlatformArg::Auto,
        env = "SWCRYPT_PLATFORM",
        global = true
    )]
    pub platform: PlatformArg,

    /// Directory holding the provider's key containers
    #[arg(long, value_name = "DIR", env = "SWCRYPT_CONTAINER_DIR", global = true)]
    pub container_dir: Option<PathBuf>,

    /// RSA modulus size for generated key pairs
    #[arg(
        long,
        value_name = "BITS",
        default_value_t = 2048,
        env = "SWCRYPT_KEY_BITS",
        value_parser = clap::value_parser!(u32).range(512..=16384),
        global = true
    )]
    pub key_bits: u32,
}

impl Cli {
    /// Library configuration for this invocation
    pub fn config(&self) -> Config {
        let config = Config::default()
            .platform(self.platform.resolve())
            .key_bits(self.key_bits as usize);
        match &self.container_dir {
            Some(dir) => config.container_dir(dir),
            None => config,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    /// Detect the platform
    Auto,
    /// Narrow-text provider, hash algorithms up to SHA-1
    Legacy,
    /// Wide-text provider, every hash algorithm
    Modern,
}

impl PlatformArg {
    fn resolve(self) -> Platform {
        match self {
            PlatformArg::Auto => Platform::detect(),
            PlatformArg::Legacy => Platform::Legacy,
            PlatformArg::Modern => Platform::Modern,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a key pair and export both halves
    Generate {
        /// Key pair type: exchange-type or signing
        #[arg(value_name = "TYPE")]
        key_type: String,

        /// Output path for the public key blob
        public_key: PathBuf,

        /// Output path for the private key blob
        private_key: PathBuf,
    },

    /// Sign a file with a private key
    Sign {
        /// Hash algorithm (see `swcrypt algorithms`)
        algorithm: String,

        /// Private key blob produced by `generate`
        private_key: PathBuf,

        /// File to sign
        input: PathBuf,

        /// Output path for the signature
        output: PathBuf,
    },

    /// Verify a file's signature with a public key
    Verify {
        /// Hash algorithm the signature was made with
        algorithm: String,

        /// Public key blob produced by `generate`
        public_key: PathBuf,

        /// Signed file
        input: PathBuf,

        /// Signature to check
        signature: PathBuf,
    },

    /// List the supported hash algorithms and key pair types
    Algorithms,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Commands {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Generate { .. } => "generate",
            Commands::Sign { .. } => "sign",
            Commands::Verify { .. } => "verify",
            Commands::Algorithms => "algorithms",
            Commands::Completions { .. } => "completions",
        }
    }
}
