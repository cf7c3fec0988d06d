//! Command-line/config-file surface for standing up a `Ledger`: storage
//! path, cache sizing, the domain-separation tag, and the toxic-waste
//! secret scalar.
//!
//! `BulletOpt` is the `clap`-parsed, `serde`-(de)serializable surface a
//! binary or test harness fills in, and `BaseConfig` is the resolved,
//! validated form a `Ledger` is actually built from.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cache size used when `cache_size` isn't set: enough nodes to hold a
/// handful of branch levels plus a working set of leaves.
pub const DEFAULT_CACHE_SIZE: usize = 1 << 16;

/// On-disk capacity hint used when `map_size` isn't set.
pub const DEFAULT_MAP_SIZE: u64 = 16 << 30;

/// Errors resolving a [`BulletOpt`] into a [`BaseConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `secret` wasn't valid hex.
    #[error("secret must be hex-encoded: {0}")]
    InvalidSecretHex(#[from] hex::FromHexError),
    /// `secret` didn't decode to exactly 32 bytes.
    #[error("secret must decode to 32 bytes, got {0}")]
    InvalidSecretLength(usize),
    /// The data directory couldn't be created.
    #[error("failed to create data directory: {0}")]
    DataDir(#[from] std::io::Error),
}

/// Parsed command-line/config-file options for a `bullet-ledger` node.
///
/// Every field is optional so the same struct doubles as a config-file
/// schema (`serde`) and a CLI overlay (`clap`); [`BulletOpt::resolve`]
/// fills in defaults and validates `secret`.
#[derive(Clone, Debug, Default, clap::Parser, Serialize, Deserialize)]
pub struct BulletOpt {
    /// Directory for the persistent KV store.
    #[clap(long, short = 'd')]
    pub path: Option<PathBuf>,

    /// Number of nodes the in-memory LRU cache holds.
    #[clap(long)]
    pub cache_size: Option<usize>,

    /// On-disk capacity hint passed to the backing store.
    #[clap(long)]
    pub map_size: Option<u64>,

    /// Domain-separation tag folded into every commitment-to-scalar hash.
    #[clap(long, default_value = "TAG")]
    pub tag: String,

    /// Hex-encoded 32-byte toxic-waste secret scalar. Empty/absent means
    /// "draw one from OS randomness and never persist it" — callers that
    /// supply one are responsible for wiping their own copy once
    /// [`BulletOpt::resolve`] returns.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[clap(long, env = "BULLET_SECRET")]
    pub secret: Option<String>,
}

impl BulletOpt {
    /// Resolves this `BulletOpt` into a validated [`BaseConfig`],
    /// creating `path` if it doesn't already exist and decoding
    /// `secret` if one was supplied.
    pub fn resolve(&self) -> Result<BaseConfig, ConfigError> {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("./bullet-data"));
        if !path.exists() {
            create_dir_all(&path)?;
        }

        let secret = match &self.secret {
            Some(hex_str) if !hex_str.is_empty() => {
                let mut bytes = hex::decode(hex_str)?;
                if bytes.len() != 32 {
                    return Err(ConfigError::InvalidSecretLength(bytes.len()));
                }
                let mut out = [0u8; 32];
                out.copy_from_slice(&bytes);
                // The hex-decoded scratch buffer is no longer needed once
                // copied into `out`; overwrite it rather than letting it
                // sit in memory until the allocator reclaims it.
                bytes.iter_mut().for_each(|b| *b = 0);
                Some(out)
            }
            _ => None,
        };

        Ok(BaseConfig {
            path,
            cache_size: self.cache_size.unwrap_or(DEFAULT_CACHE_SIZE),
            map_size: self.map_size.unwrap_or(DEFAULT_MAP_SIZE),
            tag: self.tag.clone().into_bytes(),
            secret,
        })
    }
}

/// The resolved, validated configuration a `Ledger` is built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseConfig {
    path: PathBuf,
    cache_size: usize,
    map_size: u64,
    tag: Vec<u8>,
    secret: Option<[u8; 32]>,
}

impl BaseConfig {
    /// The persistent store's data directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory node cache's capacity.
    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    /// The backing store's on-disk capacity hint.
    pub fn map_size(&self) -> u64 {
        self.map_size
    }

    /// The domain-separation tag.
    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    /// The configured secret scalar, if one was supplied.
    pub fn secret(&self) -> Option<&[u8; 32]> {
        self.secret.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let opt = BulletOpt {
            path: Some(dir.path().join("store")),
            cache_size: None,
            map_size: None,
            tag: "TAG".to_string(),
            secret: None,
        };
        let config = opt.resolve().unwrap();
        assert_eq!(config.cache_size(), DEFAULT_CACHE_SIZE);
        assert_eq!(config.map_size(), DEFAULT_MAP_SIZE);
        assert_eq!(config.tag(), b"TAG");
        assert!(config.secret().is_none());
        assert!(config.path().exists());
    }

    #[test]
    fn resolve_decodes_valid_hex_secret() {
        let dir = tempfile::tempdir().unwrap();
        let secret_bytes = [7u8; 32];
        let opt = BulletOpt {
            path: Some(dir.path().to_path_buf()),
            cache_size: Some(1024),
            map_size: Some(1 << 20),
            tag: "TAG".to_string(),
            secret: Some(hex::encode(secret_bytes)),
        };
        let config = opt.resolve().unwrap();
        assert_eq!(config.secret(), Some(&secret_bytes));
        assert_eq!(config.cache_size(), 1024);
    }

    #[test]
    fn resolve_rejects_wrong_length_secret() {
        let dir = tempfile::tempdir().unwrap();
        let opt = BulletOpt {
            path: Some(dir.path().to_path_buf()),
            cache_size: None,
            map_size: None,
            tag: "TAG".to_string(),
            secret: Some(hex::encode([1u8; 16])),
        };
        assert!(matches!(
            opt.resolve(),
            Err(ConfigError::InvalidSecretLength(16))
        ));
    }
}
