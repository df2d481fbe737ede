use std::path::Path;

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

//pending blocks settings
pub const DEFAULT_FINALIZED_CACHE_SIZE: usize = 1000;

//mempool settings
pub const DEFAULT_MEMPOOL_MAX_TX_COUNT: usize = 5000;
pub const DEFAULT_MEMPOOL_TX_LIFETIME_SEC: u64 = 24 * 60 * 60;

const ENV_PREFIX: &str = "CONCILIUM";

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("ConfigDoesNotExist: '{0}'")]
    DoesNotExist(String),
    #[error("ParsingFailed: {0}")]
    ParsingFailed(#[from] config::ConfigError),
    #[error("TomlError: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub pending_blocks: PendingBlocksConfiguration,
    pub mempool: MempoolConfiguration,
}

/// What to do with a block whose parent is neither pending nor known as finalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentPolicy {
    /// Reject the block with `DanglingParent`.
    Strict,
    /// Treat the parent as already finalized history.
    #[default]
    Permissive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingBlocksConfiguration {
    pub parent_policy: ParentPolicy,
    /// Upper bound for the number of parents `best_parents` selects. Unbounded if not set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_block_parents: Option<usize>,
    /// How many recently finalized block hashes are remembered as valid external parents.
    pub finalized_cache_size: usize,
}

impl Default for PendingBlocksConfiguration {
    fn default() -> Self {
        Self {
            parent_policy: ParentPolicy::default(),
            max_block_parents: None,
            finalized_cache_size: DEFAULT_FINALIZED_CACHE_SIZE,
        }
    }
}

impl PendingBlocksConfiguration {
    pub fn strict() -> Self {
        Self {
            parent_policy: ParentPolicy::Strict,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfiguration {
    pub max_tx_count: usize,
    pub tx_lifetime_sec: u64,
}

impl Default for MempoolConfiguration {
    fn default() -> Self {
        Self {
            max_tx_count: DEFAULT_MEMPOOL_MAX_TX_COUNT,
            tx_lifetime_sec: DEFAULT_MEMPOOL_TX_LIFETIME_SEC,
        }
    }
}

impl MempoolConfiguration {
    pub fn new(max_tx_count: usize, tx_lifetime_sec: u64) -> Self {
        Self {
            max_tx_count,
            tx_lifetime_sec,
        }
    }

    pub(crate) fn tx_lifetime_millis(&self) -> u64 {
        self.tx_lifetime_sec.saturating_mul(1000)
    }
}

impl Configuration {
    /// Loads configuration from a TOML file.
    ///
    /// Values can be overridden from the environment, for example
    /// `CONCILIUM_MEMPOOL__MAX_TX_COUNT=100`.
    pub fn try_load<P: AsRef<Path>>(path: P) -> Result<Configuration> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigurationError::DoesNotExist(path.display().to_string()));
        }
        let config = config::Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(|err| err.into())
    }

    pub fn try_load_from_str(content: &str) -> Result<Configuration> {
        let config = config::Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        config.try_deserialize().map_err(|err| err.into())
    }

    pub fn try_write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = toml::to_string(&self)?;
        std::fs::write(path.as_ref(), config)?;
        log::info!("Configuration written to {}", path.as_ref().display());
        Ok(())
    }
}
