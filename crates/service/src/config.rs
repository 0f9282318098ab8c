use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_VERBOSITY: u8 = 2;
pub const DEFAULT_SQLITE_PATH: &str = "veil.db";

/// Where encrypted records are kept
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Records live only as long as the process
    #[default]
    Memory,
    /// A SQLite database file, relative to `work_dir` unless absolute
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

/// Node configuration, read from a TOML file and overridable from the
///  command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// public base url other nodes reach this one at
    #[serde(default)]
    pub url: Option<Url>,
    /// port the HTTP server listens on
    #[serde(default = "default_port")]
    pub port: u16,
    /// base for every relative path below
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default)]
    pub storage: StorageConfig,
    /// peers to poll before anything is learned by gossip
    #[serde(default)]
    pub other_nodes: Vec<Url>,
    #[serde(default)]
    pub public_keys: Vec<PathBuf>,
    #[serde(default)]
    pub private_keys: Vec<PathBuf>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 0 error, 1 warn, 2 info, 3 debug, 4 and up trace
    #[serde(default = "default_verbosity")]
    pub verbosity: u8,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from(DEFAULT_SQLITE_PATH)
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_verbosity() -> u8 {
    DEFAULT_VERBOSITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            port: DEFAULT_PORT,
            work_dir: default_work_dir(),
            storage: StorageConfig::default(),
            other_nodes: Vec::new(),
            public_keys: Vec::new(),
            private_keys: Vec::new(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            verbosity: DEFAULT_VERBOSITY,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Check everything the node cannot start without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_none() {
            return Err(ConfigError::MissingUrl);
        }
        if self.private_keys.len() != self.public_keys.len() {
            return Err(ConfigError::MismatchedKeys {
                private: self.private_keys.len(),
                public: self.public_keys.len(),
            });
        }
        if self.private_keys.is_empty() {
            return Err(ConfigError::NoKeys);
        }
        if self.poll_interval_secs == 0 || self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        Ok(())
    }

    pub fn url(&self) -> Result<&Url, ConfigError> {
        self.url.as_ref().ok_or(ConfigError::MissingUrl)
    }

    /// Resolve a path against `work_dir`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.work_dir.join(path)
    }

    /// Private and public key file paths, resolved against `work_dir`
    pub fn key_paths(&self) -> (Vec<PathBuf>, Vec<PathBuf>) {
        (
            self.private_keys.iter().map(|p| self.resolve(p)).collect(),
            self.public_keys.iter().map(|p| self.resolve(p)).collect(),
        )
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.verbosity {
            0 => tracing::Level::ERROR,
            1 => tracing::Level::WARN,
            2 => tracing::Level::INFO,
            3 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("url must be specified")]
    MissingUrl,
    #[error("private keys provided must have corresponding public keys ({private} private, {public} public)")]
    MismatchedKeys { private: usize, public: usize },
    #[error("node key files must be provided")]
    NoKeys,
    #[error("poll interval and request timeout must be non-zero")]
    ZeroDuration,
}
