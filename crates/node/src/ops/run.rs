use std::path::PathBuf;

use clap::Args;
use url::Url;

use service::{spawn_service, Config, ConfigError, StorageConfig};

#[derive(Args, Debug, Clone)]
pub struct Run {
    /// TOML config file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Public base url other nodes reach this one at
    #[arg(long)]
    pub url: Option<Url>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Base directory for relative paths
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Bootstrap peer urls
    #[arg(long, value_delimiter = ',')]
    pub other_nodes: Vec<Url>,

    /// Public key files, paired in order with --private-keys
    #[arg(long, value_delimiter = ',')]
    pub public_keys: Vec<PathBuf>,

    /// Private key files, paired in order with --public-keys
    #[arg(long, value_delimiter = ',')]
    pub private_keys: Vec<PathBuf>,

    /// Keep records in a SQLite database at this path
    #[arg(long, conflicts_with = "memory")]
    pub sqlite: Option<PathBuf>,

    /// Keep records in memory only
    #[arg(long)]
    pub memory: bool,

    /// Seconds between directory polls
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Seconds before a request to another node is abandoned
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// 0 error, 1 warn, 2 info, 3 debug, 4 trace
    #[arg(long)]
    pub verbosity: Option<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl Run {
    /// The config file, if any, with every given flag applied on top
    pub fn config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(url) = &self.url {
            config.url = Some(url.clone());
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if !self.other_nodes.is_empty() {
            config.other_nodes = self.other_nodes.clone();
        }
        if !self.public_keys.is_empty() {
            config.public_keys = self.public_keys.clone();
        }
        if !self.private_keys.is_empty() {
            config.private_keys = self.private_keys.clone();
        }
        if let Some(path) = &self.sqlite {
            config.storage = StorageConfig::Sqlite { path: path.clone() };
        }
        if self.memory {
            config.storage = StorageConfig::Memory;
        }
        if let Some(secs) = self.poll_interval_secs {
            config.poll_interval_secs = secs;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(verbosity) = self.verbosity {
            config.verbosity = verbosity;
        }

        config.validate()?;
        Ok(config)
    }

    pub async fn execute(&self) -> Result<String, RunError> {
        let config = self.config()?;
        spawn_service(&config).await;
        Ok("node stopped".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        run: Run,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "veil",
            "--url",
            "http://node1:9001",
            "--port",
            "9001",
            "--other-nodes",
            "http://node2:9002,http://node3:9003",
            "--public-keys",
            "a.pub",
            "--private-keys",
            "a.key",
            "--verbosity",
            "4",
        ]);
        let config = cli.run.config().unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.other_nodes.len(), 2);
        assert_eq!(config.log_level(), tracing::Level::TRACE);
    }

    #[test]
    fn test_storage_and_timeout_flags() {
        let cli = Cli::parse_from([
            "veil",
            "--url",
            "http://node1:9000",
            "--public-keys",
            "a.pub",
            "--private-keys",
            "a.key",
            "--sqlite",
            "records.db",
            "--request-timeout-secs",
            "3",
        ]);
        let config = cli.run.config().unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Sqlite {
                path: PathBuf::from("records.db")
            }
        );
        assert_eq!(config.request_timeout(), std::time::Duration::from_secs(3));
    }

    #[test]
    fn test_memory_flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veil.toml");
        std::fs::write(
            &path,
            r#"
            url = "http://node1:9000"
            public_keys = ["a.pub"]
            private_keys = ["a.key"]
            request_timeout_secs = 30

            [storage]
            type = "sqlite"
            "#,
        )
        .unwrap();

        let cli = Cli::parse_from(["veil", "--config", path.to_str().unwrap(), "--memory"]);
        let config = cli.run.config().unwrap();
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.request_timeout_secs, 30);

        assert!(Cli::try_parse_from(["veil", "--memory", "--sqlite", "x.db"]).is_err());
    }

    #[test]
    fn test_missing_keys_rejected() {
        let cli = Cli::parse_from(["veil", "--url", "http://node1:9000"]);
        assert!(matches!(cli.run.config(), Err(ConfigError::NoKeys)));
    }
}
