use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct Config {
    // Listen address
    pub listen_addr: SocketAddr,
    // log level for http tracing
    pub log_level: tracing::Level,
}

impl Config {
    pub fn new(listen_addr: SocketAddr, log_level: tracing::Level) -> Self {
        tracing::info!(
            "Creating HTTP server Config: listen_addr={}, log_level={}",
            listen_addr,
            log_level
        );
        Self {
            listen_addr,
            log_level,
        }
    }
}

impl From<&crate::Config> for Config {
    fn from(config: &crate::Config) -> Self {
        Self::new(config.listen_addr(), config.log_level())
    }
}
