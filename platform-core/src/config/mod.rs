use crate::error::AppError;
use config::{Config as Loader, File};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};

/// Settings every service binary shares: where to bind.
///
/// Values come from an optional `settings` file and `APP__`-prefixed
/// environment variables, after `.env` has been loaded. Service-specific
/// configuration flattens this struct into its own.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let loader = Loader::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(loader.try_deserialize()?)
    }

    /// Resolve the configured listen address, rejecting unparseable hosts.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        let host: IpAddr = self.host.parse().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("Invalid bind host: {}", self.host))
        })?;
        Ok(SocketAddr::new(host, self.port))
    }
}
