
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub static DEFAULT_CONFIG_PATH: &str = "./config.yaml";
pub static DEFAULT_URL: &str = "wss://stream.binance.com/stream";

const DEFAULT_STREAMS: [&str; 3] = [
    "btcusdt@kline_1s",
    "ethusdt@kline_1s",
    "bnbusdt@kline_1s",
];

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub url: String,
    pub streams: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            url: DEFAULT_URL.to_string(),
            streams: DEFAULT_STREAMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Config> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path))?;
        Config::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Config> {
        let config: Config = serde_yaml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Picks the explicit path if one was given, then the default file if it
    /// exists, and falls back to the built-in defaults otherwise.
    pub fn load(path: Option<&str>) -> Result<Config> {
        match path {
            Some(path) => Config::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Config::from_file(DEFAULT_CONFIG_PATH)
            }
            None => {
                log::warn!(
                    "no config file found at {:?}, using built-in defaults",
                    DEFAULT_CONFIG_PATH
                );
                Ok(Config::default())
            }
        }
    }

    pub fn endpoint(&self) -> Result<Url> {
        let url = Url::parse(&self.url).with_context(|| format!("invalid url {:?}", self.url))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => bail!("unsupported url scheme {:?}, expected ws or wss", other),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint()?;
        if self.streams.is_empty() {
            bail!("at least one stream must be configured");
        }
        if self.streams.iter().any(|s| s.trim().is_empty()) {
            bail!("stream names must not be blank");
        }
        Ok(())
    }
}
