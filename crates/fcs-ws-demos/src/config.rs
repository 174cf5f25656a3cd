/*
[INPUT]:  YAML configuration file, FCS_API_KEY environment variable, CLI overrides
[OUTPUT]: Resolved demo configuration (key, feed URL, symbols, server binding)
[POS]:    Configuration layer - demo setup
[UPDATE]: When adding new configuration options or presets
*/

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use fcs_ws_adapter::{ClientConfig, SubscriptionKey, DEFAULT_WS_URL};
use serde::{Deserialize, Serialize};

/// Public demo key accepted by the feed with limited symbols.
pub const DEMO_API_KEY: &str = "fcs_socket_demo";
pub const API_KEY_ENV: &str = "FCS_API_KEY";
pub const DEFAULT_TIMEFRAME: &str = "1D";
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Market family a demo is built around.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Stock,
    Forex,
    #[default]
    Crypto,
}

impl Preset {
    pub fn default_symbols(self) -> Vec<String> {
        let symbols: &[&str] = match self {
            Preset::Stock => &["NASDAQ:AAPL", "NASDAQ:GOOGL", "NASDAQ:MSFT", "NYSE:TSLA"],
            Preset::Forex => &["FX:EURUSD", "FX:GBPUSD", "FX:USDJPY", "FX:AUDUSD"],
            Preset::Crypto => &[
                "BINANCE:BTCUSDT",
                "BINANCE:ETHUSDT",
                "BINANCE:BNBUSDT",
                "BINANCE:SOLUSDT",
            ],
        };
        symbols.iter().map(|symbol| symbol.to_string()).collect()
    }

    pub fn title(self) -> &'static str {
        match self {
            Preset::Stock => "Stock",
            Preset::Forex => "Forex",
            Preset::Crypto => "Crypto",
        }
    }

    pub fn default_timeframe(self) -> &'static str {
        DEFAULT_TIMEFRAME
    }
}

/// Top-level configuration for the demos
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemoConfig {
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Feed endpoint without the access key query
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default)]
    pub preset: Preset,
    /// Falls back to the preset's symbols when absent
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Web demo binding
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Falls back to the engine's default port
    #[serde(default)]
    pub port: Option<u16>,
    /// Extra files the raw server may serve
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

/// Values given on the command line. Each one wins over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub preset: Option<Preset>,
    pub symbols: Vec<String>,
    pub timeframe: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<PathBuf>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self::for_preset(Preset::default())
    }
}

impl DemoConfig {
    pub fn for_preset(preset: Preset) -> Self {
        Self {
            api_key: default_api_key(),
            ws_url: default_ws_url(),
            preset,
            symbols: None,
            timeframe: None,
            server: ServerConfig {
                host: default_host(),
                port: None,
                static_dir: None,
            },
        }
    }

    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(config)
    }

    /// Replace the API key from `FCS_API_KEY` when it is set and non-empty.
    pub fn apply_env(&mut self) {
        self.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
    }

    pub fn apply_api_key_override(&mut self, api_key: Option<String>) {
        if let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) {
            self.api_key = api_key;
        }
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        self.apply_api_key_override(overrides.api_key);
        if let Some(preset) = overrides.preset {
            self.preset = preset;
        }
        if !overrides.symbols.is_empty() {
            self.symbols = Some(overrides.symbols);
        }
        if overrides.timeframe.is_some() {
            self.timeframe = overrides.timeframe;
        }
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if overrides.port.is_some() {
            self.server.port = overrides.port;
        }
        if overrides.static_dir.is_some() {
            self.server.static_dir = overrides.static_dir;
        }
    }

    pub fn resolved_symbols(&self) -> Vec<String> {
        self.symbols
            .clone()
            .unwrap_or_else(|| self.preset.default_symbols())
    }

    pub fn resolved_timeframe(&self) -> String {
        self.timeframe
            .clone()
            .unwrap_or_else(|| self.preset.default_timeframe().to_string())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default().with_url(self.ws_url.clone())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            bail!("api_key must not be empty");
        }
        if self.ws_url.trim().is_empty() {
            bail!("ws_url must not be empty");
        }

        let symbols = self.resolved_symbols();
        if symbols.is_empty() {
            bail!("symbols must not be empty");
        }
        let timeframe = self.resolved_timeframe();
        for symbol in &symbols {
            SubscriptionKey::new(symbol.as_str(), timeframe.as_str())
                .with_context(|| format!("invalid symbol {symbol}"))?;
        }
        Ok(())
    }
}

fn default_api_key() -> String {
    DEMO_API_KEY.to_string()
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_uses_preset_defaults() {
        let config: DemoConfig = serde_yaml::from_str("preset: forex\n").unwrap();
        assert_eq!(config.api_key, DEMO_API_KEY);
        assert_eq!(config.ws_url, DEFAULT_WS_URL);
        assert_eq!(config.resolved_symbols()[0], "FX:EURUSD");
        assert_eq!(config.resolved_timeframe(), "1D");
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn explicit_symbols_and_server() {
        let yaml = r#"
api_key: my_key
preset: stock
symbols: ["NASDAQ:AAPL"]
timeframe: 1H
server:
  host: 0.0.0.0
  port: 8080
"#;
        let config: DemoConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.resolved_symbols(), vec!["NASDAQ:AAPL"]);
        assert_eq!(config.resolved_timeframe(), "1H");
        assert_eq!(config.server.port, Some(8080));
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = DemoConfig::for_preset(Preset::Crypto);
        config.symbols = Some(Vec::new());
        assert!(config.validate().is_err());

        config.symbols = Some(vec!["BTCUSDT".to_string()]);
        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("BTCUSDT"));

        let mut config = DemoConfig::default();
        config.api_key = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_win_over_file_and_env() {
        let mut config = DemoConfig::for_preset(Preset::Stock);
        config.apply_api_key_override(Some("env_key".to_string()));
        assert_eq!(config.api_key, "env_key");

        config.apply_api_key_override(Some(String::new()));
        assert_eq!(config.api_key, "env_key");

        config.apply_overrides(ConfigOverrides {
            api_key: Some("cli_key".to_string()),
            preset: Some(Preset::Forex),
            symbols: vec!["FX:USDJPY".to_string()],
            port: Some(9000),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.api_key, "cli_key");
        assert_eq!(config.preset, Preset::Forex);
        assert_eq!(config.resolved_symbols(), vec!["FX:USDJPY"]);
        assert_eq!(config.server.port, Some(9000));
        assert_eq!(config.server.host, DEFAULT_HOST);
    }
}
