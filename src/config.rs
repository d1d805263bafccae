//! Configuration management with TOML, environment variables, and CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Price feeds to load, in order
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Base delay between feed downloads in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to the feed delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Fixed pause between basket items during playback
    #[serde(default = "default_inter_item_delay_ms")]
    pub inter_item_delay_ms: u64,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Markets active for price comparison (empty means all)
    #[serde(default)]
    pub markets: Vec<String>,

    /// Where a pending export is kept between `export` and `fill`
    #[serde(default)]
    pub session_path: Option<PathBuf>,
}

/// One market's price feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Market (supermarket chain) name
    pub market: String,
    /// URL or filesystem path of the feed
    pub location: String,
}

impl FeedConfig {
    /// Creates a feed entry.
    pub fn new(market: impl Into<String>, location: impl Into<String>) -> Self {
        Self { market: market.into(), location: location.into() }
    }

    /// Returns true if the feed is fetched over HTTP.
    pub fn is_remote(&self) -> bool {
        self.location.starts_with("http://") || self.location.starts_with("https://")
    }
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::new("Shufersal", "PriceFull7290027600007-002-202602110300.xml"),
        FeedConfig::new("Mahsanei Hashuk", "mahsanei_hashuk.xml"),
    ]
}

fn default_delay_ms() -> u64 {
    500
}

fn default_delay_jitter_ms() -> u64 {
    500
}

fn default_inter_item_delay_ms() -> u64 {
    1500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            proxy: None,
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            inter_item_delay_ms: default_inter_item_delay_ms(),
            format: OutputFormat::Table,
            markets: Vec::new(),
            session_path: None,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // Working directory, then the user config directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("cart-filler").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(proxy) = std::env::var("CART_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(delay) = std::env::var("CART_FEEDS_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        if let Ok(delay) = std::env::var("CART_INTER_ITEM_DELAY") {
            if let Ok(d) = delay.parse() {
                self.inter_item_delay_ms = d;
            }
        }

        if let Ok(markets) = std::env::var("CART_MARKETS") {
            self.markets = split_list(&markets);
        }

        self
    }

    /// Returns the session file location, defaulting to the temp directory.
    pub fn session_file(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("cart-filler-session.json"))
    }

    /// Returns the names of all configured markets.
    pub fn market_names(&self) -> Vec<String> {
        self.feeds.iter().map(|f| f.market.clone()).collect()
    }
}

/// Splits a comma-separated list, dropping blank entries.
pub fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[0].market, "Shufersal");
        assert_eq!(config.feeds[1].market, "Mahsanei Hashuk");
        assert_eq!(config.delay_ms, 500);
        assert_eq!(config.delay_jitter_ms, 500);
        assert_eq!(config.inter_item_delay_ms, 1500);
        assert_eq!(config.format, OutputFormat::Table);
        assert!(config.proxy.is_none());
        assert!(config.markets.is_empty());
        assert!(config.session_path.is_none());
    }

    #[test]
    fn test_feed_is_remote() {
        assert!(FeedConfig::new("X", "https://prices.example/PriceFull.gz").is_remote());
        assert!(FeedConfig::new("X", "http://prices.example/a.xml").is_remote());
        assert!(!FeedConfig::new("X", "/data/a.xml").is_remote());
        assert!(!FeedConfig::new("X", "a.xml").is_remote());
    }

    #[test]
    fn test_output_format_names() {
        for format in [OutputFormat::Table, OutputFormat::Json, OutputFormat::Markdown, OutputFormat::Csv] {
            assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), format);
        }
        assert_eq!("MD".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);

        let err = "xlsx".parse::<OutputFormat>().unwrap_err();
        assert_eq!(err, "Unknown format: xlsx. Use: table, json, markdown, csv");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            delay_ms = 0
            inter_item_delay_ms = 2500
            markets = ["Shufersal"]

            [[feeds]]
            market = "Shufersal"
            location = "https://prices.example/PriceFull7290027600007.gz"

            [[feeds]]
            market = "Victory"
            location = "/data/victory.xml"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.delay_ms, 0);
        assert_eq!(config.delay_jitter_ms, 500);
        assert_eq!(config.inter_item_delay_ms, 2500);
        assert_eq!(config.markets, vec!["Shufersal"]);
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[1], FeedConfig::new("Victory", "/data/victory.xml"));
        assert_eq!(config.market_names(), vec!["Shufersal", "Victory"]);
    }

    #[test]
    fn test_config_from_toml_defaults_feeds() {
        let config: Config = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.feeds, default_feeds());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "delay_ms = 4000\nsession_path = \"/tmp/basket.json\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.delay_ms, 4000);
        assert_eq!(config.session_file(), PathBuf::from("/tmp/basket.json"));
    }

    #[test]
    fn test_config_from_file_not_found() {
        let result = Config::from_file("/nonexistent/path/config.toml");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_config_from_file_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();

        let err = Config::from_file(file.path()).unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "inter_item_delay_ms = 100").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.inter_item_delay_ms, 100);
    }

    #[test]
    fn test_config_with_env() {
        let orig_delay = std::env::var("CART_INTER_ITEM_DELAY").ok();
        let orig_markets = std::env::var("CART_MARKETS").ok();

        std::env::set_var("CART_INTER_ITEM_DELAY", "3000");
        std::env::set_var("CART_MARKETS", "Shufersal, Victory,");

        let config = Config::new().with_env();
        assert_eq!(config.inter_item_delay_ms, 3000);
        assert_eq!(config.markets, vec!["Shufersal", "Victory"]);

        std::env::set_var("CART_INTER_ITEM_DELAY", "soon");
        let config = Config::new().with_env();
        assert_eq!(config.inter_item_delay_ms, 1500);

        match orig_delay {
            Some(v) => std::env::set_var("CART_INTER_ITEM_DELAY", v),
            None => std::env::remove_var("CART_INTER_ITEM_DELAY"),
        }
        match orig_markets {
            Some(v) => std::env::set_var("CART_MARKETS", v),
            None => std::env::remove_var("CART_MARKETS"),
        }
    }

    #[test]
    fn test_session_file_default() {
        let config = Config::default();
        assert!(config.session_file().ends_with("cart-filler-session.json"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a, b ,,c"), vec!["a", "b", "c"]);
        assert!(split_list(" , ").is_empty());
    }
}
