//! Watcher Configuration Settings
//!
//! Configuration types loaded from environment variables, plus the
//! symbol-list file named on the command line.
//!
//! The symbol file is a YAML sequence of ticker strings; the sentinel `*`
//! anywhere in the list means "every symbol currently tradable on the
//! feed":
//!
//! ```yaml
//! - AAPL
//! - MSFT
//! - GOOG
//! ```

/// Market data feed type for Alpaca streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFeed {
    /// SIP (Securities Information Processor) - Full market data.
    #[default]
    Sip,
    /// IEX (Investors Exchange) - Free tier with limited data.
    Iex,
}

impl DataFeed {
    /// Parse feed type from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "iex" => Self::Iex,
            _ => Self::Sip,
        }
    }

    /// Get the feed name for WebSocket URLs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sip => "sip",
            Self::Iex => "iex",
        }
    }
}

/// Alpaca API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
        }
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the API secret.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Channel capacity settings.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Capacity of the session event channel feeding the processing loop.
    pub event_capacity: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            event_capacity: 1_024,
        }
    }
}

/// Complete watcher configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Market data feed type.
    pub feed: DataFeed,
    /// API credentials.
    pub credentials: Credentials,
    /// Channel capacity settings.
    pub channels: ChannelSettings,
}

impl WatcherConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required environment variable is missing or
    /// empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("ALPACA_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("ALPACA_KEY".to_string()))?;

        let api_secret = std::env::var("ALPACA_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("ALPACA_SECRET".to_string()))?;

        if api_key.is_empty() {
            return Err(ConfigError::EmptyValue("ALPACA_KEY".to_string()));
        }

        if api_secret.is_empty() {
            return Err(ConfigError::EmptyValue("ALPACA_SECRET".to_string()));
        }

        let feed = std::env::var("ALPACA_FEED")
            .map(|s| DataFeed::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let channels = ChannelSettings {
            event_capacity: parse_env_usize(
                "OPENPRINT_EVENT_CAPACITY",
                ChannelSettings::default().event_capacity,
            ),
        };

        Ok(Self {
            feed,
            credentials: Credentials::new(api_key, api_secret),
            channels,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),

    /// No symbol file was given on the command line.
    #[error("usage: openprint <symbols.yaml>")]
    MissingSymbolFile,

    /// Failed to read the symbol file.
    #[error("failed to read symbol file '{path}': {source}")]
    SymbolFileRead {
        /// Path to the symbol file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse the symbol file as a YAML list of strings.
    #[error("failed to parse symbol file '{path}': {source}")]
    SymbolFileParse {
        /// Path to the symbol file.
        path: String,
        /// The underlying YAML error.
        source: serde_yaml_bw::Error,
    },

    /// The symbol file parsed but contains no symbols.
    #[error("symbol file '{path}' contains no symbols")]
    EmptySymbolList {
        /// Path to the symbol file.
        path: String,
    },
}

/// Load the symbol list from a YAML file.
///
/// The file is a YAML sequence of ticker strings, where `*` means every
/// tradable symbol on the feed.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a YAML list of
/// strings, or lists no symbols at all.
pub fn load_symbol_file(path: &str) -> Result<Vec<String>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::SymbolFileRead {
        path: path.to_owned(),
        source,
    })?;

    let symbols: Vec<String> =
        serde_yaml_bw::from_str(&contents).map_err(|source| ConfigError::SymbolFileParse {
            path: path.to_owned(),
            source,
        })?;

    if symbols.is_empty() {
        return Err(ConfigError::EmptySymbolList {
            path: path.to_owned(),
        });
    }

    Ok(symbols)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
