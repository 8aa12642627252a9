//! Configuration management for the Store Greeter.

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default similarity threshold for store matching.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.3;

/// Default weather endpoint (OpenWeatherMap current conditions).
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Command-line arguments for the Store Greeter server.
#[derive(Parser, Debug, Clone)]
#[command(name = "store-greeter")]
#[command(author = "Store Greeter Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server that greets stores by name with live weather")]
pub struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "STORE_GREETER_HOST")]
    pub host: String,

    /// HTTP port
    #[arg(short, long, default_value = "3000", env = "PORT")]
    pub port: u16,

    /// Enable debug logging
    #[arg(short, long, env = "STORE_GREETER_DEBUG")]
    pub debug: bool,

    /// Log output format: text or json
    #[arg(long, default_value = "text", env = "STORE_GREETER_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase service role key
    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    pub supabase_service_key: Option<String>,

    /// OpenWeatherMap API key (weather is disabled without it)
    #[arg(long, env = "WEATHER_API_KEY", hide_env_values = true)]
    pub weather_api_key: Option<String>,

    /// Weather API endpoint
    #[arg(long, default_value = DEFAULT_WEATHER_BASE_URL, env = "WEATHER_BASE_URL")]
    pub weather_base_url: String,

    /// Seconds to wait for the weather API
    #[arg(long, default_value = "5", env = "WEATHER_TIMEOUT_SECS")]
    pub weather_timeout_secs: u64,

    /// Seconds to wait for the store search
    #[arg(long, default_value = "10", env = "STORE_SEARCH_TIMEOUT_SECS")]
    pub search_timeout_secs: u64,

    /// Minimum similarity score for a store match (0-1)
    #[arg(long, default_value = "0.3", env = "STORE_SIMILARITY_THRESHOLD")]
    pub similarity_threshold: f64,

    /// Expose Prometheus metrics on /metrics
    #[arg(long, env = "STORE_GREETER_METRICS")]
    pub metrics: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Debug mode
    pub debug: bool,
    /// Log format
    pub log_format: LogFormat,
    /// Supabase project URL
    pub supabase_url: Option<String>,
    /// Supabase service role key
    pub supabase_service_key: Option<String>,
    /// Weather API key
    pub weather_api_key: Option<String>,
    /// Weather API endpoint
    pub weather_base_url: String,
    /// Weather call timeout
    pub weather_timeout_secs: u64,
    /// Store search timeout
    pub search_timeout_secs: u64,
    /// Similarity threshold
    pub similarity_threshold: f64,
    /// Metrics enabled
    pub metrics: bool,
}

impl Config {
    /// Check values that clap cannot.
    pub fn validate(&self) -> Result<()> {
        if self.supabase_url.as_deref().is_none_or(str::is_empty)
            || self.supabase_service_key.as_deref().is_none_or(str::is_empty)
        {
            return Err(Error::Config(
                "Supabase URL and Service Key must be provided".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Config(format!(
                "similarity threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }

        if self.weather_timeout_secs == 0 || self.search_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be at least 1 second".to_string()));
        }

        Ok(())
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            debug: args.debug,
            log_format: args.log_format,
            supabase_url: args.supabase_url,
            supabase_service_key: args.supabase_service_key,
            weather_api_key: args.weather_api_key.filter(|k| !k.is_empty()),
            weather_base_url: args.weather_base_url,
            weather_timeout_secs: args.weather_timeout_secs,
            search_timeout_secs: args.search_timeout_secs,
            similarity_threshold: args.similarity_threshold,
            metrics: args.metrics,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            debug: false,
            log_format: LogFormat::Text,
            supabase_url: None,
            supabase_service_key: None,
            weather_api_key: None,
            weather_base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            weather_timeout_secs: 5,
            search_timeout_secs: 10,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            metrics: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        Config {
            supabase_url: Some("https://example.supabase.co".to_string()),
            supabase_service_key: Some("service-key".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(!config.debug);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.supabase_url.is_none());
        assert!(config.weather_api_key.is_none());
        assert_eq!(config.weather_timeout_secs, 5);
        assert_eq!(config.similarity_threshold, 0.3);
        assert!(!config.metrics);
    }

    #[test]
    fn test_validate_requires_supabase() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("Supabase URL and Service Key"));

        let empty_key = Config {
            supabase_service_key: Some(String::new()),
            ..configured()
        };
        assert!(empty_key.validate().is_err());

        assert!(configured().validate().is_ok());
    }

    #[test]
    fn test_validate_threshold_range() {
        let too_high = Config {
            similarity_threshold: 1.5,
            ..configured()
        };
        assert!(too_high.validate().is_err());

        let edge = Config {
            similarity_threshold: 1.0,
            ..configured()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_validate_timeouts() {
        let zero = Config {
            weather_timeout_secs: 0,
            ..configured()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_log_format_serialization() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        let text: LogFormat = serde_json::from_str("\"text\"").unwrap();
        assert_eq!(text, LogFormat::Text);
    }

    #[test]
    fn test_args_to_config() {
        let args = Args::parse_from([
            "store-greeter",
            "--port",
            "4000",
            "--supabase-url",
            "https://example.supabase.co",
            "--supabase-service-key",
            "key123",
            "--weather-api-key",
            "",
            "--similarity-threshold",
            "0.45",
            "--log-format",
            "json",
        ]);

        let config: Config = args.into();

        assert_eq!(config.port, 4000);
        assert_eq!(config.bind_addr(), "0.0.0.0:4000");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.similarity_threshold, 0.45);
        assert!(config.weather_api_key.is_none());
        assert!(config.validate().is_ok());
    }
}
