use crate::error::{CastError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Placeholder shipped in sample deployment files; never accepted as a real key
const PLACEHOLDER_API_KEY: &str = "YOUR_SUPER_SECRET_API_KEY";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiServerConfig,
    /// Descriptor source and rotation state locations
    pub storage: StorageConfig,
    /// Refresh cycle scheduling
    pub refresh: RefreshConfig,
    /// Reachability oracle client
    pub oracle: OracleConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port for the API server (default: 8000)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Shared secret expected in the X-API-KEY header
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Newline-delimited descriptor list
    pub nodes_file: PathBuf,
    /// File holding the last selected index
    pub state_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Seconds between refresh cycles
    pub interval_secs: u64,
    /// Seconds to wait between successive oracle probes
    pub probe_delay_secs: u64,
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Aggregator endpoint queried with `host` and `port`
    pub url: Url,
    /// Per-probe timeout in seconds
    pub timeout_secs: u64,
    /// Vantage-point country whose probes decide the verdict
    pub target_country: String,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn probe_delay(&self) -> Duration {
        Duration::from_secs(self.probe_delay_secs)
    }
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// A missing or placeholder `API_KEY` is the only fatal condition besides
    /// malformed numeric values.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("API_KEY")
            .map_err(|_| CastError::MissingEnvVar("API_KEY".into()))?;
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() || api_key == PLACEHOLDER_API_KEY {
            return Err(CastError::InvalidConfig(
                "API_KEY must be set to a real secret".into(),
            ));
        }

        let oracle_url = get_env_or("ORACLE_URL", "https://api.boce.com/v3/task/tcping");
        let oracle_url = Url::parse(&oracle_url).map_err(|e| {
            CastError::InvalidConfig(format!("ORACLE_URL must be a valid URL: {}", e))
        })?;

        Ok(Config {
            api: ApiServerConfig {
                port: get_env_or("API_PORT", "8000").parse().map_err(|_| {
                    CastError::InvalidConfig("API_PORT must be a valid port number".into())
                })?,
                host: get_env_or("API_HOST", "0.0.0.0"),
                api_key,
            },
            storage: StorageConfig {
                nodes_file: PathBuf::from(get_env_or("NODES_FILE_PATH", "nodes.txt")),
                state_file: PathBuf::from(get_env_or("STATE_FILE_PATH", "last_index.txt")),
            },
            refresh: RefreshConfig {
                interval_secs: get_env_or("UPDATE_INTERVAL_SECONDS", "300")
                    .parse()
                    .map_err(|_| {
                        CastError::InvalidConfig(
                            "UPDATE_INTERVAL_SECONDS must be a valid number".into(),
                        )
                    })?,
                probe_delay_secs: get_env_or("PROBE_DELAY_SECONDS", "2").parse().map_err(|_| {
                    CastError::InvalidConfig("PROBE_DELAY_SECONDS must be a valid number".into())
                })?,
            },
            oracle: OracleConfig {
                url: oracle_url,
                timeout_secs: get_env_or("ORACLE_TIMEOUT_SECONDS", "20")
                    .parse()
                    .map_err(|_| {
                        CastError::InvalidConfig(
                            "ORACLE_TIMEOUT_SECONDS must be a valid number".into(),
                        )
                    })?,
                target_country: get_env_or("ORACLE_TARGET_COUNTRY", "中国"),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }

    /// Get the API server address
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const CONFIG_ENV_KEYS: &[&str] = &[
        "API_KEY",
        "API_PORT",
        "API_HOST",
        "NODES_FILE_PATH",
        "STATE_FILE_PATH",
        "UPDATE_INTERVAL_SECONDS",
        "PROBE_DELAY_SECONDS",
        "ORACLE_URL",
        "ORACLE_TIMEOUT_SECONDS",
        "ORACLE_TARGET_COUNTRY",
        "LOG_LEVEL",
        "LOG_FORMAT",
    ];

    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(keys: &[&str]) -> Self {
            let saved = keys
                .iter()
                .map(|&key| {
                    let old = env::var(key).ok();
                    env::remove_var(key);
                    (key.to_string(), old)
                })
                .collect();

            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("API_KEY", "s3cret");
        let config = Config::from_env().unwrap();

        assert_eq!(config.api.port, 8000);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.api.api_key, "s3cret");
        assert_eq!(config.storage.nodes_file, PathBuf::from("nodes.txt"));
        assert_eq!(config.storage.state_file, PathBuf::from("last_index.txt"));
        assert_eq!(config.refresh.interval(), Duration::from_secs(300));
        assert_eq!(config.refresh.probe_delay(), Duration::from_secs(2));
        assert_eq!(config.oracle.timeout(), Duration::from_secs(20));
        assert_eq!(config.oracle.target_country, "中国");
        assert_eq!(
            config.oracle.url.as_str(),
            "https://api.boce.com/v3/task/tcping"
        );
        assert_eq!(config.api_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_config_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("API_KEY", "s3cret");
        env::set_var("API_PORT", "9000");
        env::set_var("STATE_FILE_PATH", "/var/lib/nodecast/index");
        env::set_var("UPDATE_INTERVAL_SECONDS", "60");
        env::set_var("PROBE_DELAY_SECONDS", "0");
        env::set_var("ORACLE_URL", "http://127.0.0.1:9999/probe");
        env::set_var("ORACLE_TARGET_COUNTRY", "JP");

        let config = Config::from_env().unwrap();

        assert_eq!(config.api.port, 9000);
        assert_eq!(
            config.storage.state_file,
            PathBuf::from("/var/lib/nodecast/index")
        );
        assert_eq!(config.refresh.interval(), Duration::from_secs(60));
        assert_eq!(config.refresh.probe_delay(), Duration::ZERO);
        assert_eq!(config.oracle.url.as_str(), "http://127.0.0.1:9999/probe");
        assert_eq!(config.oracle.target_country, "JP");
    }

    #[test]
    fn test_config_missing_api_key() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CastError::MissingEnvVar(_)));
    }

    #[test]
    fn test_config_placeholder_api_key() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("API_KEY", PLACEHOLDER_API_KEY);
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CastError::InvalidConfig(_)));

        env::set_var("API_KEY", "   ");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CastError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_from_env_invalid_port() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("API_KEY", "s3cret");
        env::set_var("API_PORT", "not-a-port");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CastError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_from_env_invalid_oracle_url() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("API_KEY", "s3cret");
        env::set_var("ORACLE_URL", "not a url");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, CastError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_from_env_invalid_numbers() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("API_KEY", "s3cret");
        for key in [
            "UPDATE_INTERVAL_SECONDS",
            "PROBE_DELAY_SECONDS",
            "ORACLE_TIMEOUT_SECONDS",
        ] {
            env::set_var(key, "-5");
            let err = Config::from_env().unwrap_err();
            assert!(
                matches!(&err, CastError::InvalidConfig(msg) if msg.contains(key)),
                "{} accepted a bad value: {:?}",
                key,
                err
            );
            env::remove_var(key);
        }
    }
}
