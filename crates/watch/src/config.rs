//! Watcher configuration loaded from environment variables.

use std::time::Duration;

use reel_core::{CoreError, StepCatalog};

/// Errors raised while assembling the watcher configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to read step catalog {path}: {source}")]
    CatalogRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Catalog(#[from] CoreError),
}

/// Runtime configuration for `reel-watch`.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub api_base_url: String,
    pub script_id: String,
    pub version_id: String,
    pub api_token: Option<String>,
    pub poll_interval: Option<Duration>,
    pub catalog_path: Option<String>,
    pub exit_when_idle: bool,
}

impl WatchConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var             | Default |
    /// |---------------------|---------|
    /// | `API_BASE_URL`      | --      |
    /// | `SCRIPT_ID`         | --      |
    /// | `VERSION_ID`        | --      |
    /// | `API_TOKEN`         | unset   |
    /// | `POLL_INTERVAL_MS`  | catalog (`5000`) |
    /// | `STEP_CATALOG_PATH` | built-in catalog |
    /// | `EXIT_WHEN_IDLE`    | `true`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let poll_interval = match get("POLL_INTERVAL_MS") {
            Some(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "POLL_INTERVAL_MS",
                    value: raw.clone(),
                    reason: "must be a valid u64".to_string(),
                })?;
                if ms == 0 {
                    return Err(ConfigError::Invalid {
                        var: "POLL_INTERVAL_MS",
                        value: raw,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Some(Duration::from_millis(ms))
            }
            None => None,
        };

        let exit_when_idle = match get("EXIT_WHEN_IDLE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "EXIT_WHEN_IDLE",
                value: raw.clone(),
                reason: "must be true or false".to_string(),
            })?,
            None => true,
        };

        Ok(Self {
            api_base_url: require("API_BASE_URL")?,
            script_id: require("SCRIPT_ID")?,
            version_id: require("VERSION_ID")?,
            api_token: get("API_TOKEN"),
            poll_interval,
            catalog_path: get("STEP_CATALOG_PATH"),
            exit_when_idle,
        })
    }

    /// Build the step catalog: the override file if configured, otherwise
    /// the built-in one, with the interval override applied.
    pub fn load_catalog(&self) -> Result<StepCatalog, ConfigError> {
        let catalog = match &self.catalog_path {
            Some(path) => {
                let json =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::CatalogRead {
                        path: path.clone(),
                        source,
                    })?;
                StepCatalog::from_json(&json)?
            }
            None => StepCatalog::default(),
        };

        Ok(match self.poll_interval {
            Some(interval) => catalog.with_poll_interval(interval),
            None => catalog,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
