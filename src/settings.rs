use std::collections::HashMap;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Prefix of every variable this tool reads, e.g. `SCRAPER_MODEL`.
pub const ENV_PREFIX: &str = "SCRAPER";

/// Log filter when settings are verbose-off or could not be loaded.
pub const QUIET_LOG_FILTER: &str = "info";
const VERBOSE_LOG_FILTER: &str = "bundestag_scraper=debug,info";

/// Unprefixed credential names accepted as fallbacks.
const BARE_KEYS: [(&str, &str); 2] = [
    ("OPENAI_KEY", "openai_key"),
    ("SPIDER_API_KEY", "spider_api_key"),
];

/// Engine credentials and flags, read once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub openai_key: Option<String>,
    pub spider_api_key: Option<String>,
    pub model: String,
    pub openai_base_url: String,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_key: None,
            spider_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            verbose: true,
        }
    }
}

impl Settings {
    /// Defaults overlaid with the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Like `load`, reading variables from `env` instead of the process when given.
    ///
    /// Only `SCRAPER_*` variables are read, plus the bare `OPENAI_KEY` and
    /// `SPIDER_API_KEY` credentials. A prefixed credential wins over a bare one.
    pub fn load_from(env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("model", DEFAULT_MODEL)?
            .set_default("openai_base_url", DEFAULT_OPENAI_BASE_URL)?
            .set_default("verbose", true)?;

        for (var, key) in BARE_KEYS {
            let value = match &env {
                Some(map) => map.get(var).cloned(),
                None => std::env::var(var).ok(),
            };
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                builder = builder.set_default(key, value)?;
            }
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }

    /// Default tracing filter when RUST_LOG is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            VERBOSE_LOG_FILTER
        } else {
            QUIET_LOG_FILTER
        }
    }
}
