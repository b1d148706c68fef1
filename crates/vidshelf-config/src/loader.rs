//! Layered configuration loading.
//!
//! # Design
//! - Defaults first, then an optional JSON file, then `VIDSHELF_*` variables.
//! - The environment is read through an injected lookup so tests stay hermetic.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::defaults::{
    ENV_API_KEY, ENV_API_URL, ENV_CONFIG_FILE, ENV_PAGE_SIZE, ENV_REQUEST_TIMEOUT_SECS,
    ENV_SCROLL_CAPACITY, ENV_SEARCH_DEBOUNCE_MS,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ClientConfig, ClientConfigPatch};
use crate::validate::validate;

type EnvLookup = fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Builder that assembles a [`ClientConfig`] from its sources.
pub struct ConfigLoader<F = EnvLookup> {
    lookup: F,
    file: Option<PathBuf>,
}

impl ConfigLoader<EnvLookup> {
    /// Loader backed by the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            lookup: process_env,
            file: None,
        }
    }
}

impl<F> ConfigLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Loader backed by a custom variable lookup.
    pub fn with_lookup(lookup: F) -> Self {
        Self { lookup, file: None }
    }

    /// Read this JSON file instead of the one named by `VIDSHELF_CONFIG`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Assemble and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, when an
    /// environment override is malformed, or when validation fails.
    pub fn load(&self) -> ConfigResult<ClientConfig> {
        let mut config = ClientConfig::default();

        let file = self
            .file
            .clone()
            .or_else(|| (self.lookup)(ENV_CONFIG_FILE).map(PathBuf::from));
        if let Some(path) = file {
            debug!(path = %path.display(), "loading client config file");
            config.apply(read_patch(&path)?);
        }

        config.apply(self.env_patch()?);
        validate(&config)?;
        Ok(config)
    }

    fn env_patch(&self) -> ConfigResult<ClientConfigPatch> {
        Ok(ClientConfigPatch {
            api_base_url: (self.lookup)(ENV_API_URL),
            api_key: (self.lookup)(ENV_API_KEY),
            page_size: self.parse_var(ENV_PAGE_SIZE, "page_size")?,
            scroll_store_capacity: self.parse_var(ENV_SCROLL_CAPACITY, "scroll_store_capacity")?,
            search_debounce_ms: self.parse_var(ENV_SEARCH_DEBOUNCE_MS, "search_debounce_ms")?,
            request_timeout_secs: self
                .parse_var(ENV_REQUEST_TIMEOUT_SECS, "request_timeout_secs")?,
        })
    }

    fn parse_var<T: FromStr>(&self, key: &str, field: &'static str) -> ConfigResult<Option<T>> {
        let Some(raw) = (self.lookup)(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidField {
                field,
                value: Some(raw),
                reason: "must be an unsigned integer",
            })
    }
}

fn read_patch(path: &Path) -> ConfigResult<ClientConfigPatch> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}
