//! Validation helpers for configuration values.

use url::Url;

use crate::defaults::MAX_PAGE_SIZE;
use crate::error::{ConfigError, ConfigResult};
use crate::model::ClientConfig;

/// Check ranges and URL shape of an assembled configuration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first offending field.
pub fn validate(config: &ClientConfig) -> ConfigResult<()> {
    let url = Url::parse(&config.api_base_url).map_err(|_| ConfigError::InvalidField {
        field: "api_base_url",
        value: Some(config.api_base_url.clone()),
        reason: "must be an absolute URL",
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidField {
            field: "api_base_url",
            value: Some(config.api_base_url.clone()),
            reason: "scheme must be http or https",
        });
    }
    if !(1..=MAX_PAGE_SIZE).contains(&config.page_size) {
        return Err(ConfigError::InvalidField {
            field: "page_size",
            value: Some(config.page_size.to_string()),
            reason: "must be between 1 and 100",
        });
    }
    if config.scroll_store_capacity == 0 {
        return Err(ConfigError::InvalidField {
            field: "scroll_store_capacity",
            value: Some("0".to_string()),
            reason: "must be at least 1",
        });
    }
    if config.request_timeout_secs == 0 {
        return Err(ConfigError::InvalidField {
            field: "request_timeout_secs",
            value: Some("0".to_string()),
            reason: "must be at least 1",
        });
    }
    Ok(())
}
