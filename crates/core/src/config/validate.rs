use std::path::{Component, Path};

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - catalog.base_url parses as an http(s) URL
/// - catalog.user_agent is not empty
/// - catalog.timeout_secs, harvest.page_size and harvest.max_concurrent_items are not 0
/// - storage.ledger_file is a bare file name
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(&config.catalog.base_url).map_err(|e| {
        ConfigError::ValidationError(format!(
            "catalog.base_url is not a valid URL ({}): {}",
            config.catalog.base_url, e
        ))
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::ValidationError(format!(
            "catalog.base_url must be http or https, got {}",
            url.scheme()
        )));
    }

    if config.catalog.user_agent.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "catalog.user_agent cannot be empty".to_string(),
        ));
    }

    if config.catalog.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.harvest.max_concurrent_items == 0 {
        return Err(ConfigError::ValidationError(
            "harvest.max_concurrent_items cannot be 0".to_string(),
        ));
    }

    if config.harvest.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "harvest.page_size cannot be 0".to_string(),
        ));
    }

    let mut components = Path::new(&config.storage.ledger_file).components();
    let is_bare_name = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !is_bare_name {
        return Err(ConfigError::ValidationError(format!(
            "storage.ledger_file must be a plain file name, got {:?}",
            config.storage.ledger_file
        )));
    }

    Ok(())
}
