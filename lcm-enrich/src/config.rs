//! Z2Data credential resolution
//!
//! Priority: database `settings` → environment → TOML. The first valid key
//! wins; finding it in more than one place logs a warning.

use lcm_common::config::{sanitize_credential, TomlConfig};
use lcm_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::{PartsSource, Z2DataClient, Z2DataConfig};

/// Environment variables checked for the API key, in order
pub const API_KEY_ENV_VARS: [&str; 2] = ["LCM_Z2DATA_API_KEY", "Z2DATA_API_KEY"];

/// Environment override for the gateway base URL
pub const BASE_URL_ENV: &str = "LCM_Z2DATA_BASE_URL";

/// Non-empty after sanitizing
pub fn is_valid_key(key: &str) -> bool {
    !sanitize_credential(key).is_empty()
}

/// Resolve the Z2Data API key from database, environment, then TOML
pub async fn resolve_z2data_api_key(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<String> {
    let mut found: Vec<(&str, String)> = Vec::new();

    if let Some(key) = crate::db::settings::get_z2data_api_key(db).await? {
        if is_valid_key(&key) {
            found.push(("database", key));
        }
    }

    for var in API_KEY_ENV_VARS {
        if let Ok(key) = std::env::var(var) {
            if is_valid_key(&key) {
                found.push(("environment", key));
                break;
            }
        }
    }

    if let Some(key) = &toml_config.z2data.api_key {
        if is_valid_key(key) {
            found.push(("TOML", key.clone()));
        }
    }

    if found.len() > 1 {
        let names: Vec<&str> = found.iter().map(|(source, _)| *source).collect();
        warn!(
            "Z2Data API key found in multiple sources: {}. Using {} (highest priority).",
            names.join(", "),
            names[0]
        );
    }

    match found.into_iter().next() {
        Some((source, key)) => {
            info!("Z2Data API key loaded from {}", source);
            Ok(sanitize_credential(&key))
        }
        None => Err(Error::Config(
            "Z2Data API key not configured. Set one of:\n\
             1. Database: settings.z2data_api_key\n\
             2. Environment: LCM_Z2DATA_API_KEY or Z2DATA_API_KEY\n\
             3. TOML config: ~/.config/lcm/lcm-enrich.toml ([z2data] api_key = \"...\")"
                .to_string(),
        )),
    }
}

/// Base URL from environment, then TOML (client default otherwise)
pub fn resolve_base_url(toml_config: &TomlConfig) -> Option<String> {
    std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| toml_config.z2data.base_url.clone())
}

/// Build the parts source from resolved configuration
pub async fn build_parts_source(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Arc<dyn PartsSource>> {
    let api_key = resolve_z2data_api_key(db, toml_config).await?;
    let base_url = resolve_base_url(toml_config);

    let config = Z2DataConfig::new(&api_key, base_url.as_deref())
        .map_err(|e| Error::Config(e.to_string()))?;
    info!(base_url = %config.base_url, "Z2Data client configured");

    let client = Z2DataClient::new(config).map_err(|e| Error::Config(e.to_string()))?;
    Ok(Arc::new(client))
}
