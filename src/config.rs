use std::fs;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::PortalError;

pub const DEFAULT_API_URL: &str = "https://graphql.cryoetdataportal.cziscience.com/v1/graphql";
pub const MAX_PER_PAGE: usize = 20;
pub const API_URL_ENV: &str = "PORTAL_API_URL";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub features: FeatureEntries,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FeatureEntries {
    #[serde(default)]
    pub multiple_tomograms: Option<bool>,
}

/// Capability switches that change how selections are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    pub multiple_tomograms: bool,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub api_url: String,
    pub page_size: usize,
    pub features: FeatureFlags,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            api_url: DEFAULT_API_URL.to_string(),
            page_size: MAX_PER_PAGE,
            features: FeatureFlags::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `portal.json` in the working directory, or the per-user config.
    ///
    /// An explicit path must exist; the implicit locations fall back to defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, PortalError> {
        let config_path = match path {
            Some(path) => Some(Utf8PathBuf::from(path)),
            None => Self::default_locations()
                .into_iter()
                .find(|candidate| candidate.as_std_path().exists()),
        };

        let config = match config_path {
            Some(config_path) => {
                let content = fs::read_to_string(config_path.as_std_path())
                    .map_err(|_| PortalError::ConfigRead(config_path.clone().into()))?;
                serde_json::from_str(&content)
                    .map_err(|err| PortalError::ConfigParse(err.to_string()))?
            }
            None => Config::default(),
        };

        let mut resolved = Self::resolve_config(config)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                resolved.api_url = url.trim().to_string();
            }
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, PortalError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let page_size = config.page_size.unwrap_or(MAX_PER_PAGE);
        if page_size == 0 {
            return Err(PortalError::ConfigParse(
                "page_size must be greater than zero".to_string(),
            ));
        }
        let api_url = config
            .api_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(ResolvedConfig {
            schema_version,
            api_url,
            page_size,
            features: FeatureFlags {
                multiple_tomograms: config.features.multiple_tomograms.unwrap_or(false),
            },
        })
    }

    fn default_locations() -> Vec<Utf8PathBuf> {
        let mut locations = vec![Utf8PathBuf::from("portal.json")];
        if let Some(dirs) = ProjectDirs::from("org", "cryoet", "portal-dl") {
            if let Ok(path) = Utf8PathBuf::from_path_buf(dirs.config_dir().join("portal.json")) {
                locations.push(path);
            }
        }
        locations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.api_url, DEFAULT_API_URL);
        assert_eq!(resolved.page_size, MAX_PER_PAGE);
        assert!(!resolved.features.multiple_tomograms);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = Config {
            page_size: Some(0),
            ..Config::default()
        };
        assert!(ConfigLoader::resolve_config(config).is_err());
    }
}
