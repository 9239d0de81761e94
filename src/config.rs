use std::fs;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::BrowseError;

pub const CONFIG_FILE_NAME: &str = "kira-image-browser.json";
pub const DEFAULT_THUMBNAIL_WORKERS: usize = 4;
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;
pub const DEFAULT_ORPHANED_PROGRESS_BATCH: usize = 25;
pub const DEFAULT_ORPHANED_FOLDER_NAME: &str = "Orphaned Images";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub thumbnail_workers: Option<usize>,
    #[serde(default)]
    pub thumbnail_size: Option<u32>,
    #[serde(default)]
    pub orphaned_progress_batch: Option<usize>,
    #[serde(default)]
    pub orphaned_folder_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    pub thumbnail_workers: usize,
    pub thumbnail_size: u32,
    pub orphaned_progress_batch: usize,
    pub orphaned_folder_name: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            thumbnail_workers: DEFAULT_THUMBNAIL_WORKERS,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            orphaned_progress_batch: DEFAULT_ORPHANED_PROGRESS_BATCH,
            orphaned_folder_name: DEFAULT_ORPHANED_FOLDER_NAME.to_string(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<BrowserConfig, BrowseError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => match Self::default_path() {
                Some(path) if path.as_std_path().exists() => path,
                _ => return Ok(BrowserConfig::default()),
            },
        };

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| BrowseError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| BrowseError::ConfigParse(err.to_string()))?;
        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<BrowserConfig, BrowseError> {
        let defaults = BrowserConfig::default();

        let thumbnail_workers = config
            .thumbnail_workers
            .unwrap_or(defaults.thumbnail_workers);
        if thumbnail_workers == 0 {
            return Err(BrowseError::InvalidConfig(
                "thumbnail_workers = 0".to_string(),
            ));
        }
        let orphaned_progress_batch = config
            .orphaned_progress_batch
            .unwrap_or(defaults.orphaned_progress_batch);
        if orphaned_progress_batch == 0 {
            return Err(BrowseError::InvalidConfig(
                "orphaned_progress_batch = 0".to_string(),
            ));
        }

        Ok(BrowserConfig {
            thumbnail_workers,
            thumbnail_size: config.thumbnail_size.unwrap_or(defaults.thumbnail_size),
            orphaned_progress_batch,
            orphaned_folder_name: config
                .orphaned_folder_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.orphaned_folder_name),
        })
    }

    pub fn default_path() -> Option<Utf8PathBuf> {
        BaseDirs::new().and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.config_dir().join(CONFIG_FILE_NAME)).ok()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved, BrowserConfig::default());
    }

    #[test]
    fn blank_folder_name_is_ignored() {
        let config = Config {
            orphaned_folder_name: Some("  ".to_string()),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.orphaned_folder_name, DEFAULT_ORPHANED_FOLDER_NAME);
    }
}
