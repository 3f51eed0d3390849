//! Store configuration.
//!
//! Defaults can be overridden from the environment:
//!
//! - `ROISTORE_HOME`: directory holding the catalog, lock and data files.
//! - `ROISTORE_IMPORT_LIMIT`: rows imported before asking whether to go on.
//! - `ROISTORE_AUTOSAVE`: `0`/`false` disables catalog autosave.

use std::path::{
    Path,
    PathBuf,
};

use log::warn;
use serde::{
    Deserialize,
    Serialize,
};

use crate::error::Result;
use crate::io::catalog::read_json;
use crate::{
    getter_fn,
    with_field_fn,
};

pub const HOME_ENV: &str = "ROISTORE_HOME";
pub const IMPORT_LIMIT_ENV: &str = "ROISTORE_IMPORT_LIMIT";
pub const AUTOSAVE_ENV: &str = "ROISTORE_AUTOSAVE";

pub const DEFAULT_CATALOG_NAME: &str = "GIE.datasets.json";
pub const DEFAULT_LOCK_NAME: &str = "GIE.lock";
pub const DEFAULT_IMPORT_ROW_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    home:             PathBuf,
    catalog_name:     String,
    lock_name:        String,
    import_row_limit: usize,
    autosave:         bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            home:             PathBuf::from("."),
            catalog_name:     DEFAULT_CATALOG_NAME.to_owned(),
            lock_name:        DEFAULT_LOCK_NAME.to_owned(),
            import_row_limit: DEFAULT_IMPORT_ROW_LIMIT,
            autosave:         true,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl StoreConfig {
    /// Default configuration rooted at `home`.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            ..Default::default()
        }
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Applies environment overrides on top of `self`. Unparseable values are
    /// ignored with a warning.
    pub fn apply_env(mut self) -> Self {
        if let Ok(home) = std::env::var(HOME_ENV) {
            self.home = PathBuf::from(home);
        }
        if let Ok(limit) = std::env::var(IMPORT_LIMIT_ENV) {
            match limit.trim().parse::<usize>() {
                Ok(limit) => self.import_row_limit = limit,
                Err(e) => warn!("Ignoring {IMPORT_LIMIT_ENV}={limit}: {e}"),
            }
        }
        if let Ok(flag) = std::env::var(AUTOSAVE_ENV) {
            match parse_flag(&flag) {
                Some(autosave) => self.autosave = autosave,
                None => warn!("Ignoring {AUTOSAVE_ENV}={flag}: expected a boolean"),
            }
        }
        self
    }

    /// Reads a JSON configuration file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        read_json(path)
    }

    getter_fn!(home, PathBuf);
    getter_fn!(catalog_name, String);
    getter_fn!(lock_name, String);

    with_field_fn!(home, PathBuf);
    with_field_fn!(catalog_name, String);
    with_field_fn!(lock_name, String);
    with_field_fn!(import_row_limit, usize);
    with_field_fn!(autosave, bool);

    pub fn import_row_limit(&self) -> usize {
        self.import_row_limit
    }

    pub fn autosave(&self) -> bool {
        self.autosave
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.home.join(&self.catalog_name)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.home.join(&self.lock_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::new("/tmp/roi");
        assert_eq!(config.import_row_limit(), 10_000);
        assert!(config.autosave());
        assert_eq!(
            config.catalog_path(),
            PathBuf::from("/tmp/roi/GIE.datasets.json")
        );
        assert_eq!(config.lock_path(), PathBuf::from("/tmp/roi/GIE.lock"));
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::default()
            .with_import_row_limit(5)
            .with_autosave(false)
            .with_catalog_name("cat.json".into());
        assert_eq!(config.import_row_limit(), 5);
        assert!(!config.autosave());
        assert_eq!(config.catalog_name(), "cat.json");
    }

    #[test]
    fn test_from_json_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"home": "/data/roi", "autosave": false}"#).unwrap();
        let config = StoreConfig::from_json_file(&path).unwrap();
        assert_eq!(config.home(), Path::new("/data/roi"));
        assert!(!config.autosave());
        assert_eq!(config.import_row_limit(), DEFAULT_IMPORT_ROW_LIMIT);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
